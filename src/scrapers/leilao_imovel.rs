use anyhow::Result;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::address::AddressResolver;
use crate::config::{AuctionLocators, DetailField, SourceConfig};
use crate::models::{AddressParts, DetailInfo, RoundInfo};
use crate::scrapers::helpers::{
    digits, find_date_token, parse_decimal_measure, selector, text_of,
};

/// Leilão Imóvel adapter. Auction cards carry round ("praça") prices
/// and dates instead of a single asking price, and link to a detail
/// page holding the fields the card omits (areas, financing terms,
/// parking, bedrooms). The detail fetch is a second round-trip done by
/// [`fetch_details`](Self::fetch_details) after the card's own fields
/// are extracted.
pub struct LeilaoImovelScraper {
    card: Selector,
    detail_link: Selector,
    rounds_container: Selector,
    rounds_entry: Selector,
    first_round_token: String,
    second_round_token: String,
    current_price: Selector,
    address_container: Selector,
    address_child: Selector,
    street_index: usize,
    locality_index: usize,
    usable_area: CompiledDetailField,
    lot_area: CompiledDetailField,
    parking: CompiledDetailField,
    bedrooms: CompiledDetailField,
    conditions: Selector,
    financing_token: String,
    fgts_token: String,
    drop_trailing_card: bool,
    site_root: Option<Url>,
}

struct CompiledDetailField {
    sel: Selector,
    split_text: Option<String>,
}

impl CompiledDetailField {
    fn compile(config: &DetailField) -> Result<Self> {
        Ok(Self {
            sel: selector(&format!("{}.{}", config.element, config.class))?,
            split_text: config.split_text.clone(),
        })
    }

    fn measure(&self, document: &Html) -> Option<f64> {
        let el = document.select(&self.sel).next()?;
        parse_decimal_measure(&text_of(el), self.split_text.as_deref())
    }

    fn count(&self, document: &Html) -> Option<i64> {
        let el = document.select(&self.sel).next()?;
        let text = text_of(el);
        let value = match &self.split_text {
            Some(token) if text.contains(token) => text.split(token.as_str()).next()?.trim().to_string(),
            _ => text,
        };
        digits(&value).parse::<i64>().ok()
    }
}

impl LeilaoImovelScraper {
    pub fn new(config: &SourceConfig<AuctionLocators>) -> Result<Self> {
        let fields = &config.fields;
        Ok(Self {
            card: selector(&config.property_card.css())?,
            detail_link: selector(&fields.detail_link.css())?,
            rounds_container: selector(&fields.rounds.container.css())?,
            rounds_entry: selector(&fields.rounds.entry_tag)?,
            first_round_token: fields.rounds.first_round_token.clone(),
            second_round_token: fields.rounds.second_round_token.clone(),
            current_price: selector(&fields.current_price.css())?,
            address_container: selector(&format!(
                "{}.{}",
                fields.address.element, fields.address.class
            ))?,
            address_child: selector(&fields.address.child_tag)?,
            street_index: fields.address.street_index,
            locality_index: fields.address.locality_index,
            usable_area: CompiledDetailField::compile(&fields.detail_page.usable_area)?,
            lot_area: CompiledDetailField::compile(&fields.detail_page.lot_area)?,
            parking: CompiledDetailField::compile(&fields.detail_page.parking)?,
            bedrooms: CompiledDetailField::compile(&fields.detail_page.bedrooms)?,
            conditions: selector(&fields.detail_page.conditions.css())?,
            financing_token: fields.detail_page.financing_token.to_lowercase(),
            fgts_token: fields.detail_page.fgts_token.to_lowercase(),
            drop_trailing_card: fields.drop_trailing_card,
            site_root: Url::parse(&config.base_url).ok(),
        })
    }

    pub fn source_key(&self) -> &'static str {
        "leilao_imovel"
    }

    pub fn card_selector(&self) -> &Selector {
        &self.card
    }

    /// The listing page ends with a known bad card that the register
    /// loop drops.
    pub fn drop_trailing_card(&self) -> bool {
        self.drop_trailing_card
    }

    /// Absolute URL of the listing's detail page, when the card links
    /// to one. Relative hrefs resolve against the source's base URL.
    pub fn detail_url(&self, card: ElementRef) -> Option<String> {
        let href = card
            .select(&self.detail_link)
            .next()?
            .value()
            .attr("href")?
            .trim();
        if href.is_empty() {
            return None;
        }
        if href.starts_with("http://") || href.starts_with("https://") {
            return Some(href.to_string());
        }
        self.site_root
            .as_ref()
            .and_then(|root| root.join(href).ok())
            .map(|url| url.to_string())
    }

    /// Round prices/dates plus the current asking price from the card.
    pub fn rounds(&self, card: ElementRef) -> RoundInfo {
        let mut info = RoundInfo::default();

        if let Some(container) = card.select(&self.rounds_container).next() {
            for entry in container.select(&self.rounds_entry) {
                let text = text_of(entry);
                if text.contains(&self.first_round_token) {
                    info.first_round_price = price_after_symbol(&text);
                    info.first_round_at = find_date_token(&text);
                } else if text.contains(&self.second_round_token) {
                    info.second_round_price = price_after_symbol(&text);
                    info.second_round_at = find_date_token(&text);
                }
            }
        }

        info.current_price = card
            .select(&self.current_price)
            .next()
            .and_then(|el| price_after_symbol(&text_of(el)));

        info
    }

    pub fn address(&self, card: ElementRef, resolver: &AddressResolver) -> AddressParts {
        let Some(container) = card.select(&self.address_container).next() else {
            return AddressParts::default();
        };
        let children: Vec<ElementRef> = container.select(&self.address_child).collect();
        let street = children
            .get(self.street_index)
            .map(|el| text_of(*el))
            .unwrap_or_default();
        let locality = children
            .get(self.locality_index)
            .map(|el| text_of(*el))
            .unwrap_or_default();
        resolver.parts(street, &locality)
    }

    /// Second-stage fetch of the detail page. Every failure mode —
    /// request error, non-success status, missing markup — degrades to
    /// `None` fields; the caller's record keeps its primary fields.
    pub async fn fetch_details(&self, client: &Client, url: &str) -> DetailInfo {
        debug!(url, "fetching auction detail page");

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "detail page request failed");
                return DetailInfo::default();
            }
        };
        if !response.status().is_success() {
            warn!(url, status = %response.status(), "detail page returned non-success status");
            return DetailInfo::default();
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url, error = %e, "failed to read detail page body");
                return DetailInfo::default();
            }
        };

        self.parse_details(&Html::parse_document(&body))
    }

    fn parse_details(&self, document: &Html) -> DetailInfo {
        let (accepts_financing, accepts_fgts) = match document.select(&self.conditions).next() {
            Some(conditions) => {
                let text = text_of(conditions).to_lowercase();
                (
                    Some(text.contains(&self.financing_token)),
                    Some(text.contains(&self.fgts_token)),
                )
            }
            None => (None, None),
        };

        DetailInfo {
            usable_area: self.usable_area.measure(document),
            lot_area: self.lot_area.measure(document),
            accepts_financing,
            accepts_fgts,
            parking: self.parking.count(document),
            bedrooms: self.bedrooms.count(document),
        }
    }
}

/// Amount following the first `R$` in the text, `.` thousands and `,`
/// decimal: `"1ª Praça: 01/09/2026 - R$ 100.000,00"` → 100000.0.
fn price_after_symbol(text: &str) -> Option<f64> {
    let after = text.split("R$").nth(1)?.trim_start();
    let amount: String = after
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if amount.is_empty() {
        return None;
    }
    amount.replace('.', "").replace(',', ".").parse::<f64>().ok()
}
