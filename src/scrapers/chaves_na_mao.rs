use anyhow::Result;
use scraper::{ElementRef, Selector};

use crate::address::AddressResolver;
use crate::config::{ChavesCount, ChavesLocators, SourceConfig};
use crate::models::AddressParts;
use crate::scrapers::helpers::{digits, parse_brl_plain, parse_size, selector, text_of};
use crate::scrapers::traits::CardExtractor;

/// Chaves na Mão adapter. Markup is plain tag+class; the feature line
/// ("3 quartos", "2 vagas") carries its label inline, so counts are
/// located by a search token instead of a dedicated attribute. Prices
/// are written without cents, dots as thousands separators.
pub struct ChavesNaMaoScraper {
    card: Selector,
    price_container: Selector,
    price_value: Selector,
    size: Selector,
    size_index: usize,
    size_split: Option<String>,
    bedrooms: CountLocator,
    bathrooms: CountLocator,
    parking: CountLocator,
    address_container: Selector,
    address_child: Selector,
    street_index: usize,
    locality_index: usize,
}

struct CountLocator {
    sel: Selector,
    token: String,
}

impl CountLocator {
    fn compile(config: &ChavesCount) -> Result<Self> {
        Ok(Self {
            sel: selector(&format!("{}.{}", config.element, config.class))?,
            token: config.search_text.clone(),
        })
    }
}

impl ChavesNaMaoScraper {
    /// Compiles every locator up front; a malformed selector in the
    /// config fails here, before any page is fetched.
    pub fn new(config: &SourceConfig<ChavesLocators>) -> Result<Self> {
        let fields = &config.fields;
        Ok(Self {
            card: selector(&config.property_card.css())?,
            price_container: selector(&format!(
                "{}.{}",
                fields.price.element, fields.price.class
            ))?,
            price_value: selector(&fields.price.value_tag)?,
            size: selector(&format!("{}.{}", fields.size.element, fields.size.class))?,
            size_index: fields.size.index,
            size_split: fields.size.split_text.clone(),
            bedrooms: CountLocator::compile(&fields.bedrooms)?,
            bathrooms: CountLocator::compile(&fields.bathrooms)?,
            parking: CountLocator::compile(&fields.parking)?,
            address_container: selector(&format!(
                "{}.{}",
                fields.address.element, fields.address.class
            ))?,
            address_child: selector(&fields.address.child_tag)?,
            street_index: fields.address.street_index,
            locality_index: fields.address.locality_index,
        })
    }

    fn count(&self, card: ElementRef, locator: &CountLocator) -> i64 {
        card.select(&locator.sel)
            .find(|el| text_of(*el).contains(&locator.token))
            .and_then(|el| {
                let text = text_of(el);
                let before = text.split(&locator.token).next()?;
                digits(before).parse::<i64>().ok()
            })
            .unwrap_or(0)
    }
}

impl CardExtractor for ChavesNaMaoScraper {
    fn source_key(&self) -> &'static str {
        "chaves_na_mao"
    }

    fn card_selector(&self) -> &Selector {
        &self.card
    }

    fn price(&self, card: ElementRef) -> Option<f64> {
        let container = card.select(&self.price_container).next()?;
        let value = container.select(&self.price_value).next()?;
        parse_brl_plain(&text_of(value))
    }

    fn size(&self, card: ElementRef) -> Option<f64> {
        let matches: Vec<ElementRef> = card.select(&self.size).collect();
        let el = matches.get(self.size_index)?;
        parse_size(&text_of(*el), self.size_split.as_deref())
    }

    fn bedrooms(&self, card: ElementRef) -> i64 {
        self.count(card, &self.bedrooms)
    }

    fn bathrooms(&self, card: ElementRef) -> i64 {
        self.count(card, &self.bathrooms)
    }

    fn parking(&self, card: ElementRef) -> i64 {
        self.count(card, &self.parking)
    }

    fn address(&self, card: ElementRef, resolver: &AddressResolver) -> AddressParts {
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
}
