use anyhow::Result;
use scraper::{ElementRef, Selector};

use crate::address::AddressResolver;
use crate::config::{data_cy_css, DataCyFeature, DataCyLocators, SourceConfig};
use crate::models::AddressParts;
use crate::scrapers::helpers::{parse_brl_decimal, parse_size, selector, text_excluding, text_of};
use crate::scrapers::traits::CardExtractor;

/// Zap Imóveis adapter. Shares the `data-cy` markup family with Viva
/// Real but with its own quirks: the price block holds a single value
/// element, found by descendant search rather than direct-child
/// position.
pub struct ZapImoveisScraper {
    card: Selector,
    price_container: Selector,
    price_value: Selector,
    price_strip_dots: bool,
    size: FeatureLocator,
    bedrooms: FeatureLocator,
    bathrooms: FeatureLocator,
    parking: FeatureLocator,
    street: Selector,
    location: Selector,
    svg: Selector,
    span: Selector,
}

struct FeatureLocator {
    parent: Selector,
    value: Selector,
    split_text: Option<String>,
}

impl FeatureLocator {
    fn compile(config: &DataCyFeature) -> Result<Self> {
        Ok(Self {
            parent: selector(&data_cy_css(&config.parent_element, &config.parent_data_cy))?,
            value: selector(&config.value_tag)?,
            split_text: config.split_text.clone(),
        })
    }
}

impl ZapImoveisScraper {
    pub fn new(config: &SourceConfig<DataCyLocators>) -> Result<Self> {
        let fields = &config.fields;
        Ok(Self {
            card: selector(&config.property_card.css())?,
            price_container: selector(&data_cy_css(
                &fields.price.element,
                &fields.price.data_cy,
            ))?,
            price_value: selector(&fields.price.child_tag)?,
            price_strip_dots: fields.price.replace_dots,
            size: FeatureLocator::compile(&fields.size)?,
            bedrooms: FeatureLocator::compile(&fields.bedrooms)?,
            bathrooms: FeatureLocator::compile(&fields.bathrooms)?,
            parking: FeatureLocator::compile(&fields.parking)?,
            street: selector(&data_cy_css(
                &fields.address.street_element,
                &fields.address.street_data_cy,
            ))?,
            location: selector(&data_cy_css(
                &fields.address.location_element,
                &fields.address.location_data_cy,
            ))?,
            svg: selector("svg")?,
            span: selector("span")?,
        })
    }

    fn feature_text(&self, card: ElementRef, locator: &FeatureLocator) -> Option<String> {
        let parent = card.select(&locator.parent).next()?;
        let value = parent.select(&locator.value).next()?;
        Some(text_excluding(value, &[&self.svg, &self.span]))
    }

    fn count(&self, card: ElementRef, locator: &FeatureLocator) -> i64 {
        self.feature_text(card, locator)
            .and_then(|text| text.parse::<i64>().ok())
            .unwrap_or(0)
    }
}

impl CardExtractor for ZapImoveisScraper {
    fn source_key(&self) -> &'static str {
        "zap_imoveis"
    }

    fn card_selector(&self) -> &Selector {
        &self.card
    }

    fn price(&self, card: ElementRef) -> Option<f64> {
        let container = card.select(&self.price_container).next()?;
        let value = container.select(&self.price_value).next()?;
        parse_brl_decimal(&text_of(value), self.price_strip_dots)
    }

    fn size(&self, card: ElementRef) -> Option<f64> {
        let text = self.feature_text(card, &self.size)?;
        let token = self.size.split_text.as_deref()?;
        if !text.contains(token) {
            return None;
        }
        parse_size(&text, Some(token))
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
        let street = card
            .select(&self.street)
            .next()
            .map(text_of)
            .unwrap_or_default();
        let locality = card
            .select(&self.location)
            .next()
            .map(|el| text_excluding(el, &[&self.span]))
            .unwrap_or_default();
        resolver.parts(street, &locality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataCyAddress, DataCyPrice, ElementLocator, ViewBox};
    use scraper::Html;

    fn source_config() -> SourceConfig<DataCyLocators> {
        SourceConfig {
            base_url: "https://example.test/venda/".to_string(),
            pagination_param: "?pagina=".to_string(),
            property_card: ElementLocator {
                element: "div".to_string(),
                class: "listing-card".to_string(),
            },
            viewbox: ViewBox {
                corner_a: [-25.3, -49.4],
                corner_b: [-25.6, -49.1],
            },
            follow_redirects: false,
            fields: DataCyLocators {
                price: DataCyPrice {
                    element: "div".to_string(),
                    data_cy: "listing-price".to_string(),
                    child_tag: "p".to_string(),
                    replace_dots: true,
                },
                size: DataCyFeature {
                    parent_element: "li".to_string(),
                    parent_data_cy: "listing-floorSize".to_string(),
                    value_tag: "h3".to_string(),
                    split_text: Some("m²".to_string()),
                },
                bedrooms: DataCyFeature {
                    parent_element: "li".to_string(),
                    parent_data_cy: "listing-numberOfRooms".to_string(),
                    value_tag: "h3".to_string(),
                    split_text: None,
                },
                bathrooms: DataCyFeature {
                    parent_element: "li".to_string(),
                    parent_data_cy: "listing-numberOfBathroomsTotal".to_string(),
                    value_tag: "h3".to_string(),
                    split_text: None,
                },
                parking: DataCyFeature {
                    parent_element: "li".to_string(),
                    parent_data_cy: "listing-numberOfParkingSpaces".to_string(),
                    value_tag: "h3".to_string(),
                    split_text: None,
                },
                address: DataCyAddress {
                    street_element: "p".to_string(),
                    street_data_cy: "listing-street".to_string(),
                    location_element: "h2".to_string(),
                    location_data_cy: "listing-location".to_string(),
                },
            },
        }
    }

    fn resolver() -> AddressResolver {
        AddressResolver::new(
            &["agua verde".to_string()],
            &["curitiba".to_string()],
        )
    }

    const CARD: &str = r#"
        <div class="listing-card">
          <div data-cy="listing-price"><div><p>R$ 519.000</p></div></div>
          <li data-cy="listing-floorSize"><h3><svg></svg><span>Tamanho</span>95 m²</h3></li>
          <li data-cy="listing-numberOfRooms"><h3><span>Quartos</span>2</h3></li>
          <li data-cy="listing-numberOfBathroomsTotal"><h3><span>Banheiros</span>1</h3></li>
          <li data-cy="listing-numberOfParkingSpaces"><h3><span>Vagas</span>2</h3></li>
          <p data-cy="listing-street">Avenida República Argentina, 452</p>
          <h2 data-cy="listing-location"><span>Apartamento em </span>Água Verde, Curitiba</h2>
        </div>"#;

    fn with_card<T>(html: &str, f: impl FnOnce(&ZapImoveisScraper, ElementRef) -> T) -> T {
        let adapter = ZapImoveisScraper::new(&source_config()).unwrap();
        let document = Html::parse_document(html);
        let card = document.select(adapter.card_selector()).next().unwrap();
        f(&adapter, card)
    }

    #[test]
    fn extracts_all_fields_from_card() {
        with_card(CARD, |adapter, card| {
            assert_eq!(adapter.price(card), Some(519000.0));
            assert_eq!(adapter.size(card), Some(95.0));
            assert_eq!(adapter.bedrooms(card), 2);
            assert_eq!(adapter.bathrooms(card), 1);
            assert_eq!(adapter.parking(card), 2);

            let parts = adapter.address(card, &resolver());
            assert_eq!(parts.street, "Avenida República Argentina, 452");
            assert_eq!(parts.neighborhood.as_deref(), Some("agua verde"));
            assert_eq!(parts.city.as_deref(), Some("curitiba"));
        });
    }

    #[test]
    fn price_is_found_by_descendant_search() {
        // Unlike Viva Real, the value paragraph is nested one level
        // down and must still be found.
        with_card(CARD, |adapter, card| {
            assert_eq!(adapter.price(card), Some(519000.0));
        });
    }

    #[test]
    fn malformed_count_text_defaults_to_zero() {
        let html = CARD.replace("<span>Quartos</span>2", "<span>Quartos</span>dois");
        with_card(&html, |adapter, card| {
            assert_eq!(adapter.bedrooms(card), 0);
        });
    }

    #[test]
    fn location_span_prefix_is_dropped() {
        with_card(CARD, |adapter, card| {
            let parts = adapter.address(card, &resolver());
            assert_eq!(parts.neighborhood.as_deref(), Some("agua verde"));
        });
    }
}
