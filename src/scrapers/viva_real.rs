use anyhow::Result;
use scraper::{ElementRef, Selector};

use crate::address::AddressResolver;
use crate::config::{data_cy_css, DataCyFeature, DataCyLocators, SourceConfig};
use crate::models::AddressParts;
use crate::scrapers::helpers::{
    children_by_tag, parse_brl_decimal, parse_size, selector, text_excluding, text_of,
};
use crate::scrapers::traits::CardExtractor;

/// Viva Real adapter. Fields are located by `data-cy` attributes; the
/// value element wraps an icon (`svg`) and a label (`span`) that are
/// excluded before parsing. The headline price is the first direct
/// child paragraph of the price block — descendant search would pick
/// up the condo-fee line below it.
pub struct VivaRealScraper {
    card: Selector,
    price_container: Selector,
    price_child_tag: String,
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

impl VivaRealScraper {
    pub fn new(config: &SourceConfig<DataCyLocators>) -> Result<Self> {
        let fields = &config.fields;
        Ok(Self {
            card: selector(&config.property_card.css())?,
            price_container: selector(&data_cy_css(
                &fields.price.element,
                &fields.price.data_cy,
            ))?,
            price_child_tag: fields.price.child_tag.clone(),
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

impl CardExtractor for VivaRealScraper {
    fn source_key(&self) -> &'static str {
        "viva_real"
    }

    fn card_selector(&self) -> &Selector {
        &self.card
    }

    fn price(&self, card: ElementRef) -> Option<f64> {
        let container = card.select(&self.price_container).next()?;
        let headline = children_by_tag(container, &self.price_child_tag);
        let text = text_of(*headline.first()?);
        parse_brl_decimal(&text, self.price_strip_dots)
    }

    fn size(&self, card: ElementRef) -> Option<f64> {
        let text = self.feature_text(card, &self.size)?;
        // The original only accepts sizes that carry the unit token.
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
        // The locality element reads "<span>Casa para comprar em </span>
        // Santa Cândida, Curitiba"; the span prefix is dropped.
        let locality = card
            .select(&self.location)
            .next()
            .map(|el| text_excluding(el, &[&self.span]))
            .unwrap_or_default();
        resolver.parts(street, &locality)
    }
}
