use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Whole-process configuration, loaded once from the YAML file at
/// startup and passed by reference everywhere. No global state.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub geocoding: GeocodingConfig,
    pub scraper: ScraperSettings,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    pub address_book: AddressBook,
    pub sources: Sources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub country_codes: String,
    pub timeout_secs: u64,
    pub bounded: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// Ids shared between two consecutive pages before the loop stops.
    /// Zero disables the duplicate-page check.
    pub duplicate_page_threshold: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Known neighborhood and city names the address resolver scans, in
/// match-priority order.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressBook {
    pub neighborhoods: Vec<String>,
    pub cities: Vec<String>,
}

/// The closed set of supported sources. Adding a source means adding a
/// field here and an adapter module; there is no dynamic registry.
#[derive(Debug, Clone, Deserialize)]
pub struct Sources {
    pub chaves_na_mao: SourceConfig<ChavesLocators>,
    pub viva_real: SourceConfig<DataCyLocators>,
    pub zap_imoveis: SourceConfig<DataCyLocators>,
    pub leilao_imovel: SourceConfig<AuctionLocators>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig<L> {
    pub base_url: String,
    /// Query fragment the page number is appended to, e.g. `?pagina=`.
    pub pagination_param: String,
    pub property_card: ElementLocator,
    pub viewbox: ViewBox,
    /// Standard listing pages are fetched without following redirects;
    /// the auction site needs them on.
    #[serde(default)]
    pub follow_redirects: bool,
    pub fields: L,
}

/// Tag plus a single class token, the unit of the declarative locator
/// config. `css()` renders it for the scraper crate's selectors.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementLocator {
    pub element: String,
    pub class: String,
}

impl ElementLocator {
    pub fn css(&self) -> String {
        format!("{}.{}", self.element, self.class)
    }
}

/// Two lat/long corners bounding the geocoding search.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ViewBox {
    pub corner_a: [f64; 2],
    pub corner_b: [f64; 2],
}

// --- chaves_na_mao: tag + class markup, numbers embedded in feature text ---

#[derive(Debug, Clone, Deserialize)]
pub struct ChavesLocators {
    pub price: ChavesPrice,
    pub size: ChavesSize,
    pub bedrooms: ChavesCount,
    pub bathrooms: ChavesCount,
    pub parking: ChavesCount,
    pub address: ChavesAddress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChavesPrice {
    pub element: String,
    pub class: String,
    /// Child element holding the amount text.
    pub value_tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChavesSize {
    pub element: String,
    pub class: String,
    /// Which of the matching elements carries the size.
    #[serde(default)]
    pub index: usize,
    pub split_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChavesCount {
    pub element: String,
    pub class: String,
    /// Token identifying the right feature line, e.g. "quartos".
    pub search_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChavesAddress {
    pub element: String,
    pub class: String,
    pub child_tag: String,
    pub street_index: usize,
    pub locality_index: usize,
}

// --- viva_real / zap_imoveis: data-cy attribute markup ---

#[derive(Debug, Clone, Deserialize)]
pub struct DataCyLocators {
    pub price: DataCyPrice,
    pub size: DataCyFeature,
    pub bedrooms: DataCyFeature,
    pub bathrooms: DataCyFeature,
    pub parking: DataCyFeature,
    pub address: DataCyAddress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataCyPrice {
    pub element: String,
    pub data_cy: String,
    pub child_tag: String,
    /// Whether `.` is a thousands separator to strip before parsing.
    #[serde(default)]
    pub replace_dots: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataCyFeature {
    pub parent_element: String,
    pub parent_data_cy: String,
    pub value_tag: String,
    pub split_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataCyAddress {
    pub street_element: String,
    pub street_data_cy: String,
    pub location_element: String,
    pub location_data_cy: String,
}

// --- leilao_imovel: auction cards plus a detail page per listing ---

#[derive(Debug, Clone, Deserialize)]
pub struct AuctionLocators {
    pub detail_link: ElementLocator,
    pub rounds: RoundsLocator,
    pub current_price: ElementLocator,
    pub address: ChavesAddress,
    pub detail_page: DetailPageLocators,
    /// The listing page ends with a known bad card; the register loop
    /// drops it.
    #[serde(default)]
    pub drop_trailing_card: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundsLocator {
    pub container: ElementLocator,
    pub entry_tag: String,
    /// Tokens marking which round an entry line belongs to.
    pub first_round_token: String,
    pub second_round_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailPageLocators {
    pub usable_area: DetailField,
    pub lot_area: DetailField,
    pub parking: DetailField,
    pub bedrooms: DetailField,
    /// Container listing accepted payment conditions.
    pub conditions: ElementLocator,
    pub financing_token: String,
    pub fgts_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailField {
    pub element: String,
    pub class: String,
    pub split_text: Option<String>,
}

impl AppConfig {
    /// Read and validate the configuration. Any missing key fails here,
    /// before a single request goes out; selector syntax is checked by
    /// the adapters right after, also pre-network.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (key, base_url) in [
            ("chaves_na_mao", &self.sources.chaves_na_mao.base_url),
            ("viva_real", &self.sources.viva_real.base_url),
            ("zap_imoveis", &self.sources.zap_imoveis.base_url),
            ("leilao_imovel", &self.sources.leilao_imovel.base_url),
        ] {
            if base_url.is_empty() {
                bail!("source '{key}' has an empty base_url");
            }
        }
        if self.address_book.cities.is_empty() {
            bail!("address_book.cities must list at least one city");
        }
        if self.geocoding.timeout_secs == 0 {
            bail!("geocoding.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Render a `tag[data-cy="value"]` selector string.
pub fn data_cy_css(element: &str, data_cy: &str) -> String {
    format!("{element}[data-cy=\"{data_cy}\"]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_locator_renders_css() {
        let locator = ElementLocator {
            element: "div".to_string(),
            class: "price".to_string(),
        };
        assert_eq!(locator.css(), "div.price");
    }

    #[test]
    fn data_cy_selector_renders_attribute_form() {
        assert_eq!(
            data_cy_css("li", "rp-cardProperty-price-txt"),
            "li[data-cy=\"rp-cardProperty-price-txt\"]"
        );
    }

    #[test]
    fn missing_key_is_a_parse_error() {
        // No `sources` section at all.
        let raw = "database:\n  path: data\n";
        let parsed: Result<AppConfig, _> = serde_yaml::from_str(raw);
        assert!(parsed.is_err());
    }
}
