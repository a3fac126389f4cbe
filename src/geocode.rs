use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{GeocodingConfig, ViewBox};

/// Nominatim response row; coordinates come back as strings.
#[derive(Debug, Deserialize)]
struct NominatimRow {
    lat: String,
    lon: String,
}

/// Address-to-coordinates lookup against a Nominatim endpoint,
/// constrained to a per-source viewbox and a country filter.
///
/// Lookups are best-effort: every failure mode (network, non-200,
/// malformed body, no result, unparsable coordinates) comes back as
/// `None` and the record is emitted without coordinates.
pub struct Geocoder {
    client: Client,
    endpoint: String,
    country_codes: String,
    bounded: bool,
}

impl Geocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build geocoding HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            country_codes: config.country_codes.clone(),
            bounded: config.bounded,
        })
    }

    pub async fn lookup(&self, query: &str, viewbox: &ViewBox) -> Option<(f64, f64)> {
        // Nominatim wants lon,lat,lon,lat corner order.
        let viewbox_param = format!(
            "{},{},{},{}",
            viewbox.corner_a[1], viewbox.corner_a[0], viewbox.corner_b[1], viewbox.corner_b[0]
        );
        let url = format!(
            "{}?q={}&format=json&limit=1&viewbox={}&bounded={}&countrycodes={}",
            self.endpoint,
            urlencoding::encode(query),
            viewbox_param,
            if self.bounded { 1 } else { 0 },
            self.country_codes,
        );

        debug!(query, "geocoding address");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(query, error = %e, "geocoding request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(query, status = %response.status(), "geocoding returned non-success status");
            return None;
        }

        let rows: Vec<NominatimRow> = match response.json().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(query, error = %e, "failed to decode geocoding response");
                return None;
            }
        };

        let row = rows.first()?;
        match (row.lat.parse::<f64>(), row.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => {
                debug!(query, lat, lon, "geocoding hit");
                Some((lat, lon))
            }
            _ => {
                warn!(query, "geocoding returned unparsable coordinates");
                None
            }
        }
    }
}

/// Title-case each whitespace-separated word, the way the geocoding
/// query strings are built from scraped address text.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the "Street - City - PR" query the standard sources geocode.
pub fn standard_query(street: &str, city: &str) -> String {
    format!("{} - {} - PR", title_case(street.trim()), title_case(city.trim()))
}

/// Build the fuller "Street, Neighborhood - City - PR" query used for
/// auction listings.
pub fn auction_query(street: &str, neighborhood: &str, city: &str) -> String {
    format!(
        "{}, {} - {} - PR",
        title_case(street.trim()),
        title_case(neighborhood.trim()),
        title_case(city.trim())
    )
}
