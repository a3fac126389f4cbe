/// Street / neighborhood / city triple as extracted from a listing card.
///
/// Street is empty (never absent) when extraction fails; neighborhood
/// and city are `None` when the resolver finds no known name.
#[derive(Debug, Clone, Default)]
pub struct AddressParts {
    pub street: String,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
}

/// One row of a standard source's register table.
#[derive(Debug, Clone)]
pub struct PropertyRecord {
    pub id: String,
    pub captured_at: String,
    pub price: Option<f64>,
    pub size_m2: Option<f64>,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub parking: i64,
    pub street: String,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One append-only price observation for a standard source.
#[derive(Debug, Clone)]
pub struct PriceObservation {
    pub id: String,
    pub captured_at: String,
    pub price: Option<f64>,
}

/// First/second auction round ("praça") prices and dates plus the
/// currently asked price, as shown on the listing card.
///
/// Dates are kept exactly as scraped (dd/mm/yyyy text): the auction
/// identity hash covers the raw text, so normalizing them would change
/// ids between runs.
#[derive(Debug, Clone, Default)]
pub struct RoundInfo {
    pub first_round_price: Option<f64>,
    pub first_round_at: Option<String>,
    pub second_round_price: Option<f64>,
    pub second_round_at: Option<String>,
    pub current_price: Option<f64>,
}

/// Fields only available on an auction listing's detail page.
#[derive(Debug, Clone, Default)]
pub struct DetailInfo {
    pub usable_area: Option<f64>,
    pub lot_area: Option<f64>,
    pub accepts_financing: Option<bool>,
    pub accepts_fgts: Option<bool>,
    pub parking: Option<i64>,
    pub bedrooms: Option<i64>,
}

/// One row of the auction source's register table.
#[derive(Debug, Clone)]
pub struct AuctionRecord {
    pub id: String,
    pub captured_at: String,
    pub first_round_price: Option<f64>,
    pub first_round_at: Option<String>,
    pub second_round_price: Option<f64>,
    pub second_round_at: Option<String>,
    pub current_price: Option<f64>,
    pub usable_area: Option<f64>,
    pub lot_area: Option<f64>,
    pub street: String,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub detail_url: Option<String>,
    pub accepts_financing: Option<bool>,
    pub accepts_fgts: Option<bool>,
    pub parking: Option<i64>,
    pub bedrooms: Option<i64>,
}

/// One append-only price observation for the auction source.
#[derive(Debug, Clone)]
pub struct AuctionPriceObservation {
    pub id: String,
    pub captured_at: String,
    pub first_round_price: Option<f64>,
    pub second_round_price: Option<f64>,
    pub current_price: Option<f64>,
}

/// Structured result of one source's end-to-end run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub source: String,
    pub register_records: usize,
    pub history_records: usize,
    pub pages_fetched: u32,
    pub errors: Vec<String>,
    pub duration_secs: f64,
}

impl RunSummary {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            register_records: 0,
            history_records: 0,
            pages_fetched: 0,
            errors: Vec::new(),
            duration_secs: 0.0,
        }
    }

    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}
