use scraper::{ElementRef, Selector};

use crate::address::AddressResolver;
use crate::models::AddressParts;

/// Per-source field extraction over one listing card.
///
/// Implementations are pure: no I/O, no shared state, and no failure
/// crosses this boundary. Structural absence (missing node, missing
/// attribute, malformed text) falls back to the documented defaults —
/// counts to 0, price and size to `None`, address strings to empty —
/// and one field failing never affects its siblings.
pub trait CardExtractor: Send + Sync {
    /// Config key and table-name prefix for this source.
    fn source_key(&self) -> &'static str;

    /// Selector matching one listing card on a results page.
    fn card_selector(&self) -> &Selector;

    fn price(&self, card: ElementRef) -> Option<f64>;

    fn size(&self, card: ElementRef) -> Option<f64>;

    fn bedrooms(&self, card: ElementRef) -> i64;

    fn bathrooms(&self, card: ElementRef) -> i64;

    fn parking(&self, card: ElementRef) -> i64;

    fn address(&self, card: ElementRef, resolver: &AddressResolver) -> AddressParts;
}
