use anyhow::{anyhow, Result};
use scraper::{ElementRef, Selector};

/// Compile a CSS selector, naming the offending string on failure so a
/// bad locator in the source config dies at startup with context.
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{css}': {e}"))
}

/// Whole text content of an element, trimmed.
pub fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text content minus the text of descendants matching any of the
/// given selectors. Listing cards wrap values together with icon
/// (`svg`) and label (`span`) markup that must not leak into numbers.
pub fn text_excluding(el: ElementRef, skip: &[&Selector]) -> String {
    let mut text: String = el.text().collect();
    for sel in skip {
        for skipped in el.select(sel) {
            let skipped_text: String = skipped.text().collect();
            if skipped_text.is_empty() {
                continue;
            }
            if let Some(pos) = text.find(&skipped_text) {
                text.replace_range(pos..pos + skipped_text.len(), "");
            }
        }
    }
    text.trim().to_string()
}

/// Direct element children with the given tag name, in document order.
pub fn children_by_tag<'a>(el: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == tag)
        .collect()
}

/// Keep only the ASCII digits of a string.
pub fn digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a price written without cents, dots as thousands separators:
/// `"R$ 350.000"` → 350000.0.
pub fn parse_brl_plain(text: &str) -> Option<f64> {
    text.trim()
        .replace("R$ ", "")
        .replace('.', "")
        .parse::<f64>()
        .ok()
}

/// Parse a price with `.` thousands separators and `,` decimal point:
/// `"R$ 350.000,50"` → 350000.5. `strip_dots` is the per-source flag —
/// a source that never writes thousands separators must not have its
/// decimal dot stripped.
pub fn parse_brl_decimal(text: &str, strip_dots: bool) -> Option<f64> {
    let mut cleaned = text.trim().replace("R$ ", "");
    if strip_dots {
        cleaned = cleaned.replace('.', "");
    }
    cleaned.replace(',', ".").parse::<f64>().ok()
}

/// Integer size in m², truncating at the unit token when configured:
/// `"75 m²"` with token `"m²"` → 75.0.
pub fn parse_size(text: &str, split_text: Option<&str>) -> Option<f64> {
    let trimmed = text.trim();
    let value = match split_text {
        Some(token) if trimmed.contains(token) => trimmed.split(token).next()?.trim(),
        _ => trimmed,
    };
    value.parse::<i64>().ok().map(|v| v as f64)
}

/// Numeric value embedded before a unit token, decimal comma allowed:
/// `"120,5 m²"` → 120.5. Used on auction detail pages.
pub fn parse_decimal_measure(text: &str, split_text: Option<&str>) -> Option<f64> {
    let trimmed = text.trim();
    let value = match split_text {
        Some(token) if trimmed.contains(token) => trimmed.split(token).next()?.trim(),
        _ => trimmed,
    };
    value.replace('.', "").replace(',', ".").parse::<f64>().ok()
}

/// First whitespace-separated token shaped like a `dd/mm/yyyy` date.
pub fn find_date_token(text: &str) -> Option<String> {
    text.split_whitespace()
        .find(|token| {
            let bytes = token.as_bytes();
            bytes.len() == 10
                && bytes[2] == b'/'
                && bytes[5] == b'/'
                && token
                    .chars()
                    .enumerate()
                    .all(|(i, c)| if i == 2 || i == 5 { c == '/' } else { c.is_ascii_digit() })
        })
        .map(|token| token.to_string())
}
