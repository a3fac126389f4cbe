use deunicode::deunicode;

/// Derive the stable content id for a listing from its address parts.
///
/// Missing parts are dropped, the rest are concatenated in the given
/// order with no separator, lowercased, trimmed, stripped of internal
/// spaces and commas, ASCII-folded, and hashed with MD5. The id is the
/// 32-character lowercase hex digest and is the upsert key everywhere:
/// it must come out identical for the same input parts on any run.
///
/// Standard sources pass `[street, neighborhood, city]`; the auction
/// source passes a single pre-joined composite string (see
/// [`auction_composite`]). The two conventions are not comparable and
/// are deliberately kept apart.
pub fn make_id(parts: &[Option<&str>]) -> String {
    let joined: String = parts.iter().filter_map(|p| *p).collect();

    let cleaned = joined
        .to_lowercase()
        .trim()
        .replace([' ', ','], "");
    let folded = deunicode(&cleaned);

    format!("{:x}", md5::compute(folded.as_bytes()))
}

/// Build the auction source's composite id string: address parts plus
/// round prices and dates joined into one element, missing parts
/// dropped. Returns `None` when every part is missing — such a card
/// carries no usable identity and is skipped by the caller.
pub fn auction_composite(
    street: &str,
    neighborhood: Option<&str>,
    city: Option<&str>,
    first_round_price: Option<f64>,
    first_round_at: Option<&str>,
    second_round_price: Option<f64>,
    second_round_at: Option<&str>,
) -> Option<String> {
    let first_price = first_round_price.map(|p| p.to_string());
    let second_price = second_round_price.map(|p| p.to_string());

    let mut composite = String::new();
    let parts: [Option<&str>; 7] = [
        if street.is_empty() { None } else { Some(street) },
        neighborhood,
        city,
        first_price.as_deref(),
        first_round_at,
        second_price.as_deref(),
        second_round_at,
    ];
    for part in parts.into_iter().flatten() {
        composite.push_str(part);
    }

    if composite.is_empty() {
        None
    } else {
        Some(composite)
    }
}
