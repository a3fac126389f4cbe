use anyhow::{Context, Result};
use rusqlite::Transaction;
use tracing::{info, warn};

use crate::storage::{Storage, AUCTION_SOURCE, STANDARD_SOURCES};

/// Result of the auction-overlap sweep for one standard source.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub source: String,
    pub removed: usize,
    pub error: Option<String>,
}

/// A standard listing and an auction listing describe the same
/// property when the address lines up and the asking price equals one
/// of the auction's round prices. Ids cannot be compared across the
/// two conventions, so the match runs on the raw columns:
///
///   (a) street + neighborhood + city + price
///   (b) street + city + price
///
/// Text columns compare case- and whitespace-insensitively; price
/// matches either round. Matched rows are removed from both the
/// source's register and its history.
fn matched_ids(tx: &Transaction<'_>, source: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT r.id FROM {source}_register r
         JOIN {AUCTION_SOURCE}_register a
           ON LOWER(TRIM(r.street)) = LOWER(TRIM(a.street))
          AND LOWER(TRIM(r.neighborhood)) = LOWER(TRIM(a.neighborhood))
          AND LOWER(TRIM(r.city)) = LOWER(TRIM(a.city))
          AND (r.price = a.first_round_price OR r.price = a.second_round_price)
         UNION
         SELECT r.id FROM {source}_register r
         JOIN {AUCTION_SOURCE}_register a
           ON LOWER(TRIM(r.street)) = LOWER(TRIM(a.street))
          AND LOWER(TRIM(r.city)) = LOWER(TRIM(a.city))
          AND (r.price = a.first_round_price OR r.price = a.second_round_price)"
    );
    let mut statement = tx.prepare(&sql)?;
    let ids = statement
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn sweep_source(tx: &Transaction<'_>, source: &str) -> Result<usize> {
    let ids = matched_ids(tx, source)
        .with_context(|| format!("auction-overlap query failed for '{source}'"))?;
    for id in &ids {
        tx.execute(&format!("DELETE FROM {source}_register WHERE id = ?1"), [id])?;
        tx.execute(&format!("DELETE FROM {source}_history WHERE id = ?1"), [id])?;
    }
    Ok(ids.len())
}

/// Remove standard-source listings that duplicate an auction listing.
///
/// Each source is swept in its own transaction; a failing sweep rolls
/// back that source alone and the run continues. Skipped entirely when
/// no auction data has been collected yet.
pub fn run(storage: &mut Storage) -> Result<Vec<DedupOutcome>> {
    if !storage.has_table(&format!("{AUCTION_SOURCE}_register"))? {
        info!("no auction data present, skipping dedup");
        return Ok(Vec::new());
    }

    let mut outcomes = Vec::with_capacity(STANDARD_SOURCES.len());
    for source in STANDARD_SOURCES {
        let outcome = match sweep_in_transaction(storage, source) {
            Ok(removed) => {
                info!(source, removed, "auction duplicates removed");
                DedupOutcome {
                    source: source.to_string(),
                    removed,
                    error: None,
                }
            }
            Err(e) => {
                warn!(source, error = %format!("{e:#}"), "dedup sweep failed, rolled back");
                DedupOutcome {
                    source: source.to_string(),
                    removed: 0,
                    error: Some(format!("{e:#}")),
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

fn sweep_in_transaction(storage: &mut Storage, source: &str) -> Result<usize> {
    let tx = storage.conn_mut().transaction()?;
    let removed = sweep_source(&tx, source)?;
    tx.commit()?;
    Ok(removed)
}
