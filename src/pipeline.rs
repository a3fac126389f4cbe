use std::env;
use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use crate::address::AddressResolver;
use crate::config::AppConfig;
use crate::dedup::{self, DedupOutcome};
use crate::engine::{Engine, SourceMeta};
use crate::geocode::Geocoder;
use crate::models::RunSummary;
use crate::notify::{escape_markdown, Notifier};
use crate::scrapers::{
    CardExtractor, ChavesNaMaoScraper, LeilaoImovelScraper, VivaRealScraper, ZapImoveisScraper,
};
use crate::storage::{Storage, AUCTION_SOURCE, STANDARD_SOURCES};

/// Environment override for the page cap; a `--pages` flag wins over it.
pub const MAX_PAGES_ENV: &str = "SCOUT_MAX_PAGES";

pub fn resolve_max_pages(flag: Option<u32>) -> Option<u32> {
    flag.or_else(|| env::var(MAX_PAGES_ENV).ok().and_then(|v| v.parse().ok()))
}

/// Wires config, storage, geocoder and adapters together and runs the
/// requested stage(s). Each public method is one CLI subcommand.
pub struct Pipeline {
    config: AppConfig,
    max_pages: Option<u32>,
}

impl Pipeline {
    pub fn new(config: AppConfig, pages_flag: Option<u32>) -> Self {
        let max_pages = resolve_max_pages(pages_flag);
        Self { config, max_pages }
    }

    /// Scrape every source, then sweep auction duplicates. Returns
    /// whether the whole run finished without per-source errors.
    pub async fn run_all(&self) -> Result<bool> {
        let notifier = Notifier::new(self.config.telegram.clone());
        notifier.send("Scout run started").await;

        let mut storage = Storage::open(Path::new(&self.config.database.path))?;
        let summaries = self.scrape_into(&storage, None, Some(&notifier)).await?;
        let outcomes = dedup::run(&mut storage)?;

        let clean = summaries.iter().all(RunSummary::ok)
            && outcomes.iter().all(|o| o.error.is_none());
        notifier.send(&run_report(&summaries, &outcomes, clean)).await;
        Ok(clean)
    }

    /// Scrape one source, or all of them, without the dedup sweep.
    pub async fn scrape(&self, source: Option<&str>) -> Result<bool> {
        let storage = Storage::open(Path::new(&self.config.database.path))?;
        let summaries = self.scrape_into(&storage, source, None).await?;
        Ok(summaries.iter().all(RunSummary::ok))
    }

    /// Run only the auction-duplicate sweep.
    pub async fn dedup(&self) -> Result<bool> {
        let mut storage = Storage::open(Path::new(&self.config.database.path))?;
        let outcomes = dedup::run(&mut storage)?;
        Ok(outcomes.iter().all(|o| o.error.is_none()))
    }

    async fn scrape_into(
        &self,
        storage: &Storage,
        filter: Option<&str>,
        notifier: Option<&Notifier>,
    ) -> Result<Vec<RunSummary>> {
        if let Some(key) = filter {
            if !STANDARD_SOURCES.contains(&key) && key != AUCTION_SOURCE {
                bail!("unknown source '{key}'");
            }
        }

        let geocoder = Geocoder::new(&self.config.geocoding)?;
        let resolver = AddressResolver::new(
            &self.config.address_book.neighborhoods,
            &self.config.address_book.cities,
        );
        let engine = Engine::new(
            &self.config.scraper,
            &geocoder,
            &resolver,
            storage,
            self.max_pages,
        );
        let sources = &self.config.sources;

        let mut summaries = Vec::new();
        for key in STANDARD_SOURCES.iter().chain([&AUCTION_SOURCE]) {
            if filter.is_some_and(|wanted| wanted != *key) {
                continue;
            }
            info!(source = key, "starting source run");
            let summary = match *key {
                "chaves_na_mao" => {
                    let adapter = ChavesNaMaoScraper::new(&sources.chaves_na_mao)?;
                    let meta =
                        SourceMeta::from_config(adapter.source_key(), &sources.chaves_na_mao);
                    engine.run_standard(&meta, &adapter).await
                }
                "viva_real" => {
                    let adapter = VivaRealScraper::new(&sources.viva_real)?;
                    let meta = SourceMeta::from_config(adapter.source_key(), &sources.viva_real);
                    engine.run_standard(&meta, &adapter).await
                }
                "zap_imoveis" => {
                    let adapter = ZapImoveisScraper::new(&sources.zap_imoveis)?;
                    let meta = SourceMeta::from_config(adapter.source_key(), &sources.zap_imoveis);
                    engine.run_standard(&meta, &adapter).await
                }
                _ => {
                    let adapter = LeilaoImovelScraper::new(&sources.leilao_imovel)?;
                    let meta =
                        SourceMeta::from_config(adapter.source_key(), &sources.leilao_imovel);
                    engine.run_auction(&meta, &adapter).await
                }
            };
            if let Some(notifier) = notifier {
                notifier.send(&source_report(&summary)).await;
            }
            summaries.push(summary);
        }
        Ok(summaries)
    }
}

fn source_report(summary: &RunSummary) -> String {
    let mut report = format!(
        "*{}* done: {} register, {} history, {} pages ({:.0}s)",
        summary.source,
        summary.register_records,
        summary.history_records,
        summary.pages_fetched,
        summary.duration_secs,
    );
    for error in &summary.errors {
        report.push_str(&format!("\n  error: {}", escape_markdown(error)));
    }
    report
}

fn run_report(summaries: &[RunSummary], outcomes: &[DedupOutcome], clean: bool) -> String {
    let mut report = String::from(if clean {
        "Scout run finished\n"
    } else {
        "Scout run finished with errors\n"
    });
    for summary in summaries {
        report.push_str(&format!(
            "*{}*: {} register, {} history, {} pages ({:.0}s)\n",
            summary.source,
            summary.register_records,
            summary.history_records,
            summary.pages_fetched,
            summary.duration_secs,
        ));
        for error in &summary.errors {
            report.push_str(&format!("  error: {}\n", escape_markdown(error)));
        }
    }
    for outcome in outcomes {
        match &outcome.error {
            None => report.push_str(&format!(
                "dedup {}: {} removed\n",
                outcome.source, outcome.removed
            )),
            Some(error) => report.push_str(&format!(
                "dedup {}: failed: {}\n",
                outcome.source,
                escape_markdown(error)
            )),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_environment() {
        env::set_var(MAX_PAGES_ENV, "7");
        assert_eq!(resolve_max_pages(Some(3)), Some(3));
        assert_eq!(resolve_max_pages(None), Some(7));
        env::remove_var(MAX_PAGES_ENV);
        assert_eq!(resolve_max_pages(None), None);
    }

    #[test]
    fn report_lists_sources_and_errors() {
        let mut summary = RunSummary::new("viva_real");
        summary.register_records = 12;
        summary.history_records = 12;
        summary.pages_fetched = 2;
        summary.errors.push("register write failed".to_string());

        let outcomes = vec![DedupOutcome {
            source: "viva_real".to_string(),
            removed: 3,
            error: None,
        }];

        let report = run_report(&[summary], &outcomes, false);
        assert!(report.contains("with errors"));
        assert!(report.contains("*viva_real*: 12 register, 12 history, 2 pages"));
        assert!(report.contains("register write failed"));
        assert!(report.contains("dedup viva_real: 3 removed"));
    }
}
