use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{redirect, Client};
use scraper::Html;
use tracing::{debug, info, warn};

use crate::address::AddressResolver;
use crate::config::{ScraperSettings, SourceConfig, ViewBox};
use crate::geocode::{auction_query, standard_query, Geocoder};
use crate::identity::{auction_composite, make_id};
use crate::models::{
    AuctionPriceObservation, AuctionRecord, PriceObservation, PropertyRecord, RunSummary,
};
use crate::scrapers::{CardExtractor, LeilaoImovelScraper};
use crate::storage::Storage;

/// Per-source request parameters, lifted out of the typed locator
/// config so the pagination loops can stay generic over field layouts.
pub struct SourceMeta {
    pub key: &'static str,
    pub base_url: String,
    pub pagination_param: String,
    pub viewbox: ViewBox,
    pub follow_redirects: bool,
}

impl SourceMeta {
    pub fn from_config<L>(key: &'static str, config: &SourceConfig<L>) -> Self {
        Self {
            key,
            base_url: config.base_url.clone(),
            pagination_param: config.pagination_param.clone(),
            viewbox: config.viewbox,
            follow_redirects: config.follow_redirects,
        }
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}{}{}", self.base_url, self.pagination_param, page)
    }
}

/// Source of listing-page bodies for the pagination loops.
#[async_trait(?Send)]
trait PageFetcher {
    async fn fetch_page(&self, meta: &SourceMeta, page: u32) -> Result<String>;
}

struct HttpFetcher<'a> {
    client: &'a Client,
}

#[async_trait(?Send)]
impl PageFetcher for HttpFetcher<'_> {
    async fn fetch_page(&self, meta: &SourceMeta, page: u32) -> Result<String> {
        let url = meta.page_url(page);
        debug!(source = meta.key, page, url, "fetching listing page");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request failed for {url}"))?;
        if !response.status().is_success() {
            bail!("{url} returned status {}", response.status());
        }
        response
            .text()
            .await
            .with_context(|| format!("failed to read body of {url}"))
    }
}

/// Detects when a listing site has run out of results and started
/// serving the same page again. Ids are compared against the previous
/// page only; a listing resurfacing several pages later is legitimate.
struct PageDuplicateTracker {
    previous: HashSet<String>,
    current: HashSet<String>,
    duplicates: usize,
}

impl PageDuplicateTracker {
    fn new() -> Self {
        Self {
            previous: HashSet::new(),
            current: HashSet::new(),
            duplicates: 0,
        }
    }

    fn observe(&mut self, id: &str) {
        self.current.insert(id.to_string());
        if self.previous.contains(id) {
            self.duplicates += 1;
        }
    }

    /// A threshold of zero disables the check. The current page must
    /// have produced at least one id, so an empty page never reads as
    /// "all duplicates".
    fn should_stop(&self, threshold: usize) -> bool {
        threshold > 0 && self.duplicates >= threshold && !self.current.is_empty()
    }

    fn advance_page(&mut self) {
        self.previous = std::mem::take(&mut self.current);
        self.duplicates = 0;
    }
}

/// Which of a source's two passes is running. Both paginate from page
/// one independently: the register pass merges full records by id, the
/// history pass appends one price observation per card seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    Register,
    History,
}

/// UTC capture timestamp, the format stored in every row.
pub fn capture_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Drives one source end to end: builds the source's HTTP client,
/// paginates the listing, hands each card to the adapter, geocodes,
/// and writes through [`Storage`].
///
/// Page fetch failures and non-success statuses end the pagination for
/// that pass without failing the run — sites cut off deep pages in
/// unhelpful ways. Storage failures abort the pass and are reported in
/// the summary.
pub struct Engine<'a> {
    settings: &'a ScraperSettings,
    geocoder: &'a Geocoder,
    resolver: &'a AddressResolver,
    storage: &'a Storage,
    max_pages: Option<u32>,
}

impl<'a> Engine<'a> {
    pub fn new(
        settings: &'a ScraperSettings,
        geocoder: &'a Geocoder,
        resolver: &'a AddressResolver,
        storage: &'a Storage,
        max_pages: Option<u32>,
    ) -> Self {
        Self {
            settings,
            geocoder,
            resolver,
            storage,
            max_pages,
        }
    }

    fn client_for(&self, meta: &SourceMeta) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(self.settings.request_timeout_secs))
            .user_agent(self.settings.user_agent.clone());
        if !meta.follow_redirects {
            builder = builder.redirect(redirect::Policy::none());
        }
        builder
            .build()
            .with_context(|| format!("failed to build HTTP client for source '{}'", meta.key))
    }

    async fn geocode_standard(
        &self,
        meta: &SourceMeta,
        street: &str,
        city: Option<&str>,
    ) -> Option<(f64, f64)> {
        // Geocoding a query without a street or city returns junk hits
        // anywhere inside the viewbox; skip it entirely.
        let city = city?;
        if street.trim().is_empty() {
            return None;
        }
        self.geocoder
            .lookup(&standard_query(street, city), &meta.viewbox)
            .await
    }

    async fn geocode_auction(
        &self,
        meta: &SourceMeta,
        street: &str,
        neighborhood: Option<&str>,
        city: Option<&str>,
    ) -> Option<(f64, f64)> {
        let city = city?;
        if street.trim().is_empty() {
            return None;
        }
        let query = auction_query(street, neighborhood.unwrap_or_default(), city);
        self.geocoder.lookup(&query, &meta.viewbox).await
    }

    /// Run both passes of a standard source.
    pub async fn run_standard(
        &self,
        meta: &SourceMeta,
        adapter: &dyn CardExtractor,
    ) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(meta.key);

        let client = match self.client_for(meta) {
            Ok(client) => client,
            Err(e) => {
                summary.errors.push(format!("{e:#}"));
                return summary;
            }
        };
        let fetcher = HttpFetcher { client: &client };

        for kind in [LoopKind::Register, LoopKind::History] {
            self.standard_pass(meta, adapter, &fetcher, kind, &mut summary)
                .await;
            if !summary.ok() {
                break;
            }
        }

        summary.duration_secs = started.elapsed().as_secs_f64();
        info!(
            source = meta.key,
            register = summary.register_records,
            history = summary.history_records,
            pages = summary.pages_fetched,
            "source run finished"
        );
        summary
    }

    async fn standard_pass(
        &self,
        meta: &SourceMeta,
        adapter: &dyn CardExtractor,
        fetcher: &dyn PageFetcher,
        kind: LoopKind,
        summary: &mut RunSummary,
    ) {
        let mut tracker = PageDuplicateTracker::new();
        let mut page = 1u32;

        loop {
            if let Some(max) = self.max_pages {
                if page > max {
                    info!(source = meta.key, max, "page cap reached");
                    break;
                }
            }

            let body = match fetcher.fetch_page(meta, page).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(source = meta.key, page, error = %e, "page fetch failed, ending pass");
                    break;
                }
            };
            summary.pages_fetched += 1;

            let document = Html::parse_document(&body);
            let cards: Vec<_> = document.select(adapter.card_selector()).collect();
            // End-of-results heuristic for sites without a definite
            // last page; the first page gets the benefit of the doubt.
            if cards.is_empty() && page > 1 {
                debug!(source = meta.key, page, "no cards on page, ending pass");
                break;
            }

            let captured_at = capture_timestamp();
            for card in cards {
                let parts = adapter.address(card, self.resolver);
                let id = make_id(&[
                    Some(parts.street.as_str()),
                    parts.neighborhood.as_deref(),
                    parts.city.as_deref(),
                ]);
                tracker.observe(&id);

                let price = adapter.price(card);
                let write = match kind {
                    LoopKind::Register => {
                        let coordinates = self
                            .geocode_standard(meta, &parts.street, parts.city.as_deref())
                            .await;
                        let record = PropertyRecord {
                            id,
                            captured_at: captured_at.clone(),
                            price,
                            size_m2: adapter.size(card),
                            bedrooms: adapter.bedrooms(card),
                            bathrooms: adapter.bathrooms(card),
                            parking: adapter.parking(card),
                            street: parts.street,
                            neighborhood: parts.neighborhood,
                            city: parts.city,
                            latitude: coordinates.map(|(lat, _)| lat),
                            longitude: coordinates.map(|(_, lon)| lon),
                        };
                        self.storage
                            .upsert_register(meta.key, &record)
                            .map(|()| summary.register_records += 1)
                    }
                    LoopKind::History => {
                        let observation = PriceObservation {
                            id,
                            captured_at: captured_at.clone(),
                            price,
                        };
                        self.storage
                            .append_history(meta.key, &observation)
                            .map(|()| summary.history_records += 1)
                    }
                };

                if let Err(e) = write {
                    warn!(source = meta.key, page, error = %e, "storage write failed, aborting pass");
                    summary.errors.push(format!("{e:#}"));
                    return;
                }
            }

            if tracker.should_stop(self.settings.duplicate_page_threshold) {
                info!(
                    source = meta.key,
                    page,
                    duplicates = tracker.duplicates,
                    "duplicate page detected, ending pass"
                );
                break;
            }
            tracker.advance_page();
            page += 1;
        }
    }

    /// Run both passes of the auction source. The register pass drops
    /// the trailing card when configured and enriches each record with
    /// a detail-page fetch; the history pass does neither.
    pub async fn run_auction(
        &self,
        meta: &SourceMeta,
        adapter: &LeilaoImovelScraper,
    ) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(meta.key);

        let client = match self.client_for(meta) {
            Ok(client) => client,
            Err(e) => {
                summary.errors.push(format!("{e:#}"));
                return summary;
            }
        };
        let fetcher = HttpFetcher { client: &client };

        for kind in [LoopKind::Register, LoopKind::History] {
            self.auction_pass(meta, adapter, &fetcher, &client, kind, &mut summary)
                .await;
            if !summary.ok() {
                break;
            }
        }

        summary.duration_secs = started.elapsed().as_secs_f64();
        info!(
            source = meta.key,
            register = summary.register_records,
            history = summary.history_records,
            pages = summary.pages_fetched,
            "source run finished"
        );
        summary
    }

    async fn auction_pass(
        &self,
        meta: &SourceMeta,
        adapter: &LeilaoImovelScraper,
        fetcher: &dyn PageFetcher,
        client: &Client,
        kind: LoopKind,
        summary: &mut RunSummary,
    ) {
        let mut tracker = PageDuplicateTracker::new();
        let mut page = 1u32;

        loop {
            if let Some(max) = self.max_pages {
                if page > max {
                    info!(source = meta.key, max, "page cap reached");
                    break;
                }
            }

            let body = match fetcher.fetch_page(meta, page).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(source = meta.key, page, error = %e, "page fetch failed, ending pass");
                    break;
                }
            };
            summary.pages_fetched += 1;

            let document = Html::parse_document(&body);
            let mut cards: Vec<_> = document.select(adapter.card_selector()).collect();
            // The trailing card is dropped before the end-of-results
            // check: a page reduced to nothing ends the pass.
            if kind == LoopKind::Register && adapter.drop_trailing_card() {
                cards.pop();
            }
            if cards.is_empty() && page > 1 {
                debug!(source = meta.key, page, "no cards on page, ending pass");
                break;
            }

            let captured_at = capture_timestamp();
            for card in cards {
                let rounds = adapter.rounds(card);
                let parts = adapter.address(card, self.resolver);
                let Some(composite) = auction_composite(
                    &parts.street,
                    parts.neighborhood.as_deref(),
                    parts.city.as_deref(),
                    rounds.first_round_price,
                    rounds.first_round_at.as_deref(),
                    rounds.second_round_price,
                    rounds.second_round_at.as_deref(),
                ) else {
                    warn!(source = meta.key, page, "card without identity, skipping");
                    continue;
                };
                let id = make_id(&[Some(composite.as_str())]);
                tracker.observe(&id);

                let write = match kind {
                    LoopKind::Register => {
                        let detail_url = adapter.detail_url(card);
                        let details = match detail_url.as_deref() {
                            Some(url) => adapter.fetch_details(client, url).await,
                            None => Default::default(),
                        };
                        let coordinates = self
                            .geocode_auction(
                                meta,
                                &parts.street,
                                parts.neighborhood.as_deref(),
                                parts.city.as_deref(),
                            )
                            .await;
                        let record = AuctionRecord {
                            id,
                            captured_at: captured_at.clone(),
                            first_round_price: rounds.first_round_price,
                            first_round_at: rounds.first_round_at,
                            second_round_price: rounds.second_round_price,
                            second_round_at: rounds.second_round_at,
                            current_price: rounds.current_price,
                            usable_area: details.usable_area,
                            lot_area: details.lot_area,
                            street: parts.street,
                            neighborhood: parts.neighborhood,
                            city: parts.city,
                            latitude: coordinates.map(|(lat, _)| lat),
                            longitude: coordinates.map(|(_, lon)| lon),
                            detail_url,
                            accepts_financing: details.accepts_financing,
                            accepts_fgts: details.accepts_fgts,
                            parking: details.parking,
                            bedrooms: details.bedrooms,
                        };
                        self.storage
                            .upsert_auction(&record)
                            .map(|()| summary.register_records += 1)
                    }
                    LoopKind::History => {
                        let observation = AuctionPriceObservation {
                            id,
                            captured_at: captured_at.clone(),
                            first_round_price: rounds.first_round_price,
                            second_round_price: rounds.second_round_price,
                            current_price: rounds.current_price,
                        };
                        self.storage
                            .append_auction_history(&observation)
                            .map(|()| summary.history_records += 1)
                    }
                };

                if let Err(e) = write {
                    warn!(source = meta.key, page, error = %e, "storage write failed, aborting pass");
                    summary.errors.push(format!("{e:#}"));
                    return;
                }
            }

            if tracker.should_stop(self.settings.duplicate_page_threshold) {
                info!(
                    source = meta.key,
                    page,
                    duplicates = tracker.duplicates,
                    "duplicate page detected, ending pass"
                );
                break;
            }
            tracker.advance_page();
            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use scraper::{ElementRef, Selector};

    use crate::config::{
        AuctionLocators, ChavesAddress, DetailField, DetailPageLocators, ElementLocator,
        GeocodingConfig, RoundsLocator,
    };
    use crate::models::AddressParts;

    #[test]
    fn tracker_counts_only_previous_page_ids() {
        let mut tracker = PageDuplicateTracker::new();
        tracker.observe("a");
        tracker.observe("b");
        tracker.advance_page();

        tracker.observe("a");
        tracker.observe("c");
        assert_eq!(tracker.duplicates, 1);

        // "b" was two pages back by now.
        tracker.advance_page();
        tracker.observe("b");
        assert_eq!(tracker.duplicates, 0);
    }

    #[test]
    fn tracker_stops_at_threshold() {
        let mut tracker = PageDuplicateTracker::new();
        tracker.observe("a");
        tracker.observe("b");
        tracker.advance_page();

        tracker.observe("a");
        assert!(!tracker.should_stop(2));
        tracker.observe("b");
        assert!(tracker.should_stop(2));
    }

    #[test]
    fn zero_threshold_disables_the_check() {
        let mut tracker = PageDuplicateTracker::new();
        tracker.observe("a");
        tracker.advance_page();
        tracker.observe("a");
        assert!(!tracker.should_stop(0));
    }

    #[test]
    fn empty_page_never_stops() {
        let mut tracker = PageDuplicateTracker::new();
        tracker.observe("a");
        tracker.advance_page();
        assert!(!tracker.should_stop(1));
    }

    #[test]
    fn repeats_within_one_page_count_once_each() {
        let mut tracker = PageDuplicateTracker::new();
        tracker.observe("a");
        tracker.advance_page();
        tracker.observe("a");
        tracker.observe("a");
        // Every sighting of a previous-page id counts toward the
        // threshold, even the same id twice.
        assert_eq!(tracker.duplicates, 2);
    }

    #[test]
    fn page_url_joins_base_param_and_number() {
        let meta = test_meta();
        assert_eq!(meta.page_url(3), "https://example.test/venda/?pagina=3");
    }

    #[test]
    fn capture_timestamp_shape() {
        let stamp = capture_timestamp();
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
    }

    // --- full pagination loop, with a canned page source ---

    fn test_meta() -> SourceMeta {
        SourceMeta {
            key: "viva_real",
            base_url: "https://example.test/venda/".to_string(),
            pagination_param: "?pagina=".to_string(),
            viewbox: ViewBox {
                corner_a: [-25.3, -49.4],
                corner_b: [-25.6, -49.1],
            },
            follow_redirects: false,
        }
    }

    fn test_settings(duplicate_page_threshold: usize) -> ScraperSettings {
        ScraperSettings {
            duplicate_page_threshold,
            request_timeout_secs: 5,
            user_agent: "test-agent".to_string(),
        }
    }

    fn test_geocoder() -> Geocoder {
        Geocoder::new(&GeocodingConfig {
            endpoint: "http://127.0.0.1:9/search".to_string(),
            user_agent: "test-agent".to_string(),
            country_codes: "br".to_string(),
            timeout_secs: 1,
            bounded: true,
        })
        .unwrap()
    }

    /// Serves canned page bodies and records which pages were asked
    /// for; pages past the end fail like a dead site would.
    struct CannedPages {
        bodies: Vec<&'static str>,
        requested: RefCell<Vec<u32>>,
    }

    impl CannedPages {
        fn new(bodies: Vec<&'static str>) -> Self {
            Self {
                bodies,
                requested: RefCell::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.borrow().clone()
        }
    }

    #[async_trait(?Send)]
    impl PageFetcher for CannedPages {
        async fn fetch_page(&self, _meta: &SourceMeta, page: u32) -> Result<String> {
            self.requested.borrow_mut().push(page);
            match self.bodies.get(page as usize - 1) {
                Some(body) => Ok(body.to_string()),
                None => bail!("page {page} is past the canned set"),
            }
        }
    }

    /// Minimal extractor: one div per card, the card text is the
    /// street, so identical markup yields identical ids.
    struct TextCards {
        card: Selector,
    }

    impl TextCards {
        fn new() -> Self {
            Self {
                card: Selector::parse("div.card").unwrap(),
            }
        }
    }

    impl CardExtractor for TextCards {
        fn source_key(&self) -> &'static str {
            "viva_real"
        }

        fn card_selector(&self) -> &Selector {
            &self.card
        }

        fn price(&self, _card: ElementRef) -> Option<f64> {
            Some(100000.0)
        }

        fn size(&self, _card: ElementRef) -> Option<f64> {
            None
        }

        fn bedrooms(&self, _card: ElementRef) -> i64 {
            0
        }

        fn bathrooms(&self, _card: ElementRef) -> i64 {
            0
        }

        fn parking(&self, _card: ElementRef) -> i64 {
            0
        }

        fn address(&self, card: ElementRef, _resolver: &AddressResolver) -> AddressParts {
            AddressParts {
                street: card.text().collect::<String>().trim().to_string(),
                neighborhood: None,
                city: None,
            }
        }
    }

    const PAGE_AB: &str = r#"<div class="card">Rua A</div><div class="card">Rua B</div>"#;
    const PAGE_CD: &str = r#"<div class="card">Rua C</div><div class="card">Rua D</div>"#;
    const PAGE_EMPTY: &str = "<p>nada por aqui</p>";

    #[tokio::test]
    async fn duplicate_page_halts_before_the_next_fetch() {
        // Page 2 re-serves page 1's listings; with a threshold of 2
        // the pass must stop at page 2 and never ask for page 3.
        let storage = Storage::in_memory().unwrap();
        let geocoder = test_geocoder();
        let resolver = AddressResolver::new(&[], &[]);
        let settings = test_settings(2);
        let engine = Engine::new(&settings, &geocoder, &resolver, &storage, None);

        let pages = CannedPages::new(vec![PAGE_AB, PAGE_AB, PAGE_CD]);
        let adapter = TextCards::new();
        let mut summary = RunSummary::new("viva_real");
        engine
            .standard_pass(&test_meta(), &adapter, &pages, LoopKind::Register, &mut summary)
            .await;

        assert_eq!(pages.requested(), vec![1, 2]);
        assert_eq!(summary.pages_fetched, 2);
        // Both pages' cards were still written before the stop.
        assert_eq!(summary.register_records, 4);
        assert!(summary.ok());
    }

    #[tokio::test]
    async fn below_threshold_pagination_continues() {
        let storage = Storage::in_memory().unwrap();
        let geocoder = test_geocoder();
        let resolver = AddressResolver::new(&[], &[]);
        let settings = test_settings(3);
        let engine = Engine::new(&settings, &geocoder, &resolver, &storage, None);

        // Two shared ids per page never reach a threshold of 3; the
        // pass only ends when the canned set runs out.
        let pages = CannedPages::new(vec![PAGE_AB, PAGE_AB, PAGE_CD]);
        let adapter = TextCards::new();
        let mut summary = RunSummary::new("viva_real");
        engine
            .standard_pass(&test_meta(), &adapter, &pages, LoopKind::Register, &mut summary)
            .await;

        assert_eq!(pages.requested(), vec![1, 2, 3, 4]);
        assert!(summary.ok());
    }

    #[tokio::test]
    async fn empty_page_after_the_first_ends_the_pass() {
        let storage = Storage::in_memory().unwrap();
        let geocoder = test_geocoder();
        let resolver = AddressResolver::new(&[], &[]);
        let settings = test_settings(10);
        let engine = Engine::new(&settings, &geocoder, &resolver, &storage, None);

        let pages = CannedPages::new(vec![PAGE_AB, PAGE_EMPTY, PAGE_CD]);
        let adapter = TextCards::new();
        let mut summary = RunSummary::new("viva_real");
        engine
            .standard_pass(&test_meta(), &adapter, &pages, LoopKind::History, &mut summary)
            .await;

        assert_eq!(pages.requested(), vec![1, 2]);
        assert_eq!(summary.history_records, 2);
    }

    #[tokio::test]
    async fn page_cap_is_checked_before_fetching() {
        let storage = Storage::in_memory().unwrap();
        let geocoder = test_geocoder();
        let resolver = AddressResolver::new(&[], &[]);
        let settings = test_settings(10);
        let engine = Engine::new(&settings, &geocoder, &resolver, &storage, Some(1));

        let pages = CannedPages::new(vec![PAGE_AB, PAGE_CD]);
        let adapter = TextCards::new();
        let mut summary = RunSummary::new("viva_real");
        engine
            .standard_pass(&test_meta(), &adapter, &pages, LoopKind::Register, &mut summary)
            .await;

        assert_eq!(pages.requested(), vec![1]);
    }

    // --- auction pass: the trailing card is trimmed before the
    //     end-of-results check ---

    fn auction_meta() -> SourceMeta {
        SourceMeta {
            key: "leilao_imovel",
            base_url: "https://example.test/leiloes/".to_string(),
            pagination_param: "?pag=".to_string(),
            viewbox: ViewBox {
                corner_a: [-25.3, -49.4],
                corner_b: [-25.6, -49.1],
            },
            follow_redirects: true,
        }
    }

    fn auction_adapter() -> LeilaoImovelScraper {
        let config = SourceConfig {
            base_url: "https://example.test/leiloes/".to_string(),
            pagination_param: "?pag=".to_string(),
            property_card: ElementLocator {
                element: "div".to_string(),
                class: "auction-card".to_string(),
            },
            viewbox: ViewBox {
                corner_a: [-25.3, -49.4],
                corner_b: [-25.6, -49.1],
            },
            follow_redirects: true,
            fields: AuctionLocators {
                detail_link: ElementLocator {
                    element: "a".to_string(),
                    class: "card-link".to_string(),
                },
                rounds: RoundsLocator {
                    container: ElementLocator {
                        element: "div".to_string(),
                        class: "auction-dates".to_string(),
                    },
                    entry_tag: "p".to_string(),
                    first_round_token: "1ª Praça".to_string(),
                    second_round_token: "2ª Praça".to_string(),
                },
                current_price: ElementLocator {
                    element: "span".to_string(),
                    class: "current-bid".to_string(),
                },
                address: ChavesAddress {
                    element: "div".to_string(),
                    class: "address".to_string(),
                    child_tag: "p".to_string(),
                    street_index: 0,
                    locality_index: 1,
                },
                detail_page: DetailPageLocators {
                    usable_area: DetailField {
                        element: "span".to_string(),
                        class: "area-util".to_string(),
                        split_text: Some("m²".to_string()),
                    },
                    lot_area: DetailField {
                        element: "span".to_string(),
                        class: "area-terreno".to_string(),
                        split_text: Some("m²".to_string()),
                    },
                    parking: DetailField {
                        element: "span".to_string(),
                        class: "vagas".to_string(),
                        split_text: None,
                    },
                    bedrooms: DetailField {
                        element: "span".to_string(),
                        class: "quartos".to_string(),
                        split_text: None,
                    },
                    conditions: ElementLocator {
                        element: "div".to_string(),
                        class: "payment-conditions".to_string(),
                    },
                    financing_token: "financiamento".to_string(),
                    fgts_token: "fgts".to_string(),
                },
                drop_trailing_card: true,
            },
        };
        LeilaoImovelScraper::new(&config).unwrap()
    }

    const AUCTION_TWO_CARDS: &str = r#"
        <div class="auction-card"><div class="address"><p>Rua A</p><p>Centro</p></div></div>
        <div class="auction-card"><div class="address"><p>Rua B</p><p>Centro</p></div></div>"#;
    const AUCTION_ONE_CARD: &str =
        r#"<div class="auction-card"><div class="address"><p>Rua C</p><p>Centro</p></div></div>"#;

    #[tokio::test]
    async fn register_pass_ends_when_trimming_empties_the_page() {
        // Page 2 holds only the trailing card; after the trim nothing
        // is left, so the pass stops there instead of advancing.
        let storage = Storage::in_memory().unwrap();
        let geocoder = test_geocoder();
        let resolver = AddressResolver::new(&[], &[]);
        let settings = test_settings(10);
        let engine = Engine::new(&settings, &geocoder, &resolver, &storage, None);

        let pages = CannedPages::new(vec![AUCTION_TWO_CARDS, AUCTION_ONE_CARD, AUCTION_TWO_CARDS]);
        let adapter = auction_adapter();
        let client = Client::new();
        let mut summary = RunSummary::new("leilao_imovel");
        engine
            .auction_pass(
                &auction_meta(),
                &adapter,
                &pages,
                &client,
                LoopKind::Register,
                &mut summary,
            )
            .await;

        assert_eq!(pages.requested(), vec![1, 2]);
        assert_eq!(summary.register_records, 1);
    }

    #[tokio::test]
    async fn history_pass_keeps_the_trailing_card() {
        let storage = Storage::in_memory().unwrap();
        let geocoder = test_geocoder();
        let resolver = AddressResolver::new(&[], &[]);
        let settings = test_settings(10);
        let engine = Engine::new(&settings, &geocoder, &resolver, &storage, None);

        let pages = CannedPages::new(vec![AUCTION_TWO_CARDS]);
        let adapter = auction_adapter();
        let client = Client::new();
        let mut summary = RunSummary::new("leilao_imovel");
        engine
            .auction_pass(
                &auction_meta(),
                &adapter,
                &pages,
                &client,
                LoopKind::History,
                &mut summary,
            )
            .await;

        assert_eq!(summary.history_records, 2);
    }
}
