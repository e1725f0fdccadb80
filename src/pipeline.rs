// src/pipeline.rs
//
// Two-phase HTTP acquisition: resolve every contract number to its portal CID
// through the search page, then fetch and parse the detail pages of the hits.
// Requests run concurrently inside a batch; batches run one after another.

use crate::extractors::{find_contract_match, parse_contract_page_opt, ContractMatch, ContractRecord};
use crate::portal::client::PortalClient;
use crate::utils::html_debug;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::Instrument;

pub const DEFAULT_BATCH_SIZE: usize = 50;
const BATCH_PAUSE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub batch_size: usize,
    pub batch_pause: Duration,
    /// When set, raw and annotated detail pages are written below this directory.
    pub debug_dir: Option<PathBuf>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: BATCH_PAUSE,
            debug_dir: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    /// One entry per requested number; `None` when nothing could be extracted.
    pub results: BTreeMap<String, Option<ContractRecord>>,
    /// Numbers the portal search did not return.
    pub unmatched: Vec<String>,
    pub elapsed: Duration,
}

impl ScrapeOutcome {
    pub fn success_count(&self) -> usize {
        self.results.values().filter(|r| r.is_some()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

pub struct Scraper {
    client: Arc<PortalClient>,
    options: ScrapeOptions,
}

impl Scraper {
    pub fn new(client: PortalClient, options: ScrapeOptions) -> Self {
        Self {
            client: Arc::new(client),
            options,
        }
    }

    pub async fn run(&self, contract_numbers: &[String]) -> ScrapeOutcome {
        let started = Instant::now();
        let numbers = dedup_numbers(contract_numbers);
        tracing::info!(
            "Starting scrape for {} contract terms (batch size {})",
            numbers.len(),
            self.options.batch_size
        );

        let mut outcome = ScrapeOutcome::default();
        for number in &numbers {
            outcome.results.insert(number.clone(), None);
        }

        // Phase 1: contract number -> CID
        let client = Arc::clone(&self.client);
        let matches = run_in_batches(
            numbers.clone(),
            self.options.batch_size,
            self.options.batch_pause,
            move |number: String| {
                let client = Arc::clone(&client);
                let span = tracing::info_span!("search", contract = %number);
                async move { resolve_cid(&client, &number).await }.instrument(span)
            },
        )
        .await;

        let mut matched: Vec<(String, ContractMatch)> = Vec::new();
        for (number, found) in numbers.iter().zip(matches) {
            match found {
                Some(SearchOutcome::Matched(m)) => matched.push((number.clone(), m)),
                Some(SearchOutcome::NotFound) => outcome.unmatched.push(number.clone()),
                Some(SearchOutcome::FetchFailed) | None => {}
            }
        }
        tracing::info!("Found {} matches from {} terms", matched.len(), numbers.len());

        // Phase 2: CID -> detail page -> record
        let client = Arc::clone(&self.client);
        let debug_dir = self.options.debug_dir.clone();
        let records = run_in_batches(
            matched.clone(),
            self.options.batch_size,
            self.options.batch_pause,
            move |(number, found): (String, ContractMatch)| {
                let client = Arc::clone(&client);
                let debug_dir = debug_dir.clone();
                let span = tracing::info_span!("detail", contract = %number);
                async move { fetch_record(&client, &number, &found, debug_dir).await }.instrument(span)
            },
        )
        .await;

        for ((number, _), record) in matched.into_iter().zip(records) {
            outcome.results.insert(number, record.flatten());
        }

        outcome.elapsed = started.elapsed();
        let total = outcome.results.len();
        let success = outcome.success_count();
        let rate = if total == 0 { 0.0 } else { success as f64 / total as f64 * 100.0 };
        tracing::info!("Scraping completed in {:.2} seconds", outcome.elapsed.as_secs_f64());
        tracing::info!("Success rate: {:.2}% ({}/{})", rate, success, total);
        outcome
    }
}

enum SearchOutcome {
    Matched(ContractMatch),
    NotFound,
    FetchFailed,
}

async fn resolve_cid(client: &PortalClient, number: &str) -> SearchOutcome {
    match client.search(number).await {
        Ok(html) => match find_contract_match(&html, number) {
            Some(m) => SearchOutcome::Matched(m),
            None => SearchOutcome::NotFound,
        },
        Err(e) => {
            tracing::warn!("Failed to fetch search page for '{}': {}", number, e);
            SearchOutcome::FetchFailed
        }
    }
}

async fn fetch_record(
    client: &PortalClient,
    number: &str,
    found: &ContractMatch,
    debug_dir: Option<PathBuf>,
) -> Option<ContractRecord> {
    let html = match client.detail(number, &found.cid).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Failed to fetch details for '{}': {}", number, e);
            return None;
        }
    };

    if let Some(dir) = debug_dir {
        let contract_dir = dir.join(html_debug::safe_file_stem(number));
        if let Err(e) = html_debug::dump_detail_page(&html, &contract_dir) {
            tracing::warn!("Failed to write debug HTML for '{}': {}", number, e);
        }
    }

    let record = parse_contract_page_opt(&html);
    if record.is_none() {
        tracing::warn!("Failed to parse details for '{}'", number);
    }
    record
}

/// Trimmed, non-empty, first occurrence wins.
fn dedup_numbers(numbers: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    numbers
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && seen.insert(n.to_uppercase()))
        .collect()
}

/// Runs `task` over `items`, `batch_size` at a time, pausing between batches.
/// Output is aligned with the input; `None` marks a task that panicked.
pub async fn run_in_batches<T, R, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    pause: Duration,
    task: F,
) -> Vec<Option<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let batch_size = batch_size.max(1);
    let total = items.len();
    let mut results: Vec<Option<R>> = Vec::with_capacity(total);
    let mut items = items.into_iter().peekable();
    let mut offset = 0usize;

    while items.peek().is_some() {
        let mut set = JoinSet::new();
        let mut in_batch = 0usize;
        for (i, item) in items.by_ref().take(batch_size).enumerate() {
            let fut = task(item);
            set.spawn(async move { (i, fut.await) });
            in_batch += 1;
        }

        let mut batch: Vec<Option<R>> = (0..in_batch).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((i, value)) => batch[i] = Some(value),
                Err(e) => tracing::error!("Task in batch starting at {} failed: {}", offset, e),
            }
        }
        results.extend(batch);
        offset += in_batch;
        tracing::debug!("Finished batch, {}/{} done", offset, total);

        if items.peek().is_some() && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    results
}
