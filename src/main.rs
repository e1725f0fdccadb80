// src/main.rs
mod extractors;
mod pipeline;
mod portal;
mod storage;
mod utils;

use clap::Parser;
use extractors::parse_contract_page;
use pipeline::{ScrapeOptions, Scraper, DEFAULT_BATCH_SIZE};
use portal::client::PortalClient;
use portal::models::{PortalConfig, DEFAULT_PORTAL_URL};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use storage::{StorageManager, DEFAULT_RESULTS_FILE};
use utils::AppError;

/// Command Line Interface for the MTA contract compliance scraper
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Contract number to scrape (repeatable; overrides the input file)
    #[arg(short, long = "contract")]
    contracts: Vec<String>,

    /// JSON file holding a list of contract numbers
    #[arg(short, long, default_value = "input_data/input.json")]
    input: PathBuf,

    /// Output directory for the results file and debug dumps
    #[arg(short, long, default_value = "output_data")]
    output_dir: PathBuf,

    /// Results file name inside the output directory
    #[arg(long, default_value = DEFAULT_RESULTS_FILE)]
    output_file: String,

    /// Number of contracts fetched concurrently per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Attempts per portal request
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Portal base URL
    #[arg(long, env = "MTA_PORTAL_URL", default_value = DEFAULT_PORTAL_URL)]
    portal_url: String,

    /// Parse a saved contract detail page instead of scraping the portal
    #[arg(long)]
    html_file: Option<PathBuf>,

    /// Debug mode - save raw and annotated detail pages
    #[arg(short, long)]
    debug: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(args.verbose);
    tracing::info!("Starting processing for args: {:?}", args);

    let storage = StorageManager::new(&args.output_dir)?;

    // 2. Offline mode: a single saved page
    if let Some(html_file) = &args.html_file {
        return parse_saved_page(html_file, &args, &storage);
    }

    // 3. Contract numbers from the command line or the input file
    let numbers = if args.contracts.is_empty() {
        storage::load_input(&args.input)?
    } else {
        args.contracts.clone()
    };
    tracing::info!("Loaded {} contract numbers", numbers.len());

    // 4. Portal client and scraper
    let config = PortalConfig {
        base_url: args.portal_url.clone(),
        max_retries: args.max_retries,
        ..PortalConfig::default()
    };
    let client = PortalClient::new(config)?;
    let options = ScrapeOptions {
        batch_size: args.batch_size,
        debug_dir: args.debug.then(|| storage.debug_dir()),
        ..ScrapeOptions::default()
    };
    let scraper = Scraper::new(client, options);

    // 5. Scrape and persist
    let outcome = scraper.run(&numbers).await;
    storage.save_results(&args.output_file, &outcome.results)?;
    if let Err(e) = storage.save_unmatched(&outcome.unmatched) {
        tracing::error!("Failed to save unmatched contracts: {}", e);
    }

    let success_count = outcome.success_count();
    let failure_count = outcome.failure_count();
    tracing::info!(
        "Processing finished. Success: {}, Failures: {} (results in {})",
        success_count,
        failure_count,
        storage.base_dir().display()
    );

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract any of {} contracts",
            failure_count
        )));
    }

    Ok(())
}

fn parse_saved_page(html_file: &Path, args: &Args, storage: &StorageManager) -> Result<(), AppError> {
    tracing::info!("Parsing saved page: {}", html_file.display());
    let html = std::fs::read_to_string(html_file)?;

    if args.debug {
        let dir = storage.debug_dir().join("offline");
        if let Err(e) = utils::html_debug::dump_detail_page(&html, &dir) {
            tracing::warn!("Failed to create debug HTML: {}", e);
        }
    }

    let record = match parse_contract_page(&html) {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("Failed to extract contract from {}: {}", html_file.display(), e);
            println!("null");
            return Err(AppError::Extraction(e));
        }
    };

    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| AppError::Processing(format!("Failed to serialize record: {}", e)))?;
    println!("{}", json);

    if let Some(number) = args.contracts.first() {
        let mut results = BTreeMap::new();
        results.insert(number.trim().to_string(), Some(record));
        storage.save_results(&args.output_file, &results)?;
    }
    Ok(())
}
