use anyhow::Result;
use charter_scout::browser::{BrowserPage, ChromePage};
use charter_scout::config::Config;
use charter_scout::merge::dedupe;
use charter_scout::normalize::Normalizer;
use charter_scout::persist::Persister;
use charter_scout::scrapers::{bark, k9, SourceAdapter};
use charter_scout::storage;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DRY_RUN_OUTPUT: &str = "scraped_flights.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    K9,
    Bark,
    All,
}

/// Scrape charter marketplaces and record flight snapshots
#[derive(Parser, Debug)]
#[command(name = "charter-scout")]
#[command(version)]
struct Cli {
    /// Keep results in memory and write them to scraped_flights.json
    #[arg(long)]
    dry_run: bool,

    /// Only use plain HTTP strategies
    #[arg(long)]
    no_browser: bool,

    #[arg(long, value_enum, default_value_t = Source::All)]
    source: Source,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env(!cli.dry_run)?;

    // Every configuration problem surfaces before the first request
    let store = storage::open(config.store.as_ref(), cli.dry_run)?;
    let normalizer = if config.canonicalize_airports {
        Normalizer::with_airports(config.airports()?)
    } else {
        Normalizer::new()
    };

    info!("🐕 Charter Scout - flight snapshot run");
    info!("==========================================");

    let page = if cli.no_browser {
        None
    } else {
        match ChromePage::launch(config.headless) {
            Ok(page) => Some(Arc::new(page) as Arc<dyn BrowserPage>),
            Err(e) => {
                warn!("⚠️ Browser unavailable, continuing with HTTP only: {:#}", e);
                None
            }
        }
    };

    let mut adapters: Vec<SourceAdapter> = Vec::new();
    if matches!(cli.source, Source::K9 | Source::All) {
        adapters.push(k9::adapter(&config, page.clone())?);
    }
    if matches!(cli.source, Source::Bark | Source::All) {
        adapters.push(bark::adapter(&config, page.clone())?);
    }

    let mut listings = Vec::new();
    for adapter in &adapters {
        listings.extend(adapter.scrape().await);
    }
    let listings = dedupe(listings);
    info!("✅ Scraped {} unique listings", listings.len());

    if cli.dry_run {
        let json = serde_json::to_string_pretty(&listings)?;
        tokio::fs::write(DRY_RUN_OUTPUT, json).await?;
        info!("💾 Saved all listings to {}", DRY_RUN_OUTPUT);
    }

    let report = Persister::new(store).persist_all(&listings, &normalizer).await;

    info!(
        "✅ Persisted {} rows ({} flights, {} snapshots), {} skipped, {} failed",
        report.rows(),
        report.flights,
        report.snapshots,
        report.skipped,
        report.failed
    );

    Ok(())
}
