mod analysis;
mod cache;
mod config;
mod db;
mod dedup;
mod detector;
mod error;
mod fetcher;
mod normalizer;
mod refresh;
mod scorer;
#[cfg(test)]
mod testutil;
mod trends;
mod types;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::{AnalysisScheduler, CompetitorAnalyzer};
use crate::cache::ResultCache;
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::db::{DbWriter, ProductRepository, SqliteRepository};
use crate::detector::{AnomalyDetector, AnomalyMonitor};
use crate::error::Result;
use crate::fetcher::ScrapeClient;
use crate::refresh::ListingRefresher;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    let repo: Arc<dyn ProductRepository> = Arc::new(SqliteRepository::new(pool.clone()));

    // --- Register tracked products and competitor sets from env ---
    for asin in &cfg.tracked_asins {
        repo.register_main(asin).await?;
    }
    let mut linked = 0usize;
    for (main_asin, competitors) in &cfg.competitor_sets {
        repo.register_main(main_asin).await?;
        for competitor in competitors {
            repo.link_competitor(main_asin, competitor).await?;
            linked += 1;
        }
    }
    if cfg.tracked_asins.is_empty() && cfg.competitor_sets.is_empty() {
        warn!(
            "TRACKED_ASINS not set — no products will be refreshed. \
             Example: TRACKED_ASINS=B08N5WRWNW,B07XJ8C8F5"
        );
    } else {
        info!(
            mains = cfg.tracked_asins.len() + cfg.competitor_sets.len(),
            links = linked,
            "Tracked products registered"
        );
    }

    // --- Bootstrap: one refresh cycle before the background loops start ---
    let client = ScrapeClient::new(&cfg)?;
    let refresher = ListingRefresher::new(cfg.clone(), client, Arc::clone(&repo));
    if let Err(e) = refresher.refresh_cycle().await {
        warn!("Bootstrap refresh failed (continuing with stored snapshots): {e}");
    }

    // --- Channels ---
    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

    // --- Spawn tasks ---

    // DB writer: drains engine events off the hot paths
    let writer = DbWriter::new(SqliteRepository::new(pool.clone()), event_rx);
    tokio::spawn(async move { writer.run().await });

    // Anomaly monitor
    let detector = AnomalyDetector::new(Arc::clone(&repo));
    let monitor = AnomalyMonitor::new(detector, event_tx.clone(), cfg.monitor_interval_secs);
    tokio::spawn(async move { monitor.run().await });

    // Analysis scheduler
    let cache = ResultCache::new();
    let analyzer = CompetitorAnalyzer::new(Arc::clone(&repo), cache);
    let scheduler = AnalysisScheduler::new(
        analyzer,
        Arc::clone(&repo),
        event_tx.clone(),
        cfg.analysis_interval_secs,
    );
    tokio::spawn(async move { scheduler.run().await });

    // Listing refresher
    tokio::spawn(async move { refresher.run().await });

    info!("Competitive intelligence engine running — Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
