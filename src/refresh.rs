use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::ProductRepository;
use crate::dedup::consolidate_listings;
use crate::error::Result;
use crate::fetcher::ScrapeClient;
use crate::normalizer::record::{extract_buy_box_price, standardize_batch};

/// Background task that re-fetches every tracked listing from the scrape
/// service, standardizes the raw records, and writes fresh snapshots plus
/// history rows.
pub struct ListingRefresher {
    cfg: Config,
    client: ScrapeClient,
    repo: Arc<dyn ProductRepository>,
}

impl ListingRefresher {
    pub fn new(cfg: Config, client: ScrapeClient, repo: Arc<dyn ProductRepository>) -> Self {
        Self { cfg, client, repo }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.cfg.refresh_interval_secs));
        ticker.tick().await; // skip immediate first tick — bootstrap already ran

        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh_cycle().await {
                error!("Listing refresh failed: {e}");
            }
        }
    }

    /// One full fetch → standardize → persist pass over the tracked set.
    pub async fn refresh_cycle(&self) -> Result<()> {
        let asins = self.repo.active_asins().await?;
        if asins.is_empty() {
            info!("No tracked products — nothing to refresh");
            return Ok(());
        }

        let (raws, fetch_stats) = self.client.fetch_listings(&asins).await?;
        let now = Utc::now();
        let (standardized, stats) = standardize_batch(&raws, now);
        let listings = consolidate_listings(standardized);

        if stats.dropped() > 0 {
            warn!(
                dropped_missing_asin = stats.dropped_missing_asin,
                dropped_missing_title = stats.dropped_missing_title,
                "[REFRESH] dropped invalid records; samples: {:?}",
                stats.dropped_samples,
            );
        }

        let mut updated = 0usize;
        let mut history_rows = 0usize;
        for listing in &listings {
            if let Err(e) = self.repo.upsert_snapshot(listing).await {
                warn!(asin = %listing.asin, "snapshot write failed, continuing: {e}");
                continue;
            }
            updated += 1;

            let buy_box_price = extract_buy_box_price(listing);
            if listing.price.is_some() || buy_box_price.is_some() {
                if let Err(e) = self
                    .repo
                    .append_price_history(&listing.asin, listing.price, buy_box_price, now)
                    .await
                {
                    warn!(asin = %listing.asin, "price history write failed: {e}");
                } else {
                    history_rows += 1;
                }
            }
            if let Some(rank) = listing.rank {
                if let Err(e) = self.repo.append_rank_history(&listing.asin, rank, now).await {
                    warn!(asin = %listing.asin, "rank history write failed: {e}");
                } else {
                    history_rows += 1;
                }
            }
        }

        info!(
            requested = fetch_stats.requested,
            fetched = fetch_stats.received,
            standardized = stats.standardized,
            dropped = stats.dropped(),
            updated,
            history_rows,
            "Refresh complete: {updated} snapshots, {history_rows} history rows",
        );

        Ok(())
    }
}
