use std::time::Duration;

use tracing::warn;

use crate::config::{Config, SCRAPE_BATCH_SIZE};
use crate::error::{AppError, Result};
use crate::types::RawRecord;

#[derive(Debug, Default)]
pub struct FetchStats {
    pub requested: usize,
    pub received: usize,
    /// Items the service returned that are not JSON objects.
    pub rejected_not_object: usize,
}

/// Client for the external scraping service. The engine's only contract with
/// it: send a batch of ASINs, get back a list of raw per-item records in
/// whatever shape the provider produces — normalization happens downstream.
pub struct ScrapeClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScrapeClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, base_url: cfg.scraper_url.clone() })
    }

    /// Fetch raw listing records for the given ASINs, batching requests to
    /// stay under the service's request-size limit. A failed batch fails the
    /// whole fetch — partial-batch handling belongs to the caller's cycle.
    pub async fn fetch_listings(&self, asins: &[String]) -> Result<(Vec<RawRecord>, FetchStats)> {
        let mut records = Vec::with_capacity(asins.len());
        let mut stats = FetchStats { requested: asins.len(), ..FetchStats::default() };

        for chunk in asins.chunks(SCRAPE_BATCH_SIZE) {
            let url = format!("{}/v1/products", self.base_url);
            let resp: serde_json::Value = self
                .client
                .post(&url)
                .json(&serde_json::json!({ "asins": chunk }))
                .send()
                .await?
                .json()
                .await?;

            let items = match resp.get("products").and_then(|p| p.as_array()) {
                Some(items) => items.clone(),
                None => {
                    return Err(AppError::Bootstrap(
                        "scrape service response missing products array".to_string(),
                    ))
                }
            };

            for item in items {
                if item.is_object() {
                    stats.received += 1;
                    records.push(item);
                } else {
                    stats.rejected_not_object += 1;
                }
            }
        }

        if stats.rejected_not_object > 0 {
            warn!(
                rejected = stats.rejected_not_object,
                "scrape service returned non-object items"
            );
        }

        Ok((records, stats))
    }
}
