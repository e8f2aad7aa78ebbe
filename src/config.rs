use crate::error::{AppError, Result};

pub const SCRAPER_API_URL: &str = "http://127.0.0.1:8081";

/// Listing refresh interval (seconds) — how often tracked products are
/// re-fetched from the scrape service.
pub const REFRESH_INTERVAL_SECS: u64 = 3600;

/// Anomaly sweep interval (seconds).
pub const MONITOR_INTERVAL_SECS: u64 = 900;

/// Competitor analysis interval (seconds).
pub const ANALYSIS_INTERVAL_SECS: u64 = 21_600;

/// Channel capacity for internal message routing.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Max ASINs per scrape-service request.
pub const SCRAPE_BATCH_SIZE: usize = 50;

/// Trailing window of history the anomaly checks average over.
pub const HISTORY_WINDOW_DAYS: i64 = 7;

/// Minimum historical data points required before an anomaly check runs.
pub const MIN_HISTORY_POINTS: usize = 2;

/// Period the trend analyzer aggregates over.
pub const TREND_WINDOW_DAYS: i64 = 30;

/// How far ahead the forecaster projects.
pub const FORECAST_HORIZON_DAYS: i64 = 7;

/// The forecaster fits over at most this many of the most recent daily points.
pub const FORECAST_WINDOW_POINTS: usize = 7;

/// Minimum daily points before a forecast is attempted.
pub const FORECAST_MIN_POINTS: usize = 3;

/// TTL for cached trend lookups (seconds).
pub const TRENDS_CACHE_TTL_SECS: u64 = 1800;

/// Trend insight thresholds. Empirically chosen cutoffs, not statistical
/// tests — tune per deployment.
pub mod trend_thresholds {
    /// Total price change over the period worth flagging (percent).
    pub const PRICE_CHANGE_PCT: f64 = 5.0;
    /// Stdev of daily price changes above this flags volatility.
    pub const PRICE_VOLATILITY: f64 = 5.0;
    /// Total rank change over the period worth flagging (percent).
    pub const RANK_CHANGE_PCT: f64 = 10.0;
    pub const RATING_HIGH: f64 = 4.5;
    pub const RATING_LOW: f64 = 3.5;
    pub const REVIEWS_HIGH: f64 = 1000.0;
    pub const REVIEWS_LOW: f64 = 100.0;
}

/// Price-tier band used by market-position classification: main price below
/// `LOW_FACTOR × competitor avg` is the low tier, above `PREMIUM_FACTOR ×`
/// the premium tier, in between the mid tier.
pub mod price_tiers {
    pub const LOW_FACTOR: f64 = 0.8;
    pub const PREMIUM_FACTOR: f64 = 1.2;
}

/// Percentile cuts for the pricing insight's position label.
pub mod price_position {
    pub const LOW_MAX: f64 = 0.25;
    pub const HIGH_MIN: f64 = 0.75;
}

/// Per-metric anomaly thresholds. Percent thresholds compare against the
/// trailing-window average; the rating threshold is an absolute difference.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyThresholds {
    pub price_pct: f64,
    pub buy_box_pct: f64,
    pub bsr_pct: f64,
    pub rating_abs: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            price_pct: 10.0,
            buy_box_pct: 15.0,
            bsr_pct: 30.0,
            rating_abs: 0.5,
        }
    }
}

/// Component weights for the competitive score. Defaults sum to 100.
#[derive(Debug, Clone, Copy)]
pub struct CompetitiveWeights {
    pub price: f64,
    pub rating: f64,
    pub reviews: f64,
    pub rank: f64,
}

impl Default for CompetitiveWeights {
    fn default() -> Self {
        Self { price: 30.0, rating: 25.0, reviews: 20.0, rank: 25.0 }
    }
}

/// Component weights for the similarity score. Defaults sum to 100.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityWeights {
    pub brand: f64,
    pub category: f64,
    pub title: f64,
    pub price: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self { brand: 20.0, category: 30.0, title: 30.0, price: 20.0 }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub scraper_url: String,
    pub log_level: String,
    pub db_path: String,
    pub refresh_interval_secs: u64,
    pub monitor_interval_secs: u64,
    pub analysis_interval_secs: u64,
    /// Main-product ASINs to register at startup (TRACKED_ASINS, comma-separated).
    pub tracked_asins: Vec<String>,
    /// Competitor sets to register at startup (COMPETITOR_SETS).
    /// Format: "MAIN1:COMP1|COMP2,MAIN2:COMP3"
    pub competitor_sets: Vec<(String, Vec<String>)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            scraper_url: std::env::var("SCRAPER_URL")
                .unwrap_or_else(|_| SCRAPER_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tracker.db".to_string()),
            refresh_interval_secs: std::env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| REFRESH_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config("REFRESH_INTERVAL_SECS must be an integer".to_string())
                })?,
            monitor_interval_secs: std::env::var("MONITOR_INTERVAL_SECS")
                .unwrap_or_else(|_| MONITOR_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(MONITOR_INTERVAL_SECS),
            analysis_interval_secs: std::env::var("ANALYSIS_INTERVAL_SECS")
                .unwrap_or_else(|_| ANALYSIS_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(ANALYSIS_INTERVAL_SECS),
            tracked_asins: std::env::var("TRACKED_ASINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            competitor_sets: parse_competitor_sets(
                &std::env::var("COMPETITOR_SETS").unwrap_or_default(),
            ),
        })
    }
}

/// Parse "MAIN1:COMP1|COMP2,MAIN2:COMP3" into (main, competitors) pairs.
/// Malformed entries are skipped, not fatal.
fn parse_competitor_sets(raw: &str) -> Vec<(String, Vec<String>)> {
    raw.split(',')
        .filter_map(|entry| {
            let (main, rest) = entry.split_once(':')?;
            let main = main.trim().to_uppercase();
            if main.is_empty() {
                return None;
            }
            let competitors: Vec<String> = rest
                .split('|')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if competitors.is_empty() {
                return None;
            }
            Some((main, competitors))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn competitor_sets_parse_multiple_mains() {
        let sets = parse_competitor_sets("b001:b002|b003,B004:B005");
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].0, "B001");
        assert_eq!(sets[0].1, vec!["B002".to_string(), "B003".to_string()]);
        assert_eq!(sets[1].0, "B004");
    }

    #[test]
    fn competitor_sets_skip_malformed_entries() {
        let sets = parse_competitor_sets("no-colon,:B002,B003:");
        assert!(sets.is_empty());
    }

    #[test]
    fn default_weights_sum_to_100() {
        let w = CompetitiveWeights::default();
        assert!((w.price + w.rating + w.reviews + w.rank - 100.0).abs() < 1e-9);
        let s = SimilarityWeights::default();
        assert!((s.brand + s.category + s.title + s.price - 100.0).abs() < 1e-9);
    }
}
