pub mod forecast;
pub mod series;

pub use forecast::{forecast_series, market_summary};
pub use series::{aggregate_daily, generate_insights};

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::types::{
    ChangeDirection, TrendChange, TrendMetric, TrendReport, TrendsInsight,
};

/// Turns a product's stored history into daily series, insights and a
/// forecast. Stateless across calls — every report is re-derived from
/// history, never incrementally updated.
pub struct TrendAnalyzer {
    repo: Arc<dyn ProductRepository>,
}

impl TrendAnalyzer {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    pub async fn analyze_product(&self, asin: &str, period_days: i64) -> Result<TrendReport> {
        let product = self
            .repo
            .get_product(asin)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(asin.to_string()))?;

        let now = Utc::now();
        let since = now - Duration::days(period_days);
        let price_history = self.repo.price_history(asin, since).await?;
        let rank_history = self.repo.rank_history(asin, since).await?;

        let price_points = aggregate_daily(&price_history, TrendMetric::Price);
        let rank_points = aggregate_daily(&rank_history, TrendMetric::Rank);

        let ratings: Vec<f64> = product.rating.into_iter().filter(|r| *r > 0.0).collect();
        let review_counts: Vec<f64> = (product.review_count > 0)
            .then_some(product.review_count as f64)
            .into_iter()
            .collect();

        let insights = generate_insights(&price_points, &rank_points, &ratings, &review_counts);
        let forecasts = [
            (TrendMetric::Price, &price_points),
            (TrendMetric::Rank, &rank_points),
        ]
        .into_iter()
        .filter_map(|(metric, points)| forecast_series(metric, points, now))
        .collect();
        let summary = market_summary(&insights, &price_points, &rank_points);

        Ok(TrendReport {
            asin: asin.to_string(),
            period_days,
            price: price_points,
            rank: rank_points,
            insights,
            forecasts,
            summary,
            generated_at: now,
        })
    }

    /// Compact first-vs-last change over the raw history, for the analysis
    /// insight rollup. Each trend needs at least two records.
    pub async fn trend_changes(&self, asin: &str, period_days: i64) -> Result<TrendsInsight> {
        let since = Utc::now() - Duration::days(period_days);
        let price_history = self.repo.price_history(asin, since).await?;
        let rank_history = self.repo.rank_history(asin, since).await?;

        let mut out = TrendsInsight::default();

        if price_history.len() >= 2 {
            let first = price_history[0].value;
            let last = price_history[price_history.len() - 1].value;
            if first != 0.0 {
                let change_percent = (last - first) / first * 100.0;
                out.price_trend = Some(TrendChange {
                    change_percent,
                    direction: if change_percent > 0.0 {
                        ChangeDirection::Up
                    } else if change_percent < 0.0 {
                        ChangeDirection::Down
                    } else {
                        ChangeDirection::Stable
                    },
                    data_points: price_history.len(),
                });
            }
        }

        if rank_history.len() >= 2 {
            let first = rank_history[0].value;
            let last = rank_history[rank_history.len() - 1].value;
            if first != 0.0 {
                // Sign inverted: a falling rank is an improvement.
                let change_percent = (first - last) / first * 100.0;
                out.rank_trend = Some(TrendChange {
                    change_percent,
                    direction: if change_percent > 0.0 {
                        ChangeDirection::Improved
                    } else if change_percent < 0.0 {
                        ChangeDirection::Declined
                    } else {
                        ChangeDirection::Stable
                    },
                    data_points: rank_history.len(),
                });
            }
        }

        Ok(out)
    }
}
