//! Daily series aggregation and threshold-based trend insights.

use std::collections::BTreeMap;

use crate::config::trend_thresholds;
use crate::types::{
    ChangeDirection, HistoryPoint, TrendDataPoint, TrendInsight, TrendInsightKind, TrendMetric,
};

/// Group history records by calendar date and average each day's samples.
/// `change_percent` is relative to the previous day's mean; the first point
/// has none. Rank series invert the sign — a falling rank is an improvement.
pub fn aggregate_daily(points: &[HistoryPoint], metric: TrendMetric) -> Vec<TrendDataPoint> {
    let mut daily: BTreeMap<chrono::NaiveDate, Vec<f64>> = BTreeMap::new();
    for point in points {
        daily.entry(point.recorded_at.date_naive()).or_default().push(point.value);
    }

    let mut out = Vec::with_capacity(daily.len());
    let mut previous_avg: Option<f64> = None;

    for (date, values) in daily {
        let avg = mean(&values);
        let change_percent = previous_avg.filter(|prev| *prev != 0.0).map(|prev| match metric {
            TrendMetric::Price => (avg - prev) / prev * 100.0,
            TrendMetric::Rank => (prev - avg) / prev * 100.0,
        });

        out.push(TrendDataPoint {
            date,
            value: avg,
            change_percent,
            volume: Some(values.len()),
        });
        previous_avg = Some(avg);
    }

    out
}

/// Total change over a daily series, percent of the first value. For rank
/// series the sign is inverted so positive means improved.
pub fn total_change_percent(points: &[TrendDataPoint], metric: TrendMetric) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let first = points.first()?.value;
    let last = points.last()?.value;
    if first == 0.0 {
        return None;
    }
    Some(match metric {
        TrendMetric::Price => (last - first) / first * 100.0,
        TrendMetric::Rank => (first - last) / first * 100.0,
    })
}

/// Threshold rules over the aggregated series plus the current rating /
/// review-count samples. No statistical tests, just cutoffs.
pub fn generate_insights(
    price_points: &[TrendDataPoint],
    rank_points: &[TrendDataPoint],
    ratings: &[f64],
    review_counts: &[f64],
) -> Vec<TrendInsight> {
    let mut insights = Vec::new();

    if let Some(change) = total_change_percent(price_points, TrendMetric::Price) {
        if change.abs() > trend_thresholds::PRICE_CHANGE_PCT {
            let direction =
                if change > 0.0 { ChangeDirection::Up } else { ChangeDirection::Down };
            let verb = if change > 0.0 { "rose" } else { "fell" };
            insights.push(TrendInsight {
                kind: TrendInsightKind::PriceTrend,
                title: format!("Price moved {direction}"),
                description: format!("Price {verb} {:.1}% over the period", change.abs()),
                confidence: 0.9,
                direction: Some(direction),
            });
        }
    }

    let daily_changes: Vec<f64> =
        price_points.iter().filter_map(|p| p.change_percent).collect();
    if daily_changes.len() > 1 {
        let volatility = sample_stdev(&daily_changes);
        if volatility > trend_thresholds::PRICE_VOLATILITY {
            insights.push(TrendInsight {
                kind: TrendInsightKind::PriceVolatility,
                title: "High price volatility".to_string(),
                description: format!(
                    "Daily price changes vary by {volatility:.1}% — unstable market"
                ),
                confidence: 0.8,
                direction: None,
            });
        }
    }

    if let Some(change) = total_change_percent(rank_points, TrendMetric::Rank) {
        if change.abs() > trend_thresholds::RANK_CHANGE_PCT {
            let direction =
                if change > 0.0 { ChangeDirection::Improved } else { ChangeDirection::Declined };
            insights.push(TrendInsight {
                kind: TrendInsightKind::RankTrend,
                title: format!("Rank {direction} noticeably"),
                description: format!("Average rank {direction} {:.1}%", change.abs()),
                confidence: 0.9,
                direction: Some(direction),
            });
        }
    }

    if !ratings.is_empty() {
        let avg_rating = mean(ratings);
        if avg_rating >= trend_thresholds::RATING_HIGH {
            insights.push(TrendInsight {
                kind: TrendInsightKind::RatingHigh,
                title: "Strong rating performance".to_string(),
                description: format!("Average rating {avg_rating:.2}"),
                confidence: 0.9,
                direction: None,
            });
        } else if avg_rating < trend_thresholds::RATING_LOW {
            insights.push(TrendInsight {
                kind: TrendInsightKind::RatingLow,
                title: "Rating needs improvement".to_string(),
                description: format!("Average rating {avg_rating:.2}"),
                confidence: 0.9,
                direction: None,
            });
        }
    }

    if !review_counts.is_empty() {
        let avg_reviews = mean(review_counts);
        if avg_reviews > trend_thresholds::REVIEWS_HIGH {
            insights.push(TrendInsight {
                kind: TrendInsightKind::ReviewVolumeHigh,
                title: "High review activity".to_string(),
                description: format!("Average review count {avg_reviews:.0}"),
                confidence: 0.8,
                direction: None,
            });
        } else if avg_reviews < trend_thresholds::REVIEWS_LOW {
            insights.push(TrendInsight {
                kind: TrendInsightKind::ReviewVolumeLow,
                title: "Low review volume".to_string(),
                description: format!("Average review count {avg_reviews:.0}"),
                confidence: 0.8,
                direction: None,
            });
        }
    }

    insights
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n−1 denominator). 0.0 for fewer than 2 values.
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
