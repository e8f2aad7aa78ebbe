//! Linear extrapolation over the most recent daily points, with a
//! consistency-derived confidence. The confidence formula is an empirical
//! heuristic carried as-is — see the tunables in `config.rs`.

use chrono::{DateTime, Duration, Utc};

use crate::config::{FORECAST_HORIZON_DAYS, FORECAST_MIN_POINTS, FORECAST_WINDOW_POINTS};
use crate::trends::series::{mean, sample_stdev, total_change_percent};
use crate::types::{
    ChangeDirection, MarketForecast, MarketHealth, MarketSummary, TrendDataPoint, TrendDirection,
    TrendInsight, TrendInsightKind, TrendMetric,
};

/// Project the series seven days ahead from its most recent (at most 7)
/// daily values. Requires at least 3 points in total; returns None otherwise.
pub fn forecast_series(
    metric: TrendMetric,
    points: &[TrendDataPoint],
    now: DateTime<Utc>,
) -> Option<MarketForecast> {
    if points.len() < FORECAST_MIN_POINTS {
        return None;
    }

    let window_start = points.len().saturating_sub(FORECAST_WINDOW_POINTS);
    let values: Vec<f64> = points[window_start..].iter().map(|p| p.value).collect();
    if values.len() < 2 {
        return None;
    }

    let first = values[0];
    let last = values[values.len() - 1];
    let trend = (last - first) / values.len() as f64;
    let predicted_value = last + trend * FORECAST_HORIZON_DAYS as f64;

    // Confidence from the consistency of day-over-day deltas: the complement
    // of their coefficient of variation, clamped. Can go negative before the
    // clamp — that is inherited behavior, not a bug fix candidate.
    let confidence = if values.len() > 2 {
        let deltas: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let delta_mean = mean(&deltas);
        if delta_mean != 0.0 {
            (1.0 - sample_stdev(&deltas) / delta_mean.abs()).clamp(0.3, 0.9)
        } else {
            0.5
        }
    } else {
        0.5
    };

    let trend_direction = if trend > 0.0 {
        TrendDirection::Increasing
    } else if trend < 0.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Some(MarketForecast {
        metric,
        current_value: last,
        predicted_value,
        prediction_date: now + Duration::days(FORECAST_HORIZON_DAYS),
        confidence,
        trend_direction,
    })
}

/// Roll per-metric insights into one market-level summary. Baseline score 75;
/// each opportunity adds 5 (cap 95), each risk subtracts 10 (floor 40).
pub fn market_summary(
    insights: &[TrendInsight],
    price_points: &[TrendDataPoint],
    rank_points: &[TrendDataPoint],
) -> MarketSummary {
    let mut key_trends = Vec::new();

    if let Some(change) = total_change_percent(price_points, TrendMetric::Price) {
        if change.abs() > crate::config::trend_thresholds::PRICE_CHANGE_PCT {
            let word = if change > 0.0 { "up" } else { "down" };
            key_trends.push(format!("Price {word} {:.1}%", change.abs()));
        }
    }
    if let Some(change) = total_change_percent(rank_points, TrendMetric::Rank) {
        if change.abs() > crate::config::trend_thresholds::RANK_CHANGE_PCT {
            let word = if change > 0.0 { "improved" } else { "declined" };
            key_trends.push(format!("Rank {word} {:.1}%", change.abs()));
        }
    }

    let mut opportunities = Vec::new();
    let mut risks = Vec::new();
    for insight in insights {
        let directional = matches!(
            insight.kind,
            TrendInsightKind::PriceTrend | TrendInsightKind::RankTrend
        );
        if !directional || insight.confidence <= 0.7 {
            continue;
        }
        match insight.direction {
            Some(ChangeDirection::Up) | Some(ChangeDirection::Improved) => {
                opportunities.push(insight.title.clone())
            }
            _ => risks.push(insight.title.clone()),
        }
    }

    let (market_health, overall_score) = if risks.len() > opportunities.len() {
        (MarketHealth::Challenging, (75 - risks.len() as i32 * 10).max(40))
    } else if opportunities.len() > risks.len() {
        (MarketHealth::Growing, (75 + opportunities.len() as i32 * 5).min(95))
    } else {
        (MarketHealth::Stable, 75)
    };

    MarketSummary { market_health, key_trends, opportunities, risks, overall_score }
}
