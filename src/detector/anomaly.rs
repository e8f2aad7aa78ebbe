//! Rolling-window anomaly checks. Each check is a pure function of the
//! current value and the trailing historical window — no state between
//! invocations. Missing data is a skipped result with a reason, never an
//! error; only a missing product is.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::config::{AnomalyThresholds, HISTORY_WINDOW_DAYS, MIN_HISTORY_POINTS};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::trends::series::mean;
use crate::types::{AnomalyDirection, AnomalyResult, AnomalySummary, Metric, ProductSnapshot};

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn skipped(metric: Metric, threshold: f64, reason: &str, check_time: DateTime<Utc>) -> AnomalyResult {
    AnomalyResult {
        metric,
        is_anomaly: false,
        current_value: None,
        average_value: None,
        change_percent: None,
        change: None,
        threshold,
        direction: None,
        historical_data_points: 0,
        reason: Some(reason.to_string()),
        check_time,
    }
}

/// Compare a current value against the mean of its historical window.
/// Flags when the relative change strictly exceeds the threshold percent.
/// Fewer than `MIN_HISTORY_POINTS` historical values is a skip, not an error.
pub fn evaluate_relative(
    metric: Metric,
    current: f64,
    history: &[f64],
    threshold: f64,
    check_time: DateTime<Utc>,
) -> AnomalyResult {
    if history.len() < MIN_HISTORY_POINTS {
        return skipped(metric, threshold, "insufficient historical data", check_time);
    }

    let avg = mean(history);
    let change_percent =
        if avg == 0.0 { 0.0 } else { round2((current - avg).abs() / avg * 100.0) };

    let direction = match metric {
        Metric::Bsr => {
            // A numerically higher rank is worse.
            if current > avg {
                AnomalyDirection::Worse
            } else {
                AnomalyDirection::Better
            }
        }
        _ => {
            if current > avg {
                AnomalyDirection::Increase
            } else {
                AnomalyDirection::Decrease
            }
        }
    };

    AnomalyResult {
        metric,
        is_anomaly: change_percent > threshold,
        current_value: Some(current),
        average_value: Some(round2(avg)),
        change_percent: Some(change_percent),
        change: None,
        threshold,
        direction: Some(direction),
        historical_data_points: history.len(),
        reason: None,
        check_time,
    }
}

/// Ratings move slowly, so the check is an absolute difference against the
/// last recorded rating rather than a window average.
pub fn evaluate_rating(
    current: f64,
    previous: f64,
    threshold: f64,
    check_time: DateTime<Utc>,
) -> AnomalyResult {
    if current == previous {
        return skipped(Metric::Rating, threshold, "no significant rating change", check_time);
    }

    let change = round2((current - previous).abs());
    AnomalyResult {
        metric: Metric::Rating,
        is_anomaly: change > threshold,
        current_value: Some(current),
        average_value: Some(previous),
        change_percent: None,
        change: Some(change),
        threshold,
        direction: Some(if current > previous {
            AnomalyDirection::Increase
        } else {
            AnomalyDirection::Decrease
        }),
        historical_data_points: 1,
        reason: None,
        check_time,
    }
}

pub struct AnomalyDetector {
    repo: Arc<dyn ProductRepository>,
    thresholds: AnomalyThresholds,
}

impl AnomalyDetector {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self::with_thresholds(repo, AnomalyThresholds::default())
    }

    pub fn with_thresholds(repo: Arc<dyn ProductRepository>, thresholds: AnomalyThresholds) -> Self {
        Self { repo, thresholds }
    }

    async fn get_product(&self, asin: &str) -> Result<ProductSnapshot> {
        self.repo
            .get_product(asin)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(asin.to_string()))
    }

    fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(HISTORY_WINDOW_DAYS)
    }

    /// Listed price vs its 7-day average, `current` overriding the stored
    /// snapshot value when supplied.
    pub async fn check_price_anomaly(
        &self,
        asin: &str,
        current: Option<f64>,
    ) -> Result<AnomalyResult> {
        let product = self.get_product(asin).await?;
        self.price_check(&product, current).await
    }

    pub async fn check_buy_box_anomaly(
        &self,
        asin: &str,
        current: Option<f64>,
    ) -> Result<AnomalyResult> {
        let product = self.get_product(asin).await?;
        self.buy_box_check(&product, current).await
    }

    pub async fn check_bsr_anomaly(
        &self,
        asin: &str,
        current: Option<u32>,
    ) -> Result<AnomalyResult> {
        let product = self.get_product(asin).await?;
        self.bsr_check(&product, current).await
    }

    pub async fn check_rating_anomaly(
        &self,
        asin: &str,
        current: Option<f64>,
    ) -> Result<AnomalyResult> {
        let product = self.get_product(asin).await?;
        Ok(self.rating_check(&product, current))
    }

    /// All four metric checks in one pass over a single product fetch.
    pub async fn check_all_anomalies(&self, asin: &str) -> Result<AnomalySummary> {
        let product = self.get_product(asin).await?;
        let check_time = Utc::now();

        let price = self.price_check(&product, None).await?;
        let buy_box = self.buy_box_check(&product, None).await?;
        let bsr = self.bsr_check(&product, None).await?;
        let rating = self.rating_check(&product, None);

        let anomaly_count = [&price, &buy_box, &bsr, &rating]
            .iter()
            .filter(|r| r.is_anomaly)
            .count();

        Ok(AnomalySummary {
            asin: asin.to_string(),
            has_anomaly: anomaly_count > 0,
            anomaly_count,
            price,
            buy_box,
            bsr,
            rating,
            check_time,
        })
    }

    /// Sweep every active product. One product's failure is logged and
    /// skipped — the batch always completes. Returns flagged products only.
    pub async fn scan_all_products(&self) -> Vec<AnomalySummary> {
        let asins = match self.repo.active_asins().await {
            Ok(asins) => asins,
            Err(e) => {
                warn!("Anomaly scan could not list products: {e}");
                return Vec::new();
            }
        };

        let mut flagged = Vec::new();
        for asin in &asins {
            match self.check_all_anomalies(asin).await {
                Ok(summary) if summary.has_anomaly => flagged.push(summary),
                Ok(_) => {}
                Err(e) => warn!(asin = %asin, "Anomaly check failed: {e}"),
            }
        }
        flagged
    }

    async fn price_check(
        &self,
        product: &ProductSnapshot,
        current: Option<f64>,
    ) -> Result<AnomalyResult> {
        let now = Utc::now();
        let threshold = self.thresholds.price_pct;
        let Some(current) = current.or(product.price) else {
            return Ok(skipped(Metric::Price, threshold, "no current price available", now));
        };
        let history = self.repo.price_history(&product.asin, Self::window_start(now)).await?;
        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        Ok(evaluate_relative(Metric::Price, current, &values, threshold, now))
    }

    async fn buy_box_check(
        &self,
        product: &ProductSnapshot,
        current: Option<f64>,
    ) -> Result<AnomalyResult> {
        let now = Utc::now();
        let threshold = self.thresholds.buy_box_pct;
        let Some(current) = current.or(product.buy_box_price) else {
            return Ok(skipped(
                Metric::BuyBoxPrice,
                threshold,
                "no current buy box price available",
                now,
            ));
        };
        let history = self.repo.buy_box_history(&product.asin, Self::window_start(now)).await?;
        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        Ok(evaluate_relative(Metric::BuyBoxPrice, current, &values, threshold, now))
    }

    async fn bsr_check(
        &self,
        product: &ProductSnapshot,
        current: Option<u32>,
    ) -> Result<AnomalyResult> {
        let now = Utc::now();
        let threshold = self.thresholds.bsr_pct;
        let Some(current) = current.or(product.rank) else {
            return Ok(skipped(Metric::Bsr, threshold, "no current rank available", now));
        };
        let history = self.repo.rank_history(&product.asin, Self::window_start(now)).await?;
        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        Ok(evaluate_relative(Metric::Bsr, current as f64, &values, threshold, now))
    }

    fn rating_check(&self, product: &ProductSnapshot, current: Option<f64>) -> AnomalyResult {
        let now = Utc::now();
        let threshold = self.thresholds.rating_abs;
        let Some(previous) = product.rating else {
            return skipped(Metric::Rating, threshold, "no current rating available", now);
        };
        let Some(current) = current else {
            return skipped(Metric::Rating, threshold, "no significant rating change", now);
        };
        evaluate_rating(current, previous, threshold, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testutil::{snapshot, FakeRepo};
    use crate::types::HistoryPoint;

    fn history(values: &[f64]) -> Vec<HistoryPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| HistoryPoint {
                value,
                recorded_at: Utc::now() - Duration::days(values.len() as i64 - i as i64),
            })
            .collect()
    }

    #[test]
    fn change_exactly_at_threshold_is_not_flagged() {
        let result =
            evaluate_relative(Metric::Price, 110.0, &[100.0, 100.0], 10.0, Utc::now());
        assert_eq!(result.change_percent, Some(10.0));
        assert!(!result.is_anomaly);
    }

    #[test]
    fn change_just_over_threshold_is_flagged() {
        let result =
            evaluate_relative(Metric::Price, 110.01, &[100.0, 100.0], 10.0, Utc::now());
        assert!(result.is_anomaly);
        assert_eq!(result.direction, Some(AnomalyDirection::Increase));
    }

    #[test]
    fn one_history_point_is_a_skip_with_reason() {
        let result = evaluate_relative(Metric::Price, 50.0, &[100.0], 10.0, Utc::now());
        assert!(!result.is_anomaly);
        assert_eq!(result.reason.as_deref(), Some("insufficient historical data"));
    }

    #[test]
    fn bsr_direction_is_worse_when_rank_rises() {
        let result =
            evaluate_relative(Metric::Bsr, 200.0, &[100.0, 100.0], 30.0, Utc::now());
        assert!(result.is_anomaly);
        assert_eq!(result.direction, Some(AnomalyDirection::Worse));

        let result = evaluate_relative(Metric::Bsr, 60.0, &[100.0, 100.0], 30.0, Utc::now());
        assert_eq!(result.direction, Some(AnomalyDirection::Better));
    }

    #[test]
    fn rating_uses_absolute_change_with_strict_threshold() {
        let result = evaluate_rating(4.0, 4.5, 0.5, Utc::now());
        assert_eq!(result.change, Some(0.5));
        assert!(!result.is_anomaly);

        let result = evaluate_rating(3.9, 4.5, 0.5, Utc::now());
        assert_eq!(result.change, Some(0.6));
        assert!(result.is_anomaly);
        assert_eq!(result.direction, Some(AnomalyDirection::Decrease));
    }

    #[tokio::test]
    async fn missing_product_is_an_explicit_error() {
        let detector = AnomalyDetector::new(Arc::new(FakeRepo::new()));
        let err = detector.check_price_anomaly("B0MISSING0", None).await.unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn missing_current_value_is_a_skip_not_an_error() {
        let repo = FakeRepo::new();
        repo.add_snapshot(snapshot("B000000001", None, None, 0, None));
        let detector = AnomalyDetector::new(Arc::new(repo));

        let result = detector.check_price_anomaly("B000000001", None).await.unwrap();
        assert!(!result.is_anomaly);
        assert_eq!(result.reason.as_deref(), Some("no current price available"));
    }

    #[tokio::test]
    async fn buy_box_uses_its_own_threshold() {
        let repo = FakeRepo::new();
        let mut snap = snapshot("B000000001", Some(100.0), None, 0, None);
        snap.buy_box_price = Some(114.0);
        repo.add_snapshot(snap);
        repo.set_buy_box_history("B000000001", history(&[100.0, 100.0]));
        let detector = AnomalyDetector::new(Arc::new(repo));

        // 14% exceeds the 10% price threshold but not the 15% buy-box one.
        let result = detector.check_buy_box_anomaly("B000000001", None).await.unwrap();
        assert!(!result.is_anomaly);

        let result =
            detector.check_buy_box_anomaly("B000000001", Some(116.0)).await.unwrap();
        assert!(result.is_anomaly);
        assert_eq!(result.direction, Some(AnomalyDirection::Increase));
    }

    #[tokio::test]
    async fn check_all_counts_flagged_metrics() {
        let repo = FakeRepo::new();
        repo.add_snapshot(snapshot("B000000001", Some(150.0), Some(4.5), 100, Some(400)));
        repo.set_price_history("B000000001", history(&[100.0, 100.0, 100.0]));
        repo.set_rank_history("B000000001", history(&[100.0, 100.0]));
        let detector = AnomalyDetector::new(Arc::new(repo));

        let summary = detector.check_all_anomalies("B000000001").await.unwrap();
        // Price +50% and rank 4× both flag; buy box and rating skip.
        assert!(summary.has_anomaly);
        assert_eq!(summary.anomaly_count, 2);
        assert!(summary.price.is_anomaly);
        assert!(summary.bsr.is_anomaly);
        assert!(!summary.buy_box.is_anomaly);
        assert!(!summary.rating.is_anomaly);
    }

    #[tokio::test]
    async fn scan_skips_failing_products_and_returns_flagged() {
        let repo = FakeRepo::new();
        repo.add_snapshot(snapshot("B000000001", Some(150.0), None, 0, None));
        repo.set_price_history("B000000001", history(&[100.0, 100.0]));
        repo.add_snapshot(snapshot("B000000002", Some(100.0), None, 0, None));
        repo.set_price_history("B000000002", history(&[100.0, 100.0]));
        let detector = AnomalyDetector::new(Arc::new(repo));

        let flagged = detector.scan_all_products().await;
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].asin, "B000000001");
    }

    #[tokio::test]
    async fn custom_thresholds_are_respected() {
        let repo = FakeRepo::new();
        repo.add_snapshot(snapshot("B000000001", Some(105.0), None, 0, None));
        repo.set_price_history("B000000001", history(&[100.0, 100.0]));
        let thresholds = AnomalyThresholds { price_pct: 2.0, ..AnomalyThresholds::default() };
        let detector = AnomalyDetector::with_thresholds(Arc::new(repo), thresholds);

        let result = detector.check_price_anomaly("B000000001", None).await.unwrap();
        assert!(result.is_anomaly);
    }
}
