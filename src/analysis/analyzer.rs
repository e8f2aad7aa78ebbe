//! Orchestrates one analysis run: standardize → consolidate → score → sort →
//! insights → recommendations → market position. A bad competitor record is
//! dropped and counted, never fatal to the run.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::analysis::insights::{generate_insights, market_position};
use crate::analysis::recommend::generate_recommendations;
use crate::cache::ResultCache;
use crate::config::{CompetitiveWeights, SimilarityWeights, TRENDS_CACHE_TTL_SECS, TREND_WINDOW_DAYS};
use crate::db::ProductRepository;
use crate::dedup::consolidate_listings;
use crate::error::{AppError, Result};
use crate::normalizer::record::{standardize_batch, StandardizeStats};
use crate::scorer::{competitive_score, similarity_score};
use crate::trends::TrendAnalyzer;
use crate::types::{
    AnalysisType, CompetitorAnalysis, CompetitorProduct, EngineEvent, RawRecord,
    StandardizedCompetitorData, TrendsInsight,
};

pub struct CompetitorAnalyzer {
    repo: Arc<dyn ProductRepository>,
    trends: TrendAnalyzer,
    cache: Arc<ResultCache>,
    weights: CompetitiveWeights,
    similarity_weights: SimilarityWeights,
}

impl CompetitorAnalyzer {
    pub fn new(repo: Arc<dyn ProductRepository>, cache: Arc<ResultCache>) -> Self {
        Self {
            trends: TrendAnalyzer::new(Arc::clone(&repo)),
            repo,
            cache,
            weights: CompetitiveWeights::default(),
            similarity_weights: SimilarityWeights::default(),
        }
    }

    pub fn with_weights(
        mut self,
        weights: CompetitiveWeights,
        similarity_weights: SimilarityWeights,
    ) -> Self {
        self.weights = weights;
        self.similarity_weights = similarity_weights;
        self
    }

    /// Analyze a main product against its stored competitor snapshots.
    pub async fn analyze_stored(
        &self,
        main_asin: &str,
        analysis_type: AnalysisType,
    ) -> Result<CompetitorAnalysis> {
        let main = self
            .repo
            .get_product(main_asin)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(main_asin.to_string()))?;

        let competitor_asins = self.repo.competitor_asins(main_asin).await?;
        let mut listings = Vec::with_capacity(competitor_asins.len());
        for asin in &competitor_asins {
            match self.repo.get_product(asin).await {
                Ok(Some(snapshot)) => listings.push(snapshot.to_listing()),
                Ok(None) => warn!(asin = %asin, "competitor not tracked, skipping"),
                Err(e) => warn!(asin = %asin, "competitor load failed, skipping: {e}"),
            }
        }

        self.build(main.to_listing().into(), listings, analysis_type).await
    }

    /// Analyze a main product against raw scrape output: records are
    /// standardized (drops counted), consolidated per ASIN, then scored.
    pub async fn analyze_records(
        &self,
        main: StandardizedCompetitorData,
        raw_records: &[RawRecord],
        analysis_type: AnalysisType,
    ) -> Result<(CompetitorAnalysis, StandardizeStats)> {
        let (standardized, stats) = standardize_batch(raw_records, Utc::now());
        if stats.dropped() > 0 {
            warn!(
                dropped = stats.dropped(),
                processed = stats.processed,
                "standardization dropped invalid records"
            );
        }
        let listings = consolidate_listings(standardized);
        let analysis = self.build(main.into(), listings, analysis_type).await?;
        Ok((analysis, stats))
    }

    async fn build(
        &self,
        main: CompetitorProduct,
        listings: Vec<StandardizedCompetitorData>,
        analysis_type: AnalysisType,
    ) -> Result<CompetitorAnalysis> {
        let mut competitors: Vec<CompetitorProduct> = listings
            .into_iter()
            .map(|listing| {
                let mut competitor = CompetitorProduct::from(listing);
                competitor.competitive_score =
                    competitive_score(&main.listing, &competitor.listing, &self.weights);
                competitor.similarity_score =
                    similarity_score(&main.listing, &competitor.listing, &self.similarity_weights);
                competitor
            })
            .collect();
        competitors.sort_by(|a, b| {
            b.competitive_score
                .partial_cmp(&a.competitive_score)
                .unwrap_or(Ordering::Equal)
        });

        let trends = self.cached_trend_changes(&main.listing.asin).await;
        let insights = generate_insights(&main, &competitors, analysis_type, trends);
        let recommendations = generate_recommendations(&insights);
        let position = market_position(&main, &competitors);

        let now = Utc::now();
        Ok(CompetitorAnalysis {
            analysis_id: format!("analysis_{}", now.timestamp_millis()),
            main_product: main,
            competitors,
            insights,
            recommendations,
            market_position: position,
            analysis_type,
            created_at: now,
        })
    }

    /// Cache-aside around the 30-day trend lookup: key from the call's
    /// identity and arguments, TTL from config. A failed lookup degrades to
    /// "no trend insight" rather than failing the analysis.
    async fn cached_trend_changes(&self, asin: &str) -> Option<TrendsInsight> {
        let window = TREND_WINDOW_DAYS.to_string();
        let key = ResultCache::key("trend_changes", &[asin, &window]);
        if let Some(hit) = self.cache.get::<TrendsInsight>(&key) {
            return Some(hit);
        }
        match self.trends.trend_changes(asin, TREND_WINDOW_DAYS).await {
            Ok(changes) => {
                self.cache.insert(&key, &changes, Duration::from_secs(TRENDS_CACHE_TTL_SECS));
                Some(changes)
            }
            Err(e) => {
                warn!(asin = %asin, "trend lookup failed: {e}");
                None
            }
        }
    }
}

/// Background task that re-analyzes every main product on an interval and
/// routes results to the DB writer.
pub struct AnalysisScheduler {
    analyzer: CompetitorAnalyzer,
    repo: Arc<dyn ProductRepository>,
    event_tx: mpsc::Sender<EngineEvent>,
    interval_secs: u64,
}

impl AnalysisScheduler {
    pub fn new(
        analyzer: CompetitorAnalyzer,
        repo: Arc<dyn ProductRepository>,
        event_tx: mpsc::Sender<EngineEvent>,
        interval_secs: u64,
    ) -> Self {
        Self { analyzer, repo, event_tx, interval_secs }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        interval.tick().await; // consume immediate first tick

        loop {
            interval.tick().await;
            if let Err(e) = self.analyze_all().await {
                error!("Analysis cycle failed: {e}");
            }
        }
    }

    async fn analyze_all(&self) -> Result<()> {
        let main_asins = self.repo.main_asins().await?;
        let mut completed = 0usize;

        for asin in &main_asins {
            match self.analyzer.analyze_stored(asin, AnalysisType::Comprehensive).await {
                Ok(analysis) => {
                    completed += 1;
                    info!(
                        asin = %asin,
                        competitors = analysis.competitors.len(),
                        position = %analysis.market_position,
                        "ANALYSIS | {} | {} competitors | position: {}",
                        asin, analysis.competitors.len(), analysis.market_position,
                    );
                    if let Err(e) =
                        self.event_tx.try_send(EngineEvent::AnalysisCompleted(analysis))
                    {
                        warn!("event channel full, dropping analysis: {e}");
                    }
                }
                Err(e) => warn!(asin = %asin, "analysis failed, continuing: {e}"),
            }
        }

        info!(
            analyzed = completed,
            total = main_asins.len(),
            "Analysis cycle complete: {completed}/{} products",
            main_asins.len(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testutil::{snapshot, FakeRepo};
    use crate::types::MarketPosition;

    fn analyzer_with(repo: FakeRepo) -> CompetitorAnalyzer {
        CompetitorAnalyzer::new(Arc::new(repo), ResultCache::new())
    }

    #[tokio::test]
    async fn stored_analysis_scores_and_sorts_competitors() {
        let repo = FakeRepo::new();
        repo.add_snapshot(snapshot("B000000001", Some(100.0), Some(4.0), 500, Some(50)));
        repo.add_snapshot(snapshot("B000000002", Some(80.0), Some(4.5), 1000, Some(30)));
        repo.add_snapshot(snapshot("B000000003", Some(200.0), Some(3.0), 10, Some(900)));
        repo.set_links("B000000001", &["B000000002", "B000000003"]);

        let analysis = analyzer_with(repo)
            .analyze_stored("B000000001", AnalysisType::Comprehensive)
            .await
            .unwrap();

        assert_eq!(analysis.competitors.len(), 2);
        // The strong competitor from the worked scoring example leads.
        assert_eq!(analysis.competitors[0].listing.asin, "B000000002");
        assert!((analysis.competitors[0].competitive_score - 38.5).abs() < 1e-9);
        assert!(
            analysis.competitors[0].competitive_score
                >= analysis.competitors[1].competitive_score
        );
        assert!(analysis.insights.pricing.is_some());
        assert!(!analysis.recommendations.is_empty());
        assert!(analysis.analysis_id.starts_with("analysis_"));
    }

    #[tokio::test]
    async fn missing_competitors_are_skipped_not_fatal() {
        let repo = FakeRepo::new();
        repo.add_snapshot(snapshot("B000000001", Some(100.0), Some(4.0), 500, Some(50)));
        repo.set_links("B000000001", &["B000000002", "B0GONE0000"]);
        repo.add_snapshot(snapshot("B000000002", Some(90.0), Some(4.2), 100, Some(40)));

        let analysis = analyzer_with(repo)
            .analyze_stored("B000000001", AnalysisType::Comprehensive)
            .await
            .unwrap();
        assert_eq!(analysis.competitors.len(), 1);
    }

    #[tokio::test]
    async fn missing_main_product_is_an_error() {
        let err = analyzer_with(FakeRepo::new())
            .analyze_stored("B0MISSING0", AnalysisType::Comprehensive)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn raw_records_are_standardized_consolidated_and_counted() {
        let repo = FakeRepo::new();
        repo.add_snapshot(snapshot("B000000001", Some(100.0), Some(4.0), 500, Some(50)));
        let analyzer = analyzer_with(repo);

        let main = snapshot("B000000001", Some(100.0), Some(4.0), 500, Some(50)).to_listing();
        let raws = vec![
            json!({"asin": "B000000002", "title": "Rival", "price": 50.0}),
            json!({"asin": "B000000002", "title": "Rival cheaper seller", "price": 40.0}),
            json!({"asin": "B000000003", "title": "Other", "price": 60.0}),
            json!({"asin": "", "title": "Broken"}),
            json!({"asin": "B000000004", "title": ""}),
        ];

        let (analysis, stats) = analyzer
            .analyze_records(main, &raws, AnalysisType::Comprehensive)
            .await
            .unwrap();

        assert_eq!(stats.processed, 5);
        assert_eq!(stats.standardized, 3);
        assert_eq!(stats.dropped(), 2);
        // Two sellers of B000000002 consolidated into one competitor.
        assert_eq!(analysis.competitors.len(), 2);
        let rival = analysis
            .competitors
            .iter()
            .find(|c| c.listing.asin == "B000000002")
            .expect("consolidated rival");
        assert_eq!(rival.listing.price, Some(40.0));
        assert_eq!(rival.listing.seller_info["seller_count"], json!(2));
    }

    #[tokio::test]
    async fn no_competitors_still_produces_an_analysis() {
        let repo = FakeRepo::new();
        repo.add_snapshot(snapshot("B000000001", Some(100.0), Some(4.0), 500, Some(50)));

        let analysis = analyzer_with(repo)
            .analyze_stored("B000000001", AnalysisType::Comprehensive)
            .await
            .unwrap();
        assert_eq!(analysis.market_position, MarketPosition::Unknown);
        assert_eq!(analysis.insights.competitor_count, 0);
        assert_eq!(analysis.recommendations.len(), 1);
    }
}
