use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw per-item record as delivered by the scrape service. Arbitrary shape;
/// every field goes through the normalizer before use.
pub type RawRecord = Value;

// ---------------------------------------------------------------------------
// Marketplace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    AmazonUs,
    AmazonUk,
    AmazonDe,
    AmazonFr,
    AmazonJp,
    AmazonCa,
    AmazonAu,
    AmazonIn,
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Marketplace::AmazonUs => "amazon_us",
            Marketplace::AmazonUk => "amazon_uk",
            Marketplace::AmazonDe => "amazon_de",
            Marketplace::AmazonFr => "amazon_fr",
            Marketplace::AmazonJp => "amazon_jp",
            Marketplace::AmazonCa => "amazon_ca",
            Marketplace::AmazonAu => "amazon_au",
            Marketplace::AmazonIn => "amazon_in",
        };
        write!(f, "{s}")
    }
}

impl Marketplace {
    pub fn parse(s: &str) -> Self {
        match s {
            "amazon_uk" => Marketplace::AmazonUk,
            "amazon_de" => Marketplace::AmazonDe,
            "amazon_fr" => Marketplace::AmazonFr,
            "amazon_jp" => Marketplace::AmazonJp,
            "amazon_ca" => Marketplace::AmazonCa,
            "amazon_au" => Marketplace::AmazonAu,
            "amazon_in" => Marketplace::AmazonIn,
            _ => Marketplace::AmazonUs,
        }
    }
}

// ---------------------------------------------------------------------------
// Standardized listing data
// ---------------------------------------------------------------------------

/// Canonical per-listing record after normalization. Invariant: `asin` is a
/// valid 10-char identifier and `title` is non-empty — records failing either
/// are dropped during standardization, never passed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardizedCompetitorData {
    pub asin: String,
    pub title: String,
    pub brand: Option<String>,
    pub price: Option<f64>,
    pub list_price: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub rank: Option<u32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub product_url: String,
    pub availability: Option<String>,
    pub bullet_points: Vec<String>,
    pub description: Option<String>,
    pub marketplace: Marketplace,
    /// Seller details as delivered; consolidation adds multi-seller keys.
    pub seller_info: Value,
    pub variations: Value,
    pub crawled_at: DateTime<Utc>,
    /// Opaque pass-through of the raw record.
    pub source_data: Value,
}

/// A standardized listing plus the two scores derived against one main
/// product. Built fresh per analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorProduct {
    #[serde(flatten)]
    pub listing: StandardizedCompetitorData,
    pub competitive_score: f64,
    pub similarity_score: f64,
}

impl From<StandardizedCompetitorData> for CompetitorProduct {
    fn from(listing: StandardizedCompetitorData) -> Self {
        Self { listing, competitive_score: 0.0, similarity_score: 0.0 }
    }
}

// ---------------------------------------------------------------------------
// Analysis aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Pricing,
    Features,
    Comprehensive,
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalysisType::Pricing => "pricing",
            AnalysisType::Features => "features",
            AnalysisType::Comprehensive => "comprehensive",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPosition {
    PremiumLeader,
    ValueLeader,
    MarketLeader,
    BudgetOption,
    PremiumOption,
    Follower,
    Unknown,
}

impl std::fmt::Display for MarketPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketPosition::PremiumLeader => "premium_leader",
            MarketPosition::ValueLeader => "value_leader",
            MarketPosition::MarketLeader => "market_leader",
            MarketPosition::BudgetOption => "budget_option",
            MarketPosition::PremiumOption => "premium_option",
            MarketPosition::Follower => "follower",
            MarketPosition::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Result of one analysis run. Immutable once constructed — a new run
/// produces a new value rather than mutating an old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    pub analysis_id: String,
    pub main_product: CompetitorProduct,
    /// Sorted descending by competitive_score.
    pub competitors: Vec<CompetitorProduct>,
    pub insights: AnalysisInsights,
    pub recommendations: Vec<String>,
    pub market_position: MarketPosition,
    pub analysis_type: AnalysisType,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Insights — one optional field per insight kind, so "insufficient data"
// branches are visible in the type rather than buried in an open map.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisInsights {
    pub pricing: Option<PricingInsight>,
    pub rating: Option<RatingInsight>,
    pub ranking: Option<RankingInsight>,
    pub features: Option<FeatureInsight>,
    pub market_share: Option<MarketShareInsight>,
    pub trends: Option<TrendsInsight>,
    pub quadrant: Option<QuadrantInsight>,
    pub gaps: Vec<CompetitiveGap>,
    pub competitor_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePosition {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingInsight {
    pub avg_competitor_price: f64,
    pub min_competitor_price: f64,
    pub max_competitor_price: f64,
    pub main_product_price: f64,
    pub price_position: PricePosition,
    /// True when the main product undercuts the competitor average.
    pub price_advantage: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingInsight {
    pub avg_competitor_rating: f64,
    pub main_product_rating: f64,
    pub rating_advantage: bool,
    /// Percent of competitors the main product out-rates.
    pub rating_percentile: f64,
    pub trust_score: f64,
    pub avg_competitor_trust: f64,
    pub trust_advantage: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingInsight {
    pub avg_competitor_rank: f64,
    pub main_product_rank: u32,
    pub rank_advantage: bool,
    /// Percent of competitors ranked worse (numerically higher).
    pub rank_percentile: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInsight {
    pub unique_features: Vec<String>,
    pub missing_features: Vec<String>,
    pub common_features: Vec<String>,
    /// Shared fraction of the competitor feature union.
    pub feature_coverage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketShareInsight {
    /// Review-volume share, percent.
    pub estimated_share: f64,
    pub review_count: u32,
    pub total_market_reviews: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Up,
    Down,
    Improved,
    Declined,
    Stable,
}

impl std::fmt::Display for ChangeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeDirection::Up => "up",
            ChangeDirection::Down => "down",
            ChangeDirection::Improved => "improved",
            ChangeDirection::Declined => "declined",
            ChangeDirection::Stable => "stable",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendChange {
    pub change_percent: f64,
    pub direction: ChangeDirection,
    pub data_points: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendsInsight {
    pub price_trend: Option<TrendChange>,
    pub rank_trend: Option<TrendChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketQuadrant {
    Premium,
    ValueLeader,
    Overpriced,
    Budget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadrantInsight {
    pub quadrant: MarketQuadrant,
    pub price_median: f64,
    pub quality_median: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    Price,
    Rating,
    ReviewVolume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitiveGap {
    pub kind: GapKind,
    pub severity: GapSeverity,
    pub description: String,
    pub action: String,
}

// ---------------------------------------------------------------------------
// Anomaly detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Price,
    BuyBoxPrice,
    Bsr,
    Rating,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Metric::Price => "price",
            Metric::BuyBoxPrice => "buy_box_price",
            Metric::Bsr => "bsr",
            Metric::Rating => "rating",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyDirection {
    Increase,
    Decrease,
    /// Rank moved numerically lower.
    Better,
    /// Rank moved numerically higher.
    Worse,
}

/// Outcome of one metric check. `is_anomaly=false` with a `reason` means the
/// check was skipped for lack of data, which is a result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub metric: Metric,
    pub is_anomaly: bool,
    pub current_value: Option<f64>,
    pub average_value: Option<f64>,
    /// Relative change for price/buy-box/BSR checks.
    pub change_percent: Option<f64>,
    /// Absolute change for the rating check.
    pub change: Option<f64>,
    pub threshold: f64,
    pub direction: Option<AnomalyDirection>,
    pub historical_data_points: usize,
    pub reason: Option<String>,
    pub check_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub asin: String,
    pub has_anomaly: bool,
    pub anomaly_count: usize,
    pub price: AnomalyResult,
    pub buy_box: AnomalyResult,
    pub bsr: AnomalyResult,
    pub rating: AnomalyResult,
    pub check_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Trends & forecasting
// ---------------------------------------------------------------------------

/// One record from a history table: the minimal shape the storage
/// collaborator guarantees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendDataPoint {
    pub date: NaiveDate,
    pub value: f64,
    /// Relative to the previous day's mean; None for the first point.
    pub change_percent: Option<f64>,
    /// Count of underlying samples that day.
    pub volume: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    Price,
    Rank,
}

impl std::fmt::Display for TrendMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendMetric::Price => write!(f, "price"),
            TrendMetric::Rank => write!(f, "rank"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketForecast {
    pub metric: TrendMetric,
    pub current_value: f64,
    pub predicted_value: f64,
    pub prediction_date: DateTime<Utc>,
    /// Clamped to [0.3, 0.9].
    pub confidence: f64,
    pub trend_direction: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendInsightKind {
    PriceTrend,
    PriceVolatility,
    RankTrend,
    RatingHigh,
    RatingLow,
    ReviewVolumeHigh,
    ReviewVolumeLow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendInsight {
    pub kind: TrendInsightKind,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub direction: Option<ChangeDirection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketHealth {
    Growing,
    Stable,
    Challenging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub market_health: MarketHealth,
    pub key_trends: Vec<String>,
    pub opportunities: Vec<String>,
    pub risks: Vec<String>,
    pub overall_score: i32,
}

/// Full output of a trend analysis over one product's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub asin: String,
    pub period_days: i64,
    pub price: Vec<TrendDataPoint>,
    pub rank: Vec<TrendDataPoint>,
    pub insights: Vec<TrendInsight>,
    pub forecasts: Vec<MarketForecast>,
    pub summary: MarketSummary,
    pub generated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Product snapshot — current values as read from storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub asin: String,
    pub title: String,
    pub brand: Option<String>,
    pub price: Option<f64>,
    pub buy_box_price: Option<f64>,
    pub list_price: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub rank: Option<u32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub product_url: String,
    pub availability: Option<String>,
    pub bullet_points: Vec<String>,
    pub description: Option<String>,
    pub marketplace: Marketplace,
    pub is_main: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProductSnapshot {
    /// View the snapshot as a standardized listing so the scoring and insight
    /// code sees one shape regardless of whether data came from a fresh
    /// scrape or from storage.
    pub fn to_listing(&self) -> StandardizedCompetitorData {
        StandardizedCompetitorData {
            asin: self.asin.clone(),
            title: self.title.clone(),
            brand: self.brand.clone(),
            price: self.price,
            list_price: self.list_price,
            rating: self.rating,
            review_count: self.review_count,
            rank: self.rank,
            category: self.category.clone(),
            image_url: self.image_url.clone(),
            product_url: self.product_url.clone(),
            availability: self.availability.clone(),
            bullet_points: self.bullet_points.clone(),
            description: self.description.clone(),
            marketplace: self.marketplace,
            seller_info: Value::Null,
            variations: Value::Null,
            crawled_at: self.updated_at,
            source_data: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Channel message types
// ---------------------------------------------------------------------------

/// Routed from the background tasks to the DB writer.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    AnomalyFlagged(AnomalySummary),
    AnalysisCompleted(CompetitorAnalysis),
}
