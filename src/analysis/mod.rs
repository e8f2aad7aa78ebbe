pub mod analyzer;
pub mod insights;
pub mod recommend;

pub use analyzer::{AnalysisScheduler, CompetitorAnalyzer};
pub use insights::{generate_insights, market_position};
pub use recommend::generate_recommendations;
