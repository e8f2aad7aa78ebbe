pub mod competitor_scorer;

pub use competitor_scorer::{competitive_score, jaccard_similarity, similarity_score, trust_score};
