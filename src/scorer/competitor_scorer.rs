//! Competitor scoring: a competitive-strength score and a similarity score,
//! both 0–100, computed for one competitor against one main product.
//! Missing inputs on either side skip that component — absent data never
//! penalizes, it just fails to earn points.

use std::collections::HashSet;

use crate::config::{CompetitiveWeights, SimilarityWeights};
use crate::types::StandardizedCompetitorData;

/// How strongly the competitor out-performs the main product.
///
/// Weighted components (defaults 30/25/20/25):
/// - price: cheaper competitors earn up to the full weight; modestly more
///   expensive ones earn partial credit, much more expensive ones zero.
/// - rating: only a competitor rating above the main's earns points.
/// - reviews: review-count ratio, saturating at 2×.
/// - rank: only a numerically better (lower) rank earns points.
pub fn competitive_score(
    main: &StandardizedCompetitorData,
    competitor: &StandardizedCompetitorData,
    weights: &CompetitiveWeights,
) -> f64 {
    let mut score = 0.0;

    if let (Some(main_price), Some(comp_price)) = (main.price, competitor.price) {
        if main_price > 0.0 {
            let price_ratio = comp_price / main_price;
            if price_ratio < 1.0 {
                score += weights.price * (1.0 - price_ratio);
            } else {
                score += weights.price * (1.0 - (price_ratio - 1.0) * 0.5).max(0.0);
            }
        }
    }

    if let (Some(main_rating), Some(comp_rating)) = (main.rating, competitor.rating) {
        if comp_rating > main_rating {
            score += weights.rating * (comp_rating - main_rating) / 5.0;
        }
    }

    if main.review_count > 0 && competitor.review_count > 0 {
        let review_ratio = competitor.review_count as f64 / main.review_count.max(1) as f64;
        score += weights.reviews * review_ratio.min(2.0) / 2.0;
    }

    if let (Some(main_rank), Some(comp_rank)) = (main.rank, competitor.rank) {
        if comp_rank < main_rank {
            let rank_improvement = (main_rank - comp_rank) as f64 / main_rank as f64;
            score += weights.rank * rank_improvement.min(1.0);
        }
    }

    score.min(100.0)
}

/// How comparable the competitor is to the main product — used for relevance
/// filtering, not strength ranking.
///
/// Weighted components (defaults 20/30/30/20): brand match (exact or
/// substring), category match, title word-set Jaccard, price proximity
/// (within 10% / 30%).
pub fn similarity_score(
    main: &StandardizedCompetitorData,
    competitor: &StandardizedCompetitorData,
    weights: &SimilarityWeights,
) -> f64 {
    let mut score = 0.0;

    if let (Some(main_brand), Some(comp_brand)) = (&main.brand, &competitor.brand) {
        let a = main_brand.to_lowercase();
        let b = comp_brand.to_lowercase();
        if a == b {
            score += weights.brand;
        } else if a.contains(&b) || b.contains(&a) {
            score += weights.brand / 2.0;
        }
    }

    if let (Some(main_cat), Some(comp_cat)) = (&main.category, &competitor.category) {
        let a = main_cat.to_lowercase();
        let b = comp_cat.to_lowercase();
        if a == b {
            score += weights.category;
        } else if a.contains(&b) || b.contains(&a) {
            score += weights.category / 2.0;
        }
    }

    score += weights.title * jaccard_similarity(&main.title, &competitor.title);

    if let (Some(main_price), Some(comp_price)) = (main.price, competitor.price) {
        if main_price > 0.0 {
            let diff = (main_price - comp_price).abs() / main_price;
            if diff < 0.1 {
                score += weights.price;
            } else if diff < 0.3 {
                score += weights.price / 2.0;
            }
        }
    }

    score.min(100.0)
}

/// Jaccard similarity of the lowercase whitespace-token sets of two strings.
/// 0.0 when either set is empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let a_lower: HashSet<String> = set_a.iter().map(|w| w.to_lowercase()).collect();
    let b_lower: HashSet<String> = set_b.iter().map(|w| w.to_lowercase()).collect();
    let intersection = a_lower.intersection(&b_lower).count();
    let union = a_lower.union(&b_lower).count();
    intersection as f64 / union as f64
}

/// Buyer-confidence proxy: rating amplified by review volume, saturating at
/// 1000 reviews doubling the base twice over.
pub fn trust_score(rating: f64, review_count: u32) -> f64 {
    rating * (1.0 + (review_count as f64 / 1000.0).min(2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::types::Marketplace;

    fn product(
        price: Option<f64>,
        rating: Option<f64>,
        review_count: u32,
        rank: Option<u32>,
    ) -> StandardizedCompetitorData {
        StandardizedCompetitorData {
            asin: "B000000000".to_string(),
            title: "Stainless Steel Chef Knife".to_string(),
            brand: Some("Acme".to_string()),
            price,
            list_price: None,
            rating,
            review_count,
            rank,
            category: Some("Kitchen".to_string()),
            image_url: None,
            product_url: "https://amazon.com/dp/B000000000".to_string(),
            availability: None,
            bullet_points: vec![],
            description: None,
            marketplace: Marketplace::AmazonUs,
            seller_info: json!({}),
            variations: json!([]),
            crawled_at: Utc::now(),
            source_data: json!({}),
        }
    }

    #[test]
    fn worked_example_totals_38_5() {
        // main: $100, 4.0 stars, rank 50, 500 reviews
        // competitor: $80, 4.5 stars, rank 30, 1000 reviews
        let main = product(Some(100.0), Some(4.0), 500, Some(50));
        let comp = product(Some(80.0), Some(4.5), 1000, Some(30));
        let score = competitive_score(&main, &comp, &CompetitiveWeights::default());
        // price 30×0.2=6, rating 25×0.1=2.5, reviews 20×min(2,2)/2=20, rank 25×0.4=10
        assert!((score - 38.5).abs() < 1e-9, "score={score}");
    }

    #[test]
    fn much_more_expensive_competitor_earns_no_price_points() {
        let main = product(Some(100.0), None, 0, None);
        let comp = product(Some(400.0), None, 0, None);
        let score = competitive_score(&main, &comp, &CompetitiveWeights::default());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn modestly_more_expensive_competitor_earns_partial_credit() {
        let main = product(Some(100.0), None, 0, None);
        let comp = product(Some(120.0), None, 0, None);
        let score = competitive_score(&main, &comp, &CompetitiveWeights::default());
        // 30 × (1 − 0.2 × 0.5) = 27
        assert!((score - 27.0).abs() < 1e-9, "score={score}");
    }

    #[test]
    fn missing_fields_skip_components() {
        let main = product(None, None, 0, None);
        let comp = product(Some(10.0), Some(5.0), 9999, Some(1));
        let score = competitive_score(&main, &comp, &CompetitiveWeights::default());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn scores_stay_within_bounds() {
        let main = product(Some(1000.0), Some(1.0), 1, Some(100_000));
        let comp = product(Some(1.0), Some(5.0), 1_000_000, Some(1));
        let score = competitive_score(&main, &comp, &CompetitiveWeights::default());
        assert!((0.0..=100.0).contains(&score), "score={score}");

        let sim = similarity_score(&main, &comp, &SimilarityWeights::default());
        assert!((0.0..=100.0).contains(&sim), "sim={sim}");
    }

    #[test]
    fn jaccard_identical_and_disjoint() {
        assert_eq!(jaccard_similarity("chef knife set", "chef knife set"), 1.0);
        assert_eq!(jaccard_similarity("Chef Knife", "chef knife"), 1.0);
        assert_eq!(jaccard_similarity("chef knife", "garden hose"), 0.0);
        assert_eq!(jaccard_similarity("", "anything"), 0.0);
    }

    #[test]
    fn similarity_rewards_matching_brand_and_category() {
        let mut main = product(Some(100.0), None, 0, None);
        main.title = "Acme Chef Knife 8 Inch".to_string();
        let mut comp = product(Some(105.0), None, 0, None);
        comp.title = "Acme Chef Knife 10 Inch".to_string();

        let sim = similarity_score(&main, &comp, &SimilarityWeights::default());
        // brand 20 + category 30 + title 30×(4/6)=20 + price(5% diff) 20 = 90
        assert!((sim - 90.0).abs() < 1e-9, "sim={sim}");
    }

    #[test]
    fn similarity_substring_brand_scores_half() {
        let mut main = product(None, None, 0, None);
        main.brand = Some("Acme".to_string());
        main.category = None;
        main.title = "x".to_string();
        let mut comp = product(None, None, 0, None);
        comp.brand = Some("Acme Industries".to_string());
        comp.category = None;
        comp.title = "y".to_string();

        let sim = similarity_score(&main, &comp, &SimilarityWeights::default());
        assert!((sim - 10.0).abs() < 1e-9, "sim={sim}");
    }

    #[test]
    fn trust_score_saturates_at_two_thousand_reviews() {
        assert!((trust_score(4.0, 0) - 4.0).abs() < 1e-9);
        assert!((trust_score(4.0, 1000) - 8.0).abs() < 1e-9);
        assert!((trust_score(4.0, 5000) - 12.0).abs() < 1e-9);
    }
}
