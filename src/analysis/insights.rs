//! Rolls scored competitors up into the per-kind insight fields and the
//! market-position label. Every insight needs both sides of its comparison —
//! absent data leaves the field None rather than producing zeros.

use std::collections::HashSet;

use crate::config::{price_position, price_tiers};
use crate::scorer::trust_score;
use crate::types::{
    AnalysisInsights, AnalysisType, CompetitiveGap, CompetitorProduct, FeatureInsight, GapKind,
    GapSeverity, MarketPosition, MarketQuadrant, MarketShareInsight, PricePosition,
    PricingInsight, QuadrantInsight, RankingInsight, RatingInsight, TrendsInsight,
};

pub fn generate_insights(
    main: &CompetitorProduct,
    competitors: &[CompetitorProduct],
    analysis_type: AnalysisType,
    trends: Option<TrendsInsight>,
) -> AnalysisInsights {
    let mut insights = AnalysisInsights {
        competitor_count: competitors.len(),
        trends,
        ..Default::default()
    };
    if competitors.is_empty() {
        return insights;
    }

    insights.pricing = pricing_insight(main, competitors);
    insights.rating = rating_insight(main, competitors);
    insights.ranking = ranking_insight(main, competitors);
    if matches!(analysis_type, AnalysisType::Features | AnalysisType::Comprehensive) {
        insights.features = Some(feature_insight(main, competitors));
    }
    insights.market_share = market_share_insight(main, competitors);
    insights.quadrant = quadrant_insight(main, competitors);
    insights.gaps = competitive_gaps(main, competitors);

    insights
}

fn competitor_prices(competitors: &[CompetitorProduct]) -> Vec<f64> {
    competitors.iter().filter_map(|c| c.listing.price).collect()
}

fn competitor_ratings(competitors: &[CompetitorProduct]) -> Vec<f64> {
    competitors.iter().filter_map(|c| c.listing.rating).collect()
}

fn pricing_insight(
    main: &CompetitorProduct,
    competitors: &[CompetitorProduct],
) -> Option<PricingInsight> {
    let prices = competitor_prices(competitors);
    let main_price = main.listing.price?;
    if prices.is_empty() {
        return None;
    }

    let avg = mean(&prices);
    let below = prices.iter().filter(|p| **p < main_price).count() as f64 / prices.len() as f64;
    let position = if below < price_position::LOW_MAX {
        PricePosition::Low
    } else if below < price_position::HIGH_MIN {
        PricePosition::Medium
    } else {
        PricePosition::High
    };

    Some(PricingInsight {
        avg_competitor_price: avg,
        min_competitor_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
        max_competitor_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        main_product_price: main_price,
        price_position: position,
        price_advantage: main_price < avg,
    })
}

fn rating_insight(
    main: &CompetitorProduct,
    competitors: &[CompetitorProduct],
) -> Option<RatingInsight> {
    let ratings = competitor_ratings(competitors);
    let main_rating = main.listing.rating?;
    if ratings.is_empty() {
        return None;
    }

    let avg = mean(&ratings);
    let percentile = percent_better(main_rating, &ratings, false);

    let main_trust = trust_score(main_rating, main.listing.review_count);
    let competitor_trusts: Vec<f64> = competitors
        .iter()
        .filter_map(|c| c.listing.rating.map(|r| trust_score(r, c.listing.review_count)))
        .collect();
    let avg_trust = mean(&competitor_trusts);

    Some(RatingInsight {
        avg_competitor_rating: avg,
        main_product_rating: main_rating,
        rating_advantage: main_rating > avg,
        rating_percentile: percentile,
        trust_score: main_trust,
        avg_competitor_trust: avg_trust,
        trust_advantage: main_trust > avg_trust,
    })
}

fn ranking_insight(
    main: &CompetitorProduct,
    competitors: &[CompetitorProduct],
) -> Option<RankingInsight> {
    let ranks: Vec<f64> =
        competitors.iter().filter_map(|c| c.listing.rank.map(|r| r as f64)).collect();
    let main_rank = main.listing.rank?;
    if ranks.is_empty() {
        return None;
    }

    let avg = mean(&ranks);
    Some(RankingInsight {
        avg_competitor_rank: avg,
        main_product_rank: main_rank,
        rank_advantage: (main_rank as f64) < avg,
        // For ranks, lower is better — count competitors ranked worse.
        rank_percentile: percent_better(main_rank as f64, &ranks, true),
    })
}

fn feature_insight(main: &CompetitorProduct, competitors: &[CompetitorProduct]) -> FeatureInsight {
    let union: HashSet<&str> = competitors
        .iter()
        .flat_map(|c| c.listing.bullet_points.iter().map(String::as_str))
        .collect();
    let main_features: HashSet<&str> =
        main.listing.bullet_points.iter().map(String::as_str).collect();

    let mut unique: Vec<String> =
        main_features.difference(&union).map(|s| s.to_string()).collect();
    let mut missing: Vec<String> =
        union.difference(&main_features).map(|s| s.to_string()).collect();
    let mut common: Vec<String> =
        main_features.intersection(&union).map(|s| s.to_string()).collect();
    unique.sort();
    missing.sort();
    common.sort();

    let coverage = if union.is_empty() { 0.0 } else { common.len() as f64 / union.len() as f64 };

    FeatureInsight {
        unique_features: unique,
        missing_features: missing,
        common_features: common,
        feature_coverage: coverage,
    }
}

fn market_share_insight(
    main: &CompetitorProduct,
    competitors: &[CompetitorProduct],
) -> Option<MarketShareInsight> {
    let total: u64 = main.listing.review_count as u64
        + competitors.iter().map(|c| c.listing.review_count as u64).sum::<u64>();
    if total == 0 {
        return None;
    }
    Some(MarketShareInsight {
        estimated_share: main.listing.review_count as f64 / total as f64 * 100.0,
        review_count: main.listing.review_count,
        total_market_reviews: total,
    })
}

fn quadrant_insight(
    main: &CompetitorProduct,
    competitors: &[CompetitorProduct],
) -> Option<QuadrantInsight> {
    let (main_price, main_rating) = match (main.listing.price, main.listing.rating) {
        (Some(p), Some(r)) => (p, r),
        _ => return None,
    };

    let mut prices = vec![main_price];
    let mut qualities = vec![main_rating];
    for c in competitors {
        if let (Some(p), Some(r)) = (c.listing.price, c.listing.rating) {
            prices.push(p);
            qualities.push(r);
        }
    }

    let price_median = median(&prices);
    let quality_median = median(&qualities);

    let quadrant = if main_price > price_median && main_rating > quality_median {
        MarketQuadrant::Premium
    } else if main_price < price_median && main_rating > quality_median {
        MarketQuadrant::ValueLeader
    } else if main_price > price_median && main_rating < quality_median {
        MarketQuadrant::Overpriced
    } else {
        MarketQuadrant::Budget
    };

    Some(QuadrantInsight { quadrant, price_median, quality_median })
}

fn competitive_gaps(
    main: &CompetitorProduct,
    competitors: &[CompetitorProduct],
) -> Vec<CompetitiveGap> {
    let mut gaps = Vec::new();

    if let Some(main_price) = main.listing.price {
        let prices = competitor_prices(competitors);
        if !prices.is_empty() {
            let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
            if main_price > min_price * 1.1 {
                let severity =
                    if main_price > min_price * 1.3 { GapSeverity::High } else { GapSeverity::Medium };
                gaps.push(CompetitiveGap {
                    kind: GapKind::Price,
                    severity,
                    description: format!(
                        "Price is {:.1}% higher than the lowest competitor",
                        (main_price - min_price) / min_price * 100.0
                    ),
                    action: "Consider price adjustment or value justification".to_string(),
                });
            }
        }
    }

    if let Some(main_rating) = main.listing.rating {
        let ratings = competitor_ratings(competitors);
        if !ratings.is_empty() {
            let max_rating = ratings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if max_rating > main_rating + 0.3 {
                let severity =
                    if max_rating > main_rating + 0.5 { GapSeverity::High } else { GapSeverity::Medium };
                gaps.push(CompetitiveGap {
                    kind: GapKind::Rating,
                    severity,
                    description: format!(
                        "Rating is {:.1} points below the best competitor",
                        max_rating - main_rating
                    ),
                    action: "Focus on product quality and customer service improvements"
                        .to_string(),
                });
            }
        }
    }

    let max_reviews =
        competitors.iter().map(|c| c.listing.review_count).max().unwrap_or(0);
    if max_reviews > main.listing.review_count.saturating_mul(2) {
        gaps.push(CompetitiveGap {
            kind: GapKind::ReviewVolume,
            severity: GapSeverity::Medium,
            description: format!(
                "Review count trails the top competitor ({} vs {})",
                max_reviews, main.listing.review_count
            ),
            action: "Implement review acquisition strategies".to_string(),
        });
    }

    gaps
}

/// Price tier (±20% band around the competitor average) crossed with rating
/// tier (above/below the competitor average). A fixed lookup, no scoring.
pub fn market_position(
    main: &CompetitorProduct,
    competitors: &[CompetitorProduct],
) -> MarketPosition {
    if competitors.is_empty() {
        return MarketPosition::Unknown;
    }

    #[derive(PartialEq)]
    enum PriceTier {
        Low,
        Mid,
        Premium,
    }

    let price_tier = main.listing.price.and_then(|main_price| {
        let prices = competitor_prices(competitors);
        if prices.is_empty() {
            return None;
        }
        let avg = mean(&prices);
        Some(if main_price < avg * price_tiers::LOW_FACTOR {
            PriceTier::Low
        } else if main_price > avg * price_tiers::PREMIUM_FACTOR {
            PriceTier::Premium
        } else {
            PriceTier::Mid
        })
    });

    let rating_high = main.listing.rating.and_then(|main_rating| {
        let ratings = competitor_ratings(competitors);
        if ratings.is_empty() {
            return None;
        }
        Some(main_rating > mean(&ratings))
    });

    match (price_tier, rating_high) {
        (Some(PriceTier::Premium), Some(true)) => MarketPosition::PremiumLeader,
        (Some(PriceTier::Low), Some(true)) => MarketPosition::ValueLeader,
        (Some(PriceTier::Mid), Some(true)) => MarketPosition::MarketLeader,
        (Some(PriceTier::Low), _) => MarketPosition::BudgetOption,
        (Some(PriceTier::Premium), _) => MarketPosition::PremiumOption,
        (None, None) => MarketPosition::Unknown,
        _ => MarketPosition::Follower,
    }
}

fn mean(values: &[f64]) -> f64 {
    crate::trends::series::mean(values)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Percent of values the candidate beats. Higher-is-better by default;
/// `reverse` flips the comparison for rank-style metrics.
fn percent_better(value: f64, values: &[f64], reverse: bool) -> f64 {
    if values.is_empty() {
        return 50.0;
    }
    let better = if reverse {
        values.iter().filter(|v| **v > value).count()
    } else {
        values.iter().filter(|v| **v < value).count()
    };
    better as f64 / values.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::types::{Marketplace, StandardizedCompetitorData};

    fn competitor(
        price: Option<f64>,
        rating: Option<f64>,
        review_count: u32,
        rank: Option<u32>,
    ) -> CompetitorProduct {
        CompetitorProduct::from(StandardizedCompetitorData {
            asin: "B000000000".to_string(),
            title: "Competitor".to_string(),
            brand: None,
            price,
            list_price: None,
            rating,
            review_count,
            rank,
            category: None,
            image_url: None,
            product_url: String::new(),
            availability: None,
            bullet_points: vec![],
            description: None,
            marketplace: Marketplace::AmazonUs,
            seller_info: json!({}),
            variations: json!([]),
            crawled_at: Utc::now(),
            source_data: json!({}),
        })
    }

    fn with_features(mut product: CompetitorProduct, features: &[&str]) -> CompetitorProduct {
        product.listing.bullet_points = features.iter().map(|s| s.to_string()).collect();
        product
    }

    #[test]
    fn mid_price_high_rating_is_market_leader() {
        let main = competitor(Some(100.0), Some(4.5), 500, None);
        let comps =
            vec![competitor(Some(100.0), Some(4.0), 100, None), competitor(Some(100.0), Some(4.2), 100, None)];
        assert_eq!(market_position(&main, &comps), MarketPosition::MarketLeader);
    }

    #[test]
    fn cheap_and_better_rated_is_value_leader() {
        let main = competitor(Some(70.0), Some(4.8), 500, None);
        let comps = vec![competitor(Some(100.0), Some(4.0), 100, None)];
        assert_eq!(market_position(&main, &comps), MarketPosition::ValueLeader);
    }

    #[test]
    fn expensive_without_rating_edge_is_premium_option() {
        let main = competitor(Some(130.0), Some(3.5), 500, None);
        let comps = vec![competitor(Some(100.0), Some(4.0), 100, None)];
        assert_eq!(market_position(&main, &comps), MarketPosition::PremiumOption);
    }

    #[test]
    fn no_comparable_data_is_unknown() {
        let main = competitor(None, None, 0, None);
        let comps = vec![competitor(None, None, 0, None)];
        assert_eq!(market_position(&main, &comps), MarketPosition::Unknown);
        assert_eq!(market_position(&main, &[]), MarketPosition::Unknown);
    }

    #[test]
    fn pricing_insight_buckets_position() {
        let main = competitor(Some(90.0), None, 0, None);
        let comps = vec![
            competitor(Some(80.0), None, 0, None),
            competitor(Some(100.0), None, 0, None),
            competitor(Some(110.0), None, 0, None),
            competitor(Some(120.0), None, 0, None),
        ];
        let insights = generate_insights(&main, &comps, AnalysisType::Pricing, None);
        let pricing = insights.pricing.expect("pricing insight");
        // One of four competitors is cheaper → 25% below → medium bucket.
        assert_eq!(pricing.price_position, PricePosition::Medium);
        assert!(pricing.price_advantage);
        assert_eq!(pricing.min_competitor_price, 80.0);
        assert_eq!(pricing.max_competitor_price, 120.0);
    }

    #[test]
    fn missing_main_price_leaves_pricing_none() {
        let main = competitor(None, Some(4.0), 10, None);
        let comps = vec![competitor(Some(50.0), Some(4.5), 10, None)];
        let insights = generate_insights(&main, &comps, AnalysisType::Comprehensive, None);
        assert!(insights.pricing.is_none());
        assert!(insights.rating.is_some());
    }

    #[test]
    fn feature_insight_sets_and_coverage() {
        let main = with_features(competitor(None, None, 0, None), &["a", "b", "x"]);
        let comps = vec![
            with_features(competitor(None, None, 0, None), &["a", "c"]),
            with_features(competitor(None, None, 0, None), &["b", "d"]),
        ];
        let features = feature_insight(&main, &comps);
        assert_eq!(features.unique_features, vec!["x".to_string()]);
        assert_eq!(features.missing_features, vec!["c".to_string(), "d".to_string()]);
        assert_eq!(features.common_features, vec!["a".to_string(), "b".to_string()]);
        // 2 shared of a 4-feature union.
        assert!((features.feature_coverage - 0.5).abs() < 1e-9);
    }

    #[test]
    fn market_share_from_review_volume() {
        let main = competitor(None, None, 500, None);
        let comps = vec![competitor(None, None, 1000, None), competitor(None, None, 500, None)];
        let insights = generate_insights(&main, &comps, AnalysisType::Comprehensive, None);
        let share = insights.market_share.expect("share");
        assert!((share.estimated_share - 25.0).abs() < 1e-9);
        assert_eq!(share.total_market_reviews, 2000);
    }

    #[test]
    fn rank_percentile_counts_worse_competitors() {
        let main = competitor(None, None, 0, Some(50));
        let comps = vec![
            competitor(None, None, 0, Some(30)),
            competitor(None, None, 0, Some(80)),
            competitor(None, None, 0, Some(100)),
        ];
        let ranking = ranking_insight(&main, &comps).expect("ranking");
        assert!((ranking.rank_percentile - 66.66666666666667).abs() < 1e-9);
        assert!(ranking.rank_advantage);
    }

    #[test]
    fn quadrant_uses_medians_over_main_and_competitors() {
        let main = competitor(Some(120.0), Some(4.8), 0, None);
        let comps = vec![
            competitor(Some(100.0), Some(4.0), 0, None),
            competitor(Some(80.0), Some(3.5), 0, None),
        ];
        let quadrant = quadrant_insight(&main, &comps).expect("quadrant");
        assert_eq!(quadrant.quadrant, MarketQuadrant::Premium);
        assert_eq!(quadrant.price_median, 100.0);
    }

    #[test]
    fn gaps_flag_price_rating_and_reviews() {
        let main = competitor(Some(140.0), Some(3.8), 100, None);
        let comps = vec![competitor(Some(100.0), Some(4.5), 900, None)];
        let gaps = competitive_gaps(&main, &comps);
        assert_eq!(gaps.len(), 3);
        assert!(gaps
            .iter()
            .any(|g| g.kind == GapKind::Price && g.severity == GapSeverity::High));
        assert!(gaps
            .iter()
            .any(|g| g.kind == GapKind::Rating && g.severity == GapSeverity::High));
        assert!(gaps.iter().any(|g| g.kind == GapKind::ReviewVolume));
    }
}
