//! Rule-based action items derived from the insight rollup. Ordered most
//! actionable first; plain strings so any downstream consumer can render
//! them.

use crate::types::{AnalysisInsights, PricePosition};

pub fn generate_recommendations(insights: &AnalysisInsights) -> Vec<String> {
    if insights.competitor_count == 0 {
        return vec!["Consider adding competitor ASINs for more detailed analysis".to_string()];
    }

    let mut recommendations = Vec::new();

    if let Some(pricing) = &insights.pricing {
        if pricing.price_position == PricePosition::High {
            recommendations.push(format!(
                "Consider reducing price to be more competitive. \
                 Average competitor price is ${:.2}",
                pricing.avg_competitor_price
            ));
        } else if pricing.price_advantage {
            recommendations.push(
                "You have a price advantage over competitors. \
                 Consider highlighting this in marketing."
                    .to_string(),
            );
        }
    }

    if let Some(rating) = &insights.rating {
        if !rating.rating_advantage {
            recommendations.push(
                "Focus on improving product quality and customer satisfaction \
                 to increase your rating above competitors."
                    .to_string(),
            );
        }
    }

    if let Some(ranking) = &insights.ranking {
        if !ranking.rank_advantage {
            recommendations.push(
                "Consider optimizing your listing with better keywords, \
                 images, and customer reviews to improve ranking."
                    .to_string(),
            );
        }
    }

    if let Some(features) = &insights.features {
        if !features.missing_features.is_empty() {
            let top: Vec<String> =
                features.missing_features.iter().take(3).cloned().collect();
            recommendations.push(format!(
                "Consider adding these features that competitors have: {}",
                top.join(", ")
            ));
        }
        if !features.unique_features.is_empty() {
            let top: Vec<String> = features.unique_features.iter().take(3).cloned().collect();
            recommendations
                .push(format!("Highlight your unique features in marketing: {}", top.join(", ")));
        }
    }

    if let Some(share) = &insights.market_share {
        if share.estimated_share < 10.0 {
            recommendations.push(
                "Your estimated market share is low. Consider increasing \
                 marketing efforts and improving product visibility."
                    .to_string(),
            );
        }
    }

    recommendations
}
