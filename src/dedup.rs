//! Consolidates duplicate listings: the same ASIN offered by multiple
//! sellers collapses to one record carrying the best price and the seller
//! spread.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::types::StandardizedCompetitorData;

/// Group listings by ASIN and consolidate every multi-seller group.
/// Single-member groups pass through untouched; first-encounter order of
/// ASINs is preserved. Idempotent — consolidating an already-consolidated
/// list is a no-op.
pub fn consolidate_listings(
    listings: Vec<StandardizedCompetitorData>,
) -> Vec<StandardizedCompetitorData> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<StandardizedCompetitorData>> = HashMap::new();

    for listing in listings {
        let entry = groups.entry(listing.asin.clone()).or_default();
        if entry.is_empty() {
            order.push(listing.asin.clone());
        }
        entry.push(listing);
    }

    order
        .into_iter()
        .map(|asin| consolidate_group(groups.remove(&asin).unwrap_or_default()))
        .collect()
}

/// Collapse one ASIN group. The member with the lowest non-null price is
/// primary (ties: first encountered) and keeps its descriptive fields; the
/// consolidated price is the group minimum, and seller_info/source_data gain
/// the multi-seller bookkeeping keys.
pub fn consolidate_group(
    mut group: Vec<StandardizedCompetitorData>,
) -> StandardizedCompetitorData {
    if group.len() == 1 {
        return group.pop().expect("non-empty group");
    }

    let all_prices: Vec<f64> = group.iter().filter_map(|d| d.price).collect();
    let seller_count = group.len();

    let primary_idx = group
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let pa = a.price.unwrap_or(f64::INFINITY);
            let pb = b.price.unwrap_or(f64::INFINITY);
            pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut consolidated = group.swap_remove(primary_idx);

    let min_price = all_prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max_price = all_prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !all_prices.is_empty() {
        consolidated.price = Some(min_price);
    }

    let mut seller_info = as_object(consolidated.seller_info.take());
    seller_info.insert("multiple_sellers".to_string(), json!(true));
    seller_info.insert("seller_count".to_string(), json!(seller_count));
    if !all_prices.is_empty() {
        seller_info
            .insert("price_range".to_string(), json!({"min": min_price, "max": max_price}));
    }
    consolidated.seller_info = Value::Object(seller_info);

    let mut source_data = as_object(consolidated.source_data.take());
    source_data.insert("consolidated_from".to_string(), json!(seller_count));
    source_data.insert("all_prices".to_string(), json!(all_prices));
    consolidated.source_data = Value::Object(source_data);

    consolidated
}

fn as_object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::types::Marketplace;

    fn listing(asin: &str, title: &str, price: Option<f64>) -> StandardizedCompetitorData {
        StandardizedCompetitorData {
            asin: asin.to_string(),
            title: title.to_string(),
            brand: None,
            price,
            list_price: None,
            rating: Some(4.2),
            review_count: 100,
            rank: None,
            category: None,
            image_url: None,
            product_url: format!("https://amazon.com/dp/{asin}"),
            availability: None,
            bullet_points: vec![],
            description: None,
            marketplace: Marketplace::AmazonUs,
            seller_info: json!({}),
            variations: json!([]),
            crawled_at: Utc::now(),
            source_data: json!({"asin": asin}),
        }
    }

    #[test]
    fn single_member_group_is_a_no_op() {
        let input = vec![listing("B000000001", "Solo", Some(19.99))];
        let out = consolidate_listings(input.clone());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].price, Some(19.99));
        assert_eq!(out[0].seller_info, json!({}));
        assert_eq!(out[0].source_data, json!({"asin": "B000000001"}));
    }

    #[test]
    fn three_sellers_consolidate_to_minimum_price() {
        let input = vec![
            listing("B000000001", "Seller A", Some(50.0)),
            listing("B000000001", "Seller B", Some(40.0)),
            listing("B000000001", "Seller C", Some(60.0)),
        ];
        let out = consolidate_listings(input);
        assert_eq!(out.len(), 1);
        let merged = &out[0];
        assert_eq!(merged.price, Some(40.0));
        // Primary is the cheapest seller's record.
        assert_eq!(merged.title, "Seller B");
        assert_eq!(merged.seller_info["multiple_sellers"], json!(true));
        assert_eq!(merged.seller_info["seller_count"], json!(3));
        assert_eq!(merged.seller_info["price_range"], json!({"min": 40.0, "max": 60.0}));
        assert_eq!(merged.source_data["consolidated_from"], json!(3));
        assert_eq!(merged.source_data["all_prices"], json!([50.0, 40.0, 60.0]));
    }

    #[test]
    fn tie_on_price_keeps_first_encountered() {
        let input = vec![
            listing("B000000001", "First", Some(40.0)),
            listing("B000000001", "Second", Some(40.0)),
        ];
        let out = consolidate_listings(input);
        assert_eq!(out[0].title, "First");
    }

    #[test]
    fn missing_prices_do_not_poison_the_group() {
        let input = vec![
            listing("B000000001", "Priced", Some(25.0)),
            listing("B000000001", "Unpriced", None),
        ];
        let out = consolidate_listings(input);
        assert_eq!(out[0].price, Some(25.0));
        assert_eq!(out[0].title, "Priced");
    }

    #[test]
    fn distinct_asins_stay_separate_in_order() {
        let input = vec![
            listing("B000000002", "B", Some(10.0)),
            listing("B000000001", "A", Some(20.0)),
            listing("B000000002", "B2", Some(8.0)),
        ];
        let out = consolidate_listings(input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].asin, "B000000002");
        assert_eq!(out[0].price, Some(8.0));
        assert_eq!(out[1].asin, "B000000001");
    }
}
