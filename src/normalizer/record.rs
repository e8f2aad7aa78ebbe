//! Record standardization: one raw scrape record in, one canonical
//! `StandardizedCompetitorData` out — or a counted drop, never an error.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::normalizer::fields::{
    clean_str, is_valid_asin, normalize_asin, normalize_price, normalize_rank,
    normalize_rating, normalize_review_count,
};
use crate::types::{Marketplace, RawRecord, StandardizedCompetitorData};

lazy_static! {
    /// Listing URL shapes that carry an ASIN, most specific first.
    static ref URL_ASIN_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)/dp/([A-Z0-9]{10})").unwrap(),
        Regex::new(r"(?i)/gp/product/([A-Z0-9]{10})").unwrap(),
        Regex::new(r"(?i)/product/([A-Z0-9]{10})").unwrap(),
        Regex::new(r"(?i)[?&]asin=([A-Z0-9]{10})").unwrap(),
        Regex::new(r"(?i)/([A-Z0-9]{10})(?:[/?]|$)").unwrap(),
    ];
}

/// Extract an ASIN from a listing URL. Returns None if no segment matches a
/// valid 10-char identifier.
pub fn extract_asin_from_url(url: &str) -> Option<String> {
    for pattern in URL_ASIN_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(url) {
            let asin = caps.get(1)?.as_str().to_uppercase();
            if is_valid_asin(&asin) {
                return Some(asin);
            }
        }
    }
    None
}

/// Detect the marketplace from a listing URL's host. Unknown hosts default
/// to the US marketplace.
pub fn detect_marketplace(url: &str) -> Marketplace {
    let url = url.to_lowercase();
    if url.contains("amazon.co.uk") {
        Marketplace::AmazonUk
    } else if url.contains("amazon.de") {
        Marketplace::AmazonDe
    } else if url.contains("amazon.fr") {
        Marketplace::AmazonFr
    } else if url.contains("amazon.co.jp") {
        Marketplace::AmazonJp
    } else if url.contains("amazon.ca") {
        Marketplace::AmazonCa
    } else if url.contains("amazon.com.au") {
        Marketplace::AmazonAu
    } else if url.contains("amazon.in") {
        Marketplace::AmazonIn
    } else {
        Marketplace::AmazonUs
    }
}

#[derive(Debug, Default)]
pub struct StandardizeStats {
    pub processed: usize,
    pub standardized: usize,
    pub dropped_missing_asin: usize,
    pub dropped_missing_title: usize,
    /// Sample of raw ASIN values from dropped records, for log output.
    pub dropped_samples: Vec<String>,
}

impl StandardizeStats {
    pub fn dropped(&self) -> usize {
        self.dropped_missing_asin + self.dropped_missing_title
    }
}

enum Rejection {
    MissingAsin(String),
    MissingTitle(String),
}

/// First present key wins — providers disagree on field names.
fn field<'a>(raw: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| raw.get(*k)).filter(|v| !v.is_null())
}

fn standardize_checked(
    raw: &RawRecord,
    crawled_at: DateTime<Utc>,
) -> Result<StandardizedCompetitorData, Rejection> {
    // An invalid/absent asin field can be recovered from the listing URL.
    let asin = field(raw, &["asin"]).and_then(normalize_asin).or_else(|| {
        field(raw, &["url", "product_url"])
            .and_then(|v| v.as_str())
            .and_then(extract_asin_from_url)
    });
    let Some(asin) = asin else {
        let sample =
            field(raw, &["asin"]).and_then(|v| v.as_str()).unwrap_or("").to_string();
        return Err(Rejection::MissingAsin(sample));
    };

    let title = match field(raw, &["title"]).and_then(clean_str) {
        Some(t) => t,
        None => return Err(Rejection::MissingTitle(asin)),
    };

    let price = field(raw, &["price", "price.value"]).and_then(normalize_price);
    let list_price = field(raw, &["list_price", "listPrice"]).and_then(normalize_price);
    let rating = field(raw, &["rating", "stars"]).and_then(normalize_rating);
    let review_count = field(raw, &["review_count", "reviewsCount"])
        .map(normalize_review_count)
        .unwrap_or(0);
    let rank = field(raw, &["rank", "bestsellerRanks", "bestSellersRank"]).and_then(normalize_rank);

    let product_url = field(raw, &["url", "product_url"])
        .and_then(clean_str)
        .unwrap_or_else(|| format!("https://amazon.com/dp/{asin}"));

    let bullet_points: Vec<String> = field(raw, &["features", "bullet_points"])
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(clean_str).collect())
        .unwrap_or_default();

    Ok(StandardizedCompetitorData {
        asin,
        title,
        brand: field(raw, &["brand"]).and_then(clean_str),
        price,
        list_price,
        rating,
        review_count,
        rank,
        category: field(raw, &["category", "breadCrumbs"]).and_then(clean_str),
        image_url: field(raw, &["image_url", "thumbnailImage"]).and_then(clean_str),
        availability: field(raw, &["availability"]).and_then(clean_str),
        bullet_points,
        description: field(raw, &["description"]).and_then(clean_str),
        marketplace: detect_marketplace(&product_url),
        product_url,
        seller_info: field(raw, &["seller_info"]).cloned().unwrap_or_else(|| json!({})),
        variations: field(raw, &["variations"]).cloned().unwrap_or_else(|| json!([])),
        crawled_at,
        source_data: raw.clone(),
    })
}

/// Buy-box price travels only in the raw pass-through — it's a marketplace
/// detail, not part of the canonical listing shape.
pub fn extract_buy_box_price(listing: &StandardizedCompetitorData) -> Option<f64> {
    field(&listing.source_data, &["buy_box_price", "buyBoxPrice", "buybox.price"])
        .and_then(normalize_price)
}

/// Standardize a single raw record. Returns None when the record fails the
/// identity invariant (valid ASIN, non-empty title).
pub fn standardize_record(
    raw: &RawRecord,
    crawled_at: DateTime<Utc>,
) -> Option<StandardizedCompetitorData> {
    standardize_checked(raw, crawled_at).ok()
}

/// Standardize a batch. Invalid records are dropped and counted — one bad
/// record never interrupts the rest.
pub fn standardize_batch(
    raws: &[RawRecord],
    crawled_at: DateTime<Utc>,
) -> (Vec<StandardizedCompetitorData>, StandardizeStats) {
    let mut out = Vec::with_capacity(raws.len());
    let mut stats = StandardizeStats::default();

    for raw in raws {
        stats.processed += 1;
        match standardize_checked(raw, crawled_at) {
            Ok(listing) => {
                stats.standardized += 1;
                out.push(listing);
            }
            Err(Rejection::MissingAsin(sample)) => {
                stats.dropped_missing_asin += 1;
                if stats.dropped_samples.len() < 10 {
                    stats.dropped_samples.push(sample);
                }
            }
            Err(Rejection::MissingTitle(sample)) => {
                stats.dropped_missing_title += 1;
                if stats.dropped_samples.len() < 10 {
                    stats.dropped_samples.push(sample);
                }
            }
        }
    }

    (out, stats)
}
