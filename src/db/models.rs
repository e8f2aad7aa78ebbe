//! Database row types matching the schema in `migrations/`. Used by sqlx for
//! typed queries.

use chrono::{DateTime, Utc};

use crate::types::{Marketplace, ProductSnapshot};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub asin: String,
    pub title: String,
    pub brand: Option<String>,
    pub price: Option<f64>,
    pub buy_box_price: Option<f64>,
    pub list_price: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: i64,
    pub rank: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub product_url: String,
    pub availability: Option<String>,
    /// JSON array of strings.
    pub bullet_points: String,
    pub description: Option<String>,
    pub marketplace: String,
    pub is_main: i64,
    pub is_active: i64,
    /// Unix seconds.
    pub updated_at: i64,
}

impl ProductRow {
    pub fn into_snapshot(self) -> ProductSnapshot {
        ProductSnapshot {
            asin: self.asin,
            title: self.title,
            brand: self.brand,
            price: self.price,
            buy_box_price: self.buy_box_price,
            list_price: self.list_price,
            rating: self.rating,
            review_count: self.review_count.max(0) as u32,
            rank: self.rank.filter(|r| *r > 0).map(|r| r as u32),
            category: self.category,
            image_url: self.image_url,
            product_url: self.product_url,
            availability: self.availability,
            bullet_points: serde_json::from_str(&self.bullet_points).unwrap_or_default(),
            description: self.description,
            marketplace: Marketplace::parse(&self.marketplace),
            is_main: self.is_main != 0,
            updated_at: ts_to_datetime(self.updated_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub price: Option<f64>,
    pub buy_box_price: Option<f64>,
    pub recorded_at: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RankHistoryRow {
    pub rank: i64,
    pub recorded_at: i64,
}

pub fn ts_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
