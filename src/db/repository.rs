//! Storage access behind an explicit trait so the engine's consumers can be
//! handed any repository (SQLite here, a fake in tests) instead of reaching
//! for a global session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{PriceHistoryRow, ProductRow, RankHistoryRow};
use crate::error::Result;
use crate::types::{
    AnomalySummary, CompetitorAnalysis, HistoryPoint, ProductSnapshot,
    StandardizedCompetitorData,
};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Current snapshot for one product, if tracked.
    async fn get_product(&self, asin: &str) -> Result<Option<ProductSnapshot>>;

    /// ASINs of every active tracked product.
    async fn active_asins(&self) -> Result<Vec<String>>;

    /// ASINs of active main products (analysis roots).
    async fn main_asins(&self) -> Result<Vec<String>>;

    /// Competitor ASINs linked to a main product.
    async fn competitor_asins(&self, main_asin: &str) -> Result<Vec<String>>;

    /// Listed-price history since the given lower bound, oldest first.
    async fn price_history(&self, asin: &str, since: DateTime<Utc>) -> Result<Vec<HistoryPoint>>;

    /// Buy-box price history since the given lower bound, oldest first.
    async fn buy_box_history(&self, asin: &str, since: DateTime<Utc>)
        -> Result<Vec<HistoryPoint>>;

    /// Rank history since the given lower bound, oldest first.
    async fn rank_history(&self, asin: &str, since: DateTime<Utc>) -> Result<Vec<HistoryPoint>>;

    /// Insert or update a product snapshot from a standardized listing.
    /// The is_main/is_active flags of an existing row are preserved.
    async fn upsert_snapshot(&self, listing: &StandardizedCompetitorData) -> Result<()>;

    /// Register an ASIN as a tracked main product (no-op if present).
    async fn register_main(&self, asin: &str) -> Result<()>;

    /// Link a competitor to a main product (no-op if present).
    async fn link_competitor(&self, main_asin: &str, competitor_asin: &str) -> Result<()>;

    async fn append_price_history(
        &self,
        asin: &str,
        price: Option<f64>,
        buy_box_price: Option<f64>,
        recorded_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn append_rank_history(
        &self,
        asin: &str,
        rank: u32,
        recorded_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn insert_analysis(&self, analysis: &CompetitorAnalysis) -> Result<()>;

    async fn insert_anomaly(&self, summary: &AnomalySummary) -> Result<()>;
}

pub struct SqliteRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "asin, title, brand, price, buy_box_price, list_price, rating, \
     review_count, rank, category, image_url, product_url, availability, bullet_points, \
     description, marketplace, is_main, is_active, updated_at";

#[async_trait]
impl ProductRepository for SqliteRepository {
    async fn get_product(&self, asin: &str) -> Result<Option<ProductSnapshot>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE asin = ?"
        ))
        .bind(asin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ProductRow::into_snapshot))
    }

    async fn active_asins(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT asin FROM products WHERE is_active = 1 ORDER BY asin")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(asin,)| asin).collect())
    }

    async fn main_asins(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT asin FROM products WHERE is_active = 1 AND is_main = 1 ORDER BY asin",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(asin,)| asin).collect())
    }

    async fn competitor_asins(&self, main_asin: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT competitor_asin FROM competitor_links WHERE main_asin = ? \
             ORDER BY competitor_asin",
        )
        .bind(main_asin)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(asin,)| asin).collect())
    }

    async fn price_history(&self, asin: &str, since: DateTime<Utc>) -> Result<Vec<HistoryPoint>> {
        let rows = sqlx::query_as::<_, PriceHistoryRow>(
            "SELECT price, buy_box_price, recorded_at FROM price_history \
             WHERE asin = ? AND recorded_at >= ? AND price IS NOT NULL \
             ORDER BY recorded_at",
        )
        .bind(asin)
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                r.price.map(|value| HistoryPoint {
                    value,
                    recorded_at: crate::db::models::ts_to_datetime(r.recorded_at),
                })
            })
            .collect())
    }

    async fn buy_box_history(
        &self,
        asin: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>> {
        let rows = sqlx::query_as::<_, PriceHistoryRow>(
            "SELECT price, buy_box_price, recorded_at FROM price_history \
             WHERE asin = ? AND recorded_at >= ? AND buy_box_price IS NOT NULL \
             ORDER BY recorded_at",
        )
        .bind(asin)
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                r.buy_box_price.map(|value| HistoryPoint {
                    value,
                    recorded_at: crate::db::models::ts_to_datetime(r.recorded_at),
                })
            })
            .collect())
    }

    async fn rank_history(&self, asin: &str, since: DateTime<Utc>) -> Result<Vec<HistoryPoint>> {
        let rows = sqlx::query_as::<_, RankHistoryRow>(
            "SELECT rank, recorded_at FROM rank_history \
             WHERE asin = ? AND recorded_at >= ? ORDER BY recorded_at",
        )
        .bind(asin)
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| HistoryPoint {
                value: r.rank as f64,
                recorded_at: crate::db::models::ts_to_datetime(r.recorded_at),
            })
            .collect())
    }

    async fn upsert_snapshot(&self, listing: &StandardizedCompetitorData) -> Result<()> {
        let bullet_points = serde_json::to_string(&listing.bullet_points)?;
        let marketplace = listing.marketplace.to_string();
        let buy_box_price = crate::normalizer::record::extract_buy_box_price(listing);
        sqlx::query(
            r#"
            INSERT INTO products (
                asin, title, brand, price, buy_box_price, list_price, rating,
                review_count, rank, category, image_url, product_url,
                availability, bullet_points, description, marketplace, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(asin) DO UPDATE SET
                title = excluded.title,
                brand = excluded.brand,
                price = excluded.price,
                buy_box_price = excluded.buy_box_price,
                list_price = excluded.list_price,
                rating = excluded.rating,
                review_count = excluded.review_count,
                rank = excluded.rank,
                category = excluded.category,
                image_url = excluded.image_url,
                product_url = excluded.product_url,
                availability = excluded.availability,
                bullet_points = excluded.bullet_points,
                description = excluded.description,
                marketplace = excluded.marketplace,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&listing.asin)
        .bind(&listing.title)
        .bind(&listing.brand)
        .bind(listing.price)
        .bind(buy_box_price)
        .bind(listing.list_price)
        .bind(listing.rating)
        .bind(listing.review_count as i64)
        .bind(listing.rank.map(|r| r as i64))
        .bind(&listing.category)
        .bind(&listing.image_url)
        .bind(&listing.product_url)
        .bind(&listing.availability)
        .bind(bullet_points)
        .bind(&listing.description)
        .bind(marketplace)
        .bind(listing.crawled_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn register_main(&self, asin: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (asin, title, is_main, updated_at) VALUES (?, ?, 1, ?) \
             ON CONFLICT(asin) DO UPDATE SET is_main = 1",
        )
        .bind(asin)
        .bind(asin)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn link_competitor(&self, main_asin: &str, competitor_asin: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO competitor_links (main_asin, competitor_asin) VALUES (?, ?)",
        )
        .bind(main_asin)
        .bind(competitor_asin)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_price_history(
        &self,
        asin: &str,
        price: Option<f64>,
        buy_box_price: Option<f64>,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO price_history (asin, price, buy_box_price, recorded_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(asin)
        .bind(price)
        .bind(buy_box_price)
        .bind(recorded_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_rank_history(
        &self,
        asin: &str,
        rank: u32,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO rank_history (asin, rank, recorded_at) VALUES (?, ?, ?)")
            .bind(asin)
            .bind(rank as i64)
            .bind(recorded_at.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_analysis(&self, analysis: &CompetitorAnalysis) -> Result<()> {
        let payload = serde_json::to_string(analysis)?;
        let analysis_type = analysis.analysis_type.to_string();
        let market_position = analysis.market_position.to_string();
        sqlx::query(
            "INSERT INTO analyses (analysis_id, main_asin, analysis_type, market_position, \
             payload, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&analysis.analysis_id)
        .bind(&analysis.main_product.listing.asin)
        .bind(analysis_type)
        .bind(market_position)
        .bind(payload)
        .bind(analysis.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_anomaly(&self, summary: &AnomalySummary) -> Result<()> {
        let payload = serde_json::to_string(summary)?;
        sqlx::query(
            "INSERT INTO anomalies (asin, anomaly_count, payload, checked_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&summary.asin)
        .bind(summary.anomaly_count as i64)
        .bind(payload)
        .bind(summary.check_time.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
