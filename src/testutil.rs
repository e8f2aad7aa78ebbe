//! Shared test fixtures: an in-memory `ProductRepository` and snapshot
//! builders. Compiled for tests only.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::ProductRepository;
use crate::error::Result;
use crate::types::{
    AnomalySummary, CompetitorAnalysis, HistoryPoint, Marketplace, ProductSnapshot,
    StandardizedCompetitorData,
};

#[derive(Default)]
struct FakeState {
    products: HashMap<String, ProductSnapshot>,
    price: HashMap<String, Vec<HistoryPoint>>,
    buy_box: HashMap<String, Vec<HistoryPoint>>,
    rank: HashMap<String, Vec<HistoryPoint>>,
    links: HashMap<String, Vec<String>>,
}

/// In-memory repository. History queries return everything recorded,
/// ignoring the date bound — bound filtering is covered by the SQLite tests.
#[derive(Default)]
pub struct FakeRepo {
    state: Mutex<FakeState>,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_snapshot(&self, snapshot: ProductSnapshot) {
        self.state.lock().unwrap().products.insert(snapshot.asin.clone(), snapshot);
    }

    pub fn set_price_history(&self, asin: &str, points: Vec<HistoryPoint>) {
        self.state.lock().unwrap().price.insert(asin.to_string(), points);
    }

    pub fn set_buy_box_history(&self, asin: &str, points: Vec<HistoryPoint>) {
        self.state.lock().unwrap().buy_box.insert(asin.to_string(), points);
    }

    pub fn set_rank_history(&self, asin: &str, points: Vec<HistoryPoint>) {
        self.state.lock().unwrap().rank.insert(asin.to_string(), points);
    }

    pub fn set_links(&self, main_asin: &str, competitors: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .links
            .insert(main_asin.to_string(), competitors.iter().map(|s| s.to_string()).collect());
    }

}

#[async_trait]
impl ProductRepository for FakeRepo {
    async fn get_product(&self, asin: &str) -> Result<Option<ProductSnapshot>> {
        Ok(self.state.lock().unwrap().products.get(asin).cloned())
    }

    async fn active_asins(&self) -> Result<Vec<String>> {
        let mut asins: Vec<String> =
            self.state.lock().unwrap().products.keys().cloned().collect();
        asins.sort();
        Ok(asins)
    }

    async fn main_asins(&self) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut asins: Vec<String> = state
            .products
            .values()
            .filter(|p| p.is_main)
            .map(|p| p.asin.clone())
            .collect();
        asins.sort();
        Ok(asins)
    }

    async fn competitor_asins(&self, main_asin: &str) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().links.get(main_asin).cloned().unwrap_or_default())
    }

    async fn price_history(&self, asin: &str, _since: DateTime<Utc>) -> Result<Vec<HistoryPoint>> {
        Ok(self.state.lock().unwrap().price.get(asin).cloned().unwrap_or_default())
    }

    async fn buy_box_history(
        &self,
        asin: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>> {
        Ok(self.state.lock().unwrap().buy_box.get(asin).cloned().unwrap_or_default())
    }

    async fn rank_history(&self, asin: &str, _since: DateTime<Utc>) -> Result<Vec<HistoryPoint>> {
        Ok(self.state.lock().unwrap().rank.get(asin).cloned().unwrap_or_default())
    }

    async fn upsert_snapshot(&self, listing: &StandardizedCompetitorData) -> Result<()> {
        let snapshot = ProductSnapshot {
            asin: listing.asin.clone(),
            title: listing.title.clone(),
            brand: listing.brand.clone(),
            price: listing.price,
            buy_box_price: None,
            list_price: listing.list_price,
            rating: listing.rating,
            review_count: listing.review_count,
            rank: listing.rank,
            category: listing.category.clone(),
            image_url: listing.image_url.clone(),
            product_url: listing.product_url.clone(),
            availability: listing.availability.clone(),
            bullet_points: listing.bullet_points.clone(),
            description: listing.description.clone(),
            marketplace: listing.marketplace,
            is_main: false,
            updated_at: listing.crawled_at,
        };
        self.add_snapshot(snapshot);
        Ok(())
    }

    async fn register_main(&self, asin: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(p) = state.products.get_mut(asin) {
            p.is_main = true;
        }
        Ok(())
    }

    async fn link_competitor(&self, main_asin: &str, competitor_asin: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let entry = state.links.entry(main_asin.to_string()).or_default();
        if !entry.iter().any(|c| c == competitor_asin) {
            entry.push(competitor_asin.to_string());
        }
        Ok(())
    }

    async fn append_price_history(
        &self,
        asin: &str,
        price: Option<f64>,
        buy_box_price: Option<f64>,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(value) = price {
            state
                .price
                .entry(asin.to_string())
                .or_default()
                .push(HistoryPoint { value, recorded_at });
        }
        if let Some(value) = buy_box_price {
            state
                .buy_box
                .entry(asin.to_string())
                .or_default()
                .push(HistoryPoint { value, recorded_at });
        }
        Ok(())
    }

    async fn append_rank_history(
        &self,
        asin: &str,
        rank: u32,
        recorded_at: DateTime<Utc>,
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .rank
            .entry(asin.to_string())
            .or_default()
            .push(HistoryPoint { value: rank as f64, recorded_at });
        Ok(())
    }

    async fn insert_analysis(&self, _analysis: &CompetitorAnalysis) -> Result<()> {
        Ok(())
    }

    async fn insert_anomaly(&self, _summary: &AnomalySummary) -> Result<()> {
        Ok(())
    }
}

/// Product snapshot with the numeric fields under test; everything else is
/// filled with plausible defaults.
pub fn snapshot(
    asin: &str,
    price: Option<f64>,
    rating: Option<f64>,
    review_count: u32,
    rank: Option<u32>,
) -> ProductSnapshot {
    ProductSnapshot {
        asin: asin.to_string(),
        title: format!("Product {asin}"),
        brand: Some("Acme".to_string()),
        price,
        buy_box_price: None,
        list_price: None,
        rating,
        review_count,
        rank,
        category: Some("Kitchen".to_string()),
        image_url: None,
        product_url: format!("https://amazon.com/dp/{asin}"),
        availability: Some("In Stock".to_string()),
        bullet_points: vec![],
        description: None,
        marketplace: Marketplace::AmazonUs,
        is_main: false,
        updated_at: Utc::now(),
    }
}
