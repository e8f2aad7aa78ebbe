pub mod fields;
pub mod record;

pub use fields::{
    is_valid_asin, normalize_asin, normalize_price, normalize_rank, normalize_rating,
    normalize_review_count,
};
pub use record::{
    detect_marketplace, extract_asin_from_url, extract_buy_box_price, standardize_batch,
    standardize_record, StandardizeStats,
};
