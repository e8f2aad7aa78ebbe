//! Pure field normalizers. Every function accepts an arbitrary raw JSON value
//! and returns a typed value or a null-equivalent — never an error, so one
//! malformed record can't interrupt a batch.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref DECIMAL_RE: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
    static ref INTEGER_RE: Regex = Regex::new(r"\d+").unwrap();
}

/// Parse a price out of a number, a currency string ("$1,299.99"), or a
/// nested object with a `value` key. Non-positive results are treated as
/// invalid.
pub fn normalize_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => {
            let price = n.as_f64()?;
            (price > 0.0).then_some(price)
        }
        Value::String(s) => parse_price_str(s),
        Value::Object(map) => map.get("value").and_then(normalize_price),
        _ => None,
    }
}

fn parse_price_str(s: &str) -> Option<f64> {
    // Strip dollar signs, thousands separators and whitespace, then take the
    // first decimal number. Other currency symbols fall out via the regex.
    let cleaned: String =
        s.chars().filter(|c| !matches!(*c, '$' | ',') && !c.is_whitespace()).collect();
    let m = DECIMAL_RE.find(&cleaned)?;
    let price: f64 = m.as_str().parse().ok()?;
    (price > 0.0).then_some(price)
}

/// Parse a rating from a number or a string containing a decimal number
/// ("4.5 out of 5 stars"). Valid only within [0, 5].
pub fn normalize_rating(value: &Value) -> Option<f64> {
    let rating = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => DECIMAL_RE.find(s)?.as_str().parse().ok()?,
        _ => return None,
    };
    (0.0..=5.0).contains(&rating).then_some(rating)
}

/// Parse a review count from a number or a string ("1,234 ratings").
/// Missing or invalid input yields 0, not an error.
pub fn normalize_review_count(value: &Value) -> u32 {
    match value {
        Value::Number(n) => {
            let count = n.as_f64().unwrap_or(0.0);
            if count <= 0.0 {
                0
            } else {
                count.min(u32::MAX as f64) as u32
            }
        }
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().map(|n| n.min(u32::MAX as u64) as u32).unwrap_or(0)
        }
        _ => 0,
    }
}

/// Parse a sales rank from a number, a string that may carry a `#` and
/// thousands separators ("#1,234 in Kitchen & Dining"), an array of
/// category/rank objects (first entry wins), or a bare object with a `rank`
/// key. Non-positive ranks are invalid.
pub fn normalize_rank(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            let rank = n.as_f64()?;
            (rank > 0.0).then(|| rank as u32)
        }
        Value::String(s) => parse_rank_str(s),
        Value::Array(items) => items.first().and_then(normalize_rank),
        Value::Object(map) => map.get("rank").and_then(normalize_rank),
        _ => None,
    }
}

fn parse_rank_str(s: &str) -> Option<u32> {
    // The rank is the leading integer of the first token: "#1,234 in Books".
    let token = s.split_whitespace().next()?;
    let cleaned: String = token.chars().filter(|c| !matches!(*c, '#' | ',')).collect();
    let m = INTEGER_RE.find(&cleaned)?;
    let rank: u32 = m.as_str().parse().ok()?;
    (rank > 0).then_some(rank)
}

/// Exactly 10 ASCII alphanumeric characters.
pub fn is_valid_asin(s: &str) -> bool {
    s.len() == 10 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Validate and canonicalize an ASIN field: trimmed, uppercased, 10 chars.
pub fn normalize_asin(value: &Value) -> Option<String> {
    let s = value.as_str()?.trim();
    is_valid_asin(s).then(|| s.to_uppercase())
}

/// Trimmed non-empty string, or None.
pub fn clean_str(value: &Value) -> Option<String> {
    let s = value.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}
