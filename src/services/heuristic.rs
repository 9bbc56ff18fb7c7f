use regex::Regex;
use std::{cmp::Ordering, sync::OnceLock};

use crate::models::Product;

/// Maximum number of products the local filter returns
pub const MAX_RESULTS: usize = 6;

/// Category keywords in priority order; the first one found in the query wins
pub const CATEGORY_KEYWORDS: [&str; 7] = [
    "phone", "tablet", "camera", "audio", "earbud", "earbuds", "work",
];

const BUDGET_WORDS: [&str; 2] = ["budget", "cheap"];

fn price_ceiling_regex() -> &'static Regex {
    static PRICE_CEILING: OnceLock<Regex> = OnceLock::new();
    PRICE_CEILING.get_or_init(|| {
        Regex::new(r"(?:under|below|<)\s*\$?([0-9]{2,6})").expect("valid price ceiling pattern")
    })
}

/// Finds the first "under/below/< [$]amount" phrase and returns the amount.
///
/// The amount must have between two and six digits. Expects lower-cased text.
pub fn extract_price_ceiling(text: &str) -> Option<u32> {
    price_ceiling_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|amount| amount.as_str().parse().ok())
}

/// Returns the first category keyword, in priority order, contained in `text`.
pub fn extract_category(text: &str) -> Option<&'static str> {
    CATEGORY_KEYWORDS
        .iter()
        .copied()
        .find(|&keyword| text.contains(keyword))
}

/// Splits on whitespace and commas, dropping empty pieces.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .collect()
}

fn matches_category(product: &Product, keyword: &str) -> bool {
    product.category.contains(keyword) || product.name.to_lowercase().contains(keyword)
}

fn token_overlap(product: &Product, tokens: &[&str]) -> usize {
    let name = product.name.to_lowercase();
    let features = product.features.join(" ").to_lowercase();

    tokens
        .iter()
        .copied()
        .filter(|&token| {
            name.contains(token) || product.category.contains(token) || features.contains(token)
        })
        .count()
}

/// Cheaper products get a larger bonus; anything at or above 1000 gets none or less.
fn price_bonus(product: &Product) -> f64 {
    (1000.0 - product.price) / 1000.0
}

/// Ranks catalog products against a free-text preference without any remote help.
///
/// Restricts by the detected category keyword and price ceiling, then orders
/// by token overlap, adding a price bonus when the query asks for something
/// cheap or names a ceiling. Ties keep catalog order. At most
/// [`MAX_RESULTS`] products are returned, all of them taken from `products`.
pub fn local_recommendations(query: &str, products: &[Product]) -> Vec<Product> {
    let lower = query.to_lowercase();
    let max_price = extract_price_ceiling(&lower);
    let category = extract_category(&lower);

    let mut candidates: Vec<&Product> = products.iter().collect();
    if let Some(keyword) = category {
        candidates.retain(|p| matches_category(p, keyword));
    }
    if let Some(max_price) = max_price {
        candidates.retain(|p| p.price <= f64::from(max_price));
    }

    let tokens = tokenize(&lower);
    let prefers_cheap =
        max_price.is_some() || BUDGET_WORDS.iter().any(|word| lower.contains(word));

    let mut scored: Vec<(f64, &Product)> = candidates
        .into_iter()
        .map(|product| {
            let mut score = token_overlap(product, &tokens) as f64;
            if prefers_cheap {
                score += price_bonus(product);
            }
            (score, product)
        })
        .collect();

    // sort_by is stable, so equal scores stay in catalog order
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    tracing::debug!(
        query = %query,
        category = ?category,
        max_price = ?max_price,
        candidates = scored.len(),
        "Local filter ranked candidates"
    );

    scored
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(_, product)| product.clone())
        .collect()
}
