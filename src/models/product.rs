use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path};

use crate::error::{AppError, AppResult};

/// A single offerable product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique identifier, stable for the lifetime of the process
    pub id: String,
    /// Display name
    pub name: String,
    /// Non-negative price in dollars
    pub price: f64,
    /// Single category tag (e.g. "phone", "tablet")
    pub category: String,
    /// Short descriptive strings, in display order
    pub features: Vec<String>,
}

impl Product {
    pub fn new(id: &str, name: &str, price: f64, category: &str, features: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            category: category.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// The fixed set of products offered to the recommender
///
/// Built once at startup and never mutated afterwards. Construction checks
/// that ids are unique and prices are non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for product in &products {
            if !seen.insert(product.id.as_str()) {
                return Err(AppError::Catalog(format!("duplicate product id {}", product.id)));
            }
            if product.price.is_nan() || product.price < 0.0 {
                return Err(AppError::Catalog(format!(
                    "product {} has invalid price {}",
                    product.id, product.price
                )));
            }
        }

        Ok(Self { products })
    }

    /// The demo catalog shipped with the service
    pub fn builtin() -> Self {
        Self {
            products: vec![
                Product::new("p1", "PocketPhone A1", 299.0, "phone", &["5.5in", "64GB", "dual-sim"]),
                Product::new("p2", "PocketPhone Pro", 549.0, "phone", &["6.2in", "128GB", "fast-charge"]),
                Product::new("p3", "BudgetPhone B2", 199.0, "phone", &["5.0in", "32GB"]),
                Product::new("p4", "CameraZoom X", 699.0, "camera", &["50MP", "optical-zoom"]),
                Product::new("p5", "WorkTablet T1", 429.0, "tablet", &["10in", "64GB"]),
                Product::new("p6", "Lifestyle Earbuds", 89.0, "audio", &["noise-cancel", "bluetooth 5.2"]),
            ],
        }
    }

    /// Loads a catalog from a JSON array of products
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let products: Vec<Product> = serde_json::from_str(&raw)
            .map_err(|e| AppError::Catalog(format!("{}: {}", path.display(), e)))?;

        Self::new(products)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
