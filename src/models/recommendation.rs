use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Product;

/// Instruction sent alongside every scoring request
pub const SCORING_INSTRUCTION: &str = "Return a JSON object: { \"recommended_ids\": [<product ids in order>], \"reason\": \"short reason\" }. Only output JSON.";

/// Where a result list came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Remote scoring service
    Remote,
    /// Local heuristic filter
    Local,
}

/// Outcome of a single submission, returned to the caller
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub products: Vec<Product>,
    /// Short explanation, only supplied by the remote path
    pub reason: Option<String>,
    pub source: RecommendationSource,
    /// Degraded-mode note shown to the user
    pub advisory: Option<String>,
    /// Set when a newer submission replaced this one before it completed
    pub superseded: bool,
}

/// Body posted to the scoring service
#[derive(Debug, Serialize)]
pub struct ScoringRequest<'a> {
    pub query: &'a str,
    pub products: &'a [Product],
    pub instruction: &'static str,
}

impl<'a> ScoringRequest<'a> {
    pub fn new(query: &'a str, products: &'a [Product]) -> Self {
        Self {
            query,
            products,
            instruction: SCORING_INSTRUCTION,
        }
    }
}

/// Accepted shape of a scoring reply
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringResponse {
    pub recommended_ids: Vec<String>,
    pub reason: Option<String>,
}

impl ScoringResponse {
    /// Extracts the reply from an arbitrary JSON document.
    ///
    /// Returns `None` unless the document is an object with an array field
    /// `recommended_ids`. Non-string entries of that array can never name a
    /// catalog product and are skipped.
    pub fn from_json(value: &Value) -> Option<Self> {
        let ids = value.get("recommended_ids")?.as_array()?;

        Some(Self {
            recommended_ids: ids
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            reason: value
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
