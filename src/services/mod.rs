pub mod heuristic;
pub mod resolver;
pub mod scoring;

pub use resolver::RecommendationResolver;
pub use scoring::{HttpScoringProvider, ScoringError, ScoringProvider};
