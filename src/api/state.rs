use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    models::Catalog,
    services::{HttpScoringProvider, RecommendationResolver, ScoringProvider},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<RecommendationResolver>,
}

impl AppState {
    pub fn new(resolver: RecommendationResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// Builds the catalog and the HTTP scoring client from configuration
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading catalog from file");
                Catalog::from_json_file(path)?
            }
            None => Catalog::builtin(),
        };

        let provider: Arc<dyn ScoringProvider> = Arc::new(HttpScoringProvider::new(
            config.scoring_api_url.clone(),
            config.scoring_api_key.clone(),
        )?);

        Ok(Self::new(RecommendationResolver::new(
            Arc::new(catalog),
            provider,
            config.scoring_timeout(),
        )))
    }
}
