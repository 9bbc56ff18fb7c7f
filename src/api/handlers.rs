use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{Product, Recommendation, WidgetState},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct WidgetStateResponse {
    #[serde(flatten)]
    pub state: WidgetState,
    pub busy: bool,
}

impl From<WidgetState> for WidgetStateResponse {
    fn from(state: WidgetState) -> Self {
        Self {
            busy: state.busy(),
            state,
        }
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// The full catalog, in catalog order
pub async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.resolver.catalog().products().to_vec())
}

/// Submit a preference and get ranked products back
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<Recommendation>> {
    tracing::info!(
        request_id = %request_id,
        query_len = request.query.len(),
        "Processing recommendation request"
    );

    let recommendation = state.resolver.submit(&request.query).await?;

    Ok(Json(recommendation))
}

/// What the widget currently displays
pub async fn widget_state(State(state): State<AppState>) -> Json<WidgetStateResponse> {
    Json(state.resolver.snapshot().into())
}
