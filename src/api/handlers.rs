use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{ItemId, Recommendation, RecommendationMap};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub id: ItemId,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub items: usize,
    pub total_pairs: usize,
    pub items_without_recommendations: usize,
    pub loaded_at: DateTime<Utc>,
}

impl StatsResponse {
    fn from_map(map: &RecommendationMap, loaded_at: DateTime<Utc>) -> Self {
        Self {
            items: map.len(),
            total_pairs: map.values().map(Vec::len).sum(),
            items_without_recommendations: map.values().filter(|list| list.is_empty()).count(),
            loaded_at,
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Ranked recommendations for one item
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> AppResult<Json<RecommendationsResponse>> {
    let inner = state.inner.read().await;

    let recommendations = inner
        .recommendations
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("no recommendations for item {}", id)))?;

    Ok(Json(RecommendationsResponse {
        id,
        recommendations,
    }))
}

/// Summary counts of the served recommendation map
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let inner = state.inner.read().await;
    Json(StatsResponse::from_map(&inner.recommendations, inner.loaded_at))
}

/// Re-reads the published artifact. On failure the current map keeps serving.
pub async fn reload(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<StatsResponse>> {
    match state.reload().await {
        Ok(items) => tracing::info!(%request_id, items, "Reloaded recommendation artifact"),
        Err(e) => {
            tracing::error!(%request_id, error = %e, "Reload failed, keeping current map");
            return Err(e);
        }
    }

    let inner = state.inner.read().await;
    Ok(Json(StatsResponse::from_map(&inner.recommendations, inner.loaded_at)))
}
