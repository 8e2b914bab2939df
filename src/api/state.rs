use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{error::AppResult, models::RecommendationMap, services::ArtifactPublisher};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<RwLock<AppStateInner>>,
    pub publisher: ArtifactPublisher,
}

/// The currently served recommendation map
pub struct AppStateInner {
    pub recommendations: RecommendationMap,
    pub loaded_at: DateTime<Utc>,
}

impl AppState {
    /// Creates state serving an already loaded map
    pub fn new(publisher: ArtifactPublisher, recommendations: RecommendationMap) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AppStateInner {
                recommendations,
                loaded_at: Utc::now(),
            })),
            publisher,
        }
    }

    /// Creates state from the artifact the publisher points at
    pub async fn load(publisher: ArtifactPublisher) -> AppResult<Self> {
        let recommendations = read_artifact(&publisher).await?;
        Ok(Self::new(publisher, recommendations))
    }

    /// Re-reads the artifact; the served map is only swapped when the read succeeds
    pub async fn reload(&self) -> AppResult<usize> {
        let recommendations = read_artifact(&self.publisher).await?;
        let items = recommendations.len();

        let mut inner = self.inner.write().await;
        inner.recommendations = recommendations;
        inner.loaded_at = Utc::now();

        Ok(items)
    }
}

async fn read_artifact(publisher: &ArtifactPublisher) -> AppResult<RecommendationMap> {
    let publisher = publisher.clone();
    tokio::task::spawn_blocking(move || publisher.load())
        .await
        .map_err(|e| crate::error::AppError::Internal(e.to_string()))?
}
