use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use tempfile::TempDir;

use affinity::api::{create_router, AppState};
use affinity::models::{Recommendation, RecommendationMap};
use affinity::services::ArtifactPublisher;

fn sample_map() -> RecommendationMap {
    let mut map = RecommendationMap::new();
    map.insert(
        20,
        vec![
            Recommendation { id: 21, score: 0.82 },
            Recommendation { id: 30, score: 0.41 },
        ],
    );
    map.insert(21, vec![Recommendation { id: 20, score: 0.82 }]);
    map.insert(30, vec![]);
    map
}

async fn create_test_server() -> (TestServer, ArtifactPublisher, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let publisher = ArtifactPublisher::new(dir.path().join("recommendations.json"));
    publisher.publish(&sample_map()).unwrap();

    let state = AppState::load(publisher.clone()).await.unwrap();
    let server = TestServer::new(create_router(state)).unwrap();
    (server, publisher, dir)
}

#[tokio::test]
async fn test_health_check() {
    let (server, _publisher, _dir) = create_test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_get_recommendations() {
    let (server, _publisher, _dir) = create_test_server().await;

    let response = server.get("/api/v1/recommendations/20").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], 20);
    let list = body["recommendations"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], 21);
    assert_eq!(list[0]["score"], 0.82);
    assert_eq!(list[1]["id"], 30);
}

#[tokio::test]
async fn test_item_with_empty_list_is_found() {
    let (server, _publisher, _dir) = create_test_server().await;

    let response = server.get("/api/v1/recommendations/30").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_item_returns_not_found() {
    let (server, _publisher, _dir) = create_test_server().await;

    let response = server.get("/api/v1/recommendations/999").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_non_numeric_id_is_rejected() {
    let (server, _publisher, _dir) = create_test_server().await;

    let response = server.get("/api/v1/recommendations/naruto").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let (server, _publisher, _dir) = create_test_server().await;

    let response = server.get("/api/v1/stats").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["items"], 3);
    assert_eq!(body["total_pairs"], 3);
    assert_eq!(body["items_without_recommendations"], 1);
}

#[tokio::test]
async fn test_reload_picks_up_new_artifact() {
    let (server, publisher, _dir) = create_test_server().await;

    let mut replacement = RecommendationMap::new();
    replacement.insert(40, vec![Recommendation { id: 41, score: 0.5 }]);
    publisher.publish(&replacement).unwrap();

    let response = server.post("/api/v1/reload").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["items"], 1);

    server
        .get("/api/v1/recommendations/20")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/api/v1/recommendations/40")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_failed_reload_keeps_current_map() {
    let (server, publisher, _dir) = create_test_server().await;
    std::fs::write(publisher.path(), "{ truncated").unwrap();

    let response = server.post("/api/v1/reload").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let response = server.get("/api/v1/recommendations/20").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["recommendations"][0]["id"], 21);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (server, _publisher, _dir) = create_test_server().await;

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("batch-check-7"),
        )
        .await;

    assert_eq!(response.header("x-request-id"), "batch-check-7");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let (server, _publisher, _dir) = create_test_server().await;

    let response = server.get("/health").await;

    let id = response.header("x-request-id");
    assert_eq!(id.to_str().unwrap().len(), 36);
}
