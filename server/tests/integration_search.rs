use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;
use wikidex::job::build_index;

/// Collection with articles {cat, dog}, {dog}, {cat}; returns (index, collection).
fn build_tiny_index(dir: &Path) -> (String, String) {
    let collection = dir.join("collection.tsv");
    fs::write(&collection, "1\tcat dog\n2\tdog\n3\tcat\n").unwrap();
    let index = dir.join("index");
    build_index(&collection, &index, 2).unwrap();
    (index.to_string_lossy().to_string(), collection.to_string_lossy().to_string())
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn app(dir: &Path) -> Router {
    let (index, collection) = build_tiny_index(dir);
    server::build_app(index, collection).unwrap()
}

fn result_ids(json: &Value) -> Vec<u64> {
    json["results"].as_array().unwrap().iter().map(|r| r["article_id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn and_query_returns_intersection() {
    let dir = tempdir().unwrap();
    let (status, body) = call(app(dir.path()), "/search?q=cat%20AND%20dog").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result_ids(&json), vec![1]);
    assert_eq!(json["results"][0]["excerpt"], "1\tcat dog");
    assert_eq!(json["results"][0]["offset"], 0);
}

#[tokio::test]
async fn or_query_is_capped_in_id_order() {
    let dir = tempdir().unwrap();
    let (status, body) = call(app(dir.path()), "/search?q=cat%20OR%20dog&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 3);
    assert_eq!(result_ids(&json), vec![1, 2]);
}

#[tokio::test]
async fn missing_term_is_empty() {
    let dir = tempdir().unwrap();
    let (status, body) = call(app(dir.path()), "/search?q=missingterm").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 0);
    assert!(result_ids(&json).is_empty());
}

#[tokio::test]
async fn malformed_query_is_bad_request() {
    let dir = tempdir().unwrap();
    let (status, body) = call(app(dir.path()), "/search?q=AND%20cat").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("malformed query"));
}

#[tokio::test]
async fn stats_and_article_endpoints() {
    let dir = tempdir().unwrap();
    let router = app(dir.path());

    let (status, body) = call(router.clone(), "/stats").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["num_partitions"], 2);
    assert_eq!(json["num_terms"], 2);

    let (status, body) = call(router.clone(), "/article/10").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["text"], "2\tdog");

    let (status, _) = call(router, "/article/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
