use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wikidex::{IndexError, SearchEngine};

pub const MAX_RESULTS: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub article_id: u32,
    pub offset: u64,
    pub term_frequency: f32,
    pub excerpt: Option<String>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub document_count: u64,
    pub num_partitions: u32,
    pub num_terms: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
}

pub type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.to_string() })))
}

fn index_error(e: IndexError) -> ApiError {
    let status = if e.is_query_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
    api_error(status, e)
}

pub fn open_engine(index_dir: &str, collection: &str) -> Result<SearchEngine> {
    Ok(SearchEngine::open(index_dir, collection)?)
}

pub fn build_app(index_dir: String, collection: String) -> Result<Router> {
    // Catalog is loaded once and shared read-only by every request.
    let engine = open_engine(&index_dir, &collection)?;
    let app_state = AppState { engine: Arc::new(engine) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/article/:offset", get(article_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, MAX_RESULTS);
    let engine = state.engine.clone();
    let q = params.q.clone();
    let results = tokio::task::spawn_blocking(move || engine.query(&q, k))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .map_err(index_error)?;

    let hits = results
        .hits
        .into_iter()
        .map(|hit| {
            let (excerpt, error) = match hit.excerpt {
                Ok(text) => (Some(text), None),
                Err(e) => (None, Some(e.to_string())),
            };
            SearchHit { article_id: hit.article_id, offset: hit.article_offset, term_frequency: hit.term_frequency, excerpt, error }
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, total_hits = results.total_hits, "search served");
    Ok(Json(SearchResponse {
        query: params.q,
        took_ms: elapsed.as_millis(),
        took_s: elapsed.as_secs_f64(),
        total_hits: results.total_hits,
        results: hits,
    }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let catalog = state.engine.catalog();
    Json(StatsResponse {
        document_count: catalog.document_count(),
        num_partitions: catalog.num_partitions(),
        num_terms: catalog.num_terms(),
    })
}

pub async fn article_handler(
    State(state): State<AppState>,
    Path(offset): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let engine = state.engine.clone();
    let line = tokio::task::spawn_blocking(move || engine.collection().fetch_line(offset))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    match line {
        Ok(text) => Ok(Json(serde_json::json!({ "offset": offset, "text": text }))),
        Err(IndexError::ReadError { .. }) => Err(api_error(StatusCode::NOT_FOUND, "not found")),
        Err(e) => Err(index_error(e)),
    }
}
