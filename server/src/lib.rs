use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use cuimap_core::cache::RecencyCache;
use cuimap_core::{ConceptMatch, Document};
use cuimap_engine::EngineConfig;
use cuimap_fetch::FetchConfig;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub mod pipeline;

/// Shared per-process state. The cache is the only state mutated across
/// concurrent requests; every read-modify-write on it goes through the
/// mutex as a single critical section.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Mutex<RecencyCache<Vec<ConceptMatch>>>>,
    pub engine: EngineConfig,
    pub fetch: FetchConfig,
    pub http: reqwest::Client,
    /// Upper bound on concurrent engine processes per run.
    pub concurrency: usize,
}

impl AppState {
    pub fn new(cache_size: usize, concurrency: usize) -> anyhow::Result<Self> {
        Ok(Self {
            cache: Arc::new(Mutex::new(RecencyCache::new(cache_size))),
            engine: EngineConfig::from_env(),
            fetch: FetchConfig::from_env(),
            http: reqwest::Client::builder().build()?,
            concurrency: concurrency.max(1),
        })
    }
}

pub fn build_app(state: AppState) -> Router {
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

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/annotate/articles", post(annotate_articles))
        .route("/annotate/keyword/:keyword", post(annotate_keyword))
        .with_state(state)
        .layer(cors)
}

#[derive(Deserialize)]
pub struct ArticlesBody {
    pub articles: Vec<Document>,
}

#[derive(Deserialize)]
pub struct KeywordBody {
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}
fn default_use_cache() -> bool {
    true
}

type ApiError = (StatusCode, Json<Value>);

/// An internal fault surfaces as a generic 500, distinct from a successful
/// run with zero matches.
fn internal_error(context: &str, err: anyhow::Error) -> ApiError {
    tracing::error!(error = %format!("{err:#}"), "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "an error occurred while annotating, please contact the operator" })),
    )
}

pub async fn annotate_articles(
    State(state): State<AppState>,
    Json(body): Json<ArticlesBody>,
) -> Result<Json<Value>, ApiError> {
    if body.articles.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "articles must not be empty" })),
        ));
    }
    tracing::debug!(articles = body.articles.len(), "annotation request");
    match pipeline::annotate_documents(&state, body.articles).await {
        Ok(terms) => Ok(Json(json!({ "terms": terms }))),
        Err(err) => Err(internal_error("annotation run failed", err)),
    }
}

pub async fn annotate_keyword(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
    body: Option<Json<KeywordBody>>,
) -> Result<Json<Value>, ApiError> {
    let use_cache = body.map(|Json(b)| b.use_cache).unwrap_or(true);
    tracing::debug!(%keyword, use_cache, "keyword annotation request");
    match pipeline::annotate_keyword(&state, &keyword, use_cache).await {
        Ok(terms) => Ok(Json(json!({ "keyword": keyword, "terms": terms }))),
        Err(err) => Err(internal_error("keyword annotation run failed", err)),
    }
}
