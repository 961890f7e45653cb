//! HTTP server for image cache endpoints
//!
//! Provides /health, /resolve, /image, /prefetch and the cache
//! invalidation endpoints.

use crate::types::{
    HealthResponse, PrefetchRequest, PrefetchResponse, ResolveResponse, UrlQuery,
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use image_file_cache::ImageCache;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use url::Url;

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: ImageCache,
    pub prefetch_concurrency: usize,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: ImageCache, prefetch_concurrency: usize) -> Self {
        Self {
            cache,
            prefetch_concurrency,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/resolve", get(resolve))
        .route("/image", get(get_image))
        .route("/prefetch", post(prefetch))
        .route("/cache", delete(clear_cache))
        .route("/cache/entry", delete(invalidate_entry))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.cache.stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
    })
}

/// Resolve a source URL to a local file URI, or echo it back uncached
async fn resolve(
    State(state): State<SharedState>,
    Query(query): Query<UrlQuery>,
) -> Json<ResolveResponse> {
    let uri = state.cache.resolve(query.url.as_deref()).await;
    Json(ResolveResponse { uri })
}

/// Serve image bytes from the cache, redirecting to the source on failure.
///
/// Only `http` and `https` sources are fetched or redirected to. The
/// `Content-Type` follows the cached file's extension, so sources outside the
/// jpg/jpeg/png/gif allow-list (`.webp`, no extension) are served as
/// `image/jpeg`.
async fn get_image(State(state): State<SharedState>, Query(query): Query<UrlQuery>) -> Response {
    let url = match query.url.filter(|u| !u.is_empty()) {
        Some(url) => url,
        None => return missing_url(),
    };

    if !is_http_url(&url) {
        warn!(url = %url, "Rejected non-http image source");
        return bad_request("Unsupported url scheme");
    }

    let image = match state.cache.fetch(&url).await {
        Ok(image) => image,
        Err(e) => {
            warn!(url = %url, error = %e, "Failed to cache image, redirecting to source");
            return Redirect::temporary(&url).into_response();
        }
    };

    let data = match tokio::fs::read(&image.path).await {
        Ok(data) => data,
        Err(e) => {
            warn!(url = %url, path = ?image.path, error = %e, "Failed to read cached image");
            return Redirect::temporary(&url).into_response();
        }
    };

    let cache_header = if image.from_cache { "HIT" } else { "MISS" };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, image.extension.content_type())
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .header("X-Cache", cache_header)
        .body(Body::from(data))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Warm the cache for a batch of URLs
async fn prefetch(
    State(state): State<SharedState>,
    Json(request): Json<PrefetchRequest>,
) -> Json<PrefetchResponse> {
    // Empty entries are skipped by the cache, so they are not counted
    let requested = request.urls.iter().filter(|u| !u.is_empty()).count();
    let cached = state
        .cache
        .prefetch(request.urls, state.prefetch_concurrency)
        .await;

    Json(PrefetchResponse { requested, cached })
}

/// Drop one cached image
async fn invalidate_entry(
    State(state): State<SharedState>,
    Query(query): Query<UrlQuery>,
) -> Response {
    match query.url.filter(|u| !u.is_empty()) {
        Some(url) => {
            state.cache.invalidate(&url).await;
            StatusCode::NO_CONTENT.into_response()
        }
        None => missing_url(),
    }
}

/// Drop every cached image
async fn clear_cache(State(state): State<SharedState>) -> StatusCode {
    state.cache.clear().await;
    StatusCode::NO_CONTENT
}

fn missing_url() -> Response {
    bad_request("Missing url parameter")
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
