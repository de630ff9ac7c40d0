use crate::error::LookupError;
use crate::posts::PostStore;
use crate::resolver::Resolver;
use axum::{
    extract::{Path, Query},
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use hyper::Server;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

pub struct AppState {
    pub resolver: Resolver,
    pub posts: PostStore,
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    #[serde(default)]
    number: String,
}

fn error_response(err: &LookupError) -> impl IntoResponse {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let detail = match err {
        LookupError::Validation(_) | LookupError::Provider { .. } | LookupError::NotFound(_) => {
            err.to_string()
        }
        // Internal failures get a generic detail message.
        _ => "Internal server error".to_string(),
    };
    (status, Json(serde_json::json!({ "detail": detail })))
}

async fn lookup_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<LookupQuery>,
) -> impl IntoResponse {
    let number = query.number.trim();
    if number.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "detail": "Query parameter \"number\" is required" })),
        )
            .into_response();
    }
    match state.resolver.lookup(number).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

async fn list_posts_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match state.posts.list_posts() {
        Ok(posts) => Json(posts).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

async fn get_post_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    match state.posts.get_post(&slug) {
        Ok(post) => Json(post).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

/// Health check endpoint; reports fast-tier reachability alongside liveness.
async fn healthz(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let cache = if state.resolver.fast_cache().healthy().await {
        "ok"
    } else {
        "unavailable"
    };
    Json(serde_json::json!({ "status": "ok", "cache": cache }))
}

/// Create the HTTP router with all routes.
pub fn create_server(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/lookup", get(lookup_handler))
        .route("/posts", get(list_posts_handler))
        .route("/posts/:slug", get(get_post_handler))
        .route("/healthz", get(healthz))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port.
pub async fn start_server(
    state: Arc<AppState>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 Lookup service running on http://localhost:{port}");
    println!("🔎 Lookup:       http://localhost:{port}/lookup?number=...");
    println!("📰 Posts:        http://localhost:{port}/posts");
    println!("💚 Health check: http://localhost:{port}/healthz");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
