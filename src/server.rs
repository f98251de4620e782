//! HTTP server assembly: routes, CORS, shared state

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::chat::handler;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
}

pub fn router(config: AppConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        http: reqwest::Client::new(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(handler::chat).options(handler::preflight))
        .route(
            "/api/research",
            post(handler::research).options(handler::preflight),
        )
        .with_state(state)
        .layer(cors)
}

pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "macrochat backend listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
