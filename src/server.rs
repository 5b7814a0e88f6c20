use crate::pipeline::InvestorPipeline;
use axum::{
    extract::Query,
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use chrono::Utc;
use hyper::Server;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

const DEFAULT_MAX_PAGES: u32 = 450;
const DEFAULT_DAYS_BACK: i64 = 180;

/// Shared state for the service endpoints.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InvestorPipeline>,
    pub api_key: String,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "hillsborough-investor-scraper",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
struct InvestorQuery {
    key: Option<String>,
    max_pages: Option<u32>,
    days_back: Option<i64>,
}

fn authorized(state: &AppState, query: &InvestorQuery) -> bool {
    query.key.as_deref() == Some(state.api_key.as_str())
}

fn forbidden() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({"error": "Invalid API key"})),
    )
        .into_response()
}

/// Kick off a scrape in the background and return immediately; results land
/// in the logs. Keeps the request well under upstream proxy timeouts.
async fn investors(
    Extension(state): Extension<AppState>,
    Query(query): Query<InvestorQuery>,
) -> impl IntoResponse {
    if !authorized(&state, &query) {
        return forbidden();
    }

    let max_pages = Some(query.max_pages.unwrap_or(DEFAULT_MAX_PAGES));
    let days_back = query.days_back.unwrap_or(DEFAULT_DAYS_BACK);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        match pipeline.get_recent_investors(max_pages, days_back).await {
            Ok(summary) => info!(
                "background scrape finished with {} investors",
                summary.investors.len()
            ),
            Err(e) => error!("background scrape failed: {}", e),
        }
    });

    Json(serde_json::json!({
        "status": "running",
        "message": "Scraper started",
        "timestamp": Utc::now().to_rfc3339(),
        "note": "Check logs to see full execution output."
    }))
    .into_response()
}

/// Synchronous variant for debugging; blocks until the run completes.
async fn investors_sync(
    Extension(state): Extension<AppState>,
    Query(query): Query<InvestorQuery>,
) -> impl IntoResponse {
    if !authorized(&state, &query) {
        return forbidden();
    }

    let max_pages = Some(query.max_pages.unwrap_or(DEFAULT_MAX_PAGES));
    let days_back = query.days_back.unwrap_or(DEFAULT_DAYS_BACK);
    match state.pipeline.get_recent_investors(max_pages, days_back).await {
        Ok(summary) => Json(serde_json::json!({
            "count": summary.investors.len(),
            "investors": summary.investors,
        }))
        .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Create the HTTP router with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/investors/hillsborough", get(investors))
        .route("/investors/hillsborough/run_sync", get(investors_sync))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/");
    println!("🏠 Investors:    http://localhost:{port}/investors/hillsborough?key=YOUR_KEY");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
