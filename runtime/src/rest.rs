//! HTTP REST API.
//!
//! Every `/rentals` request is an independent acquisition run with its own
//! browser and scratch directories.

use crate::acquire::Acquisition;
use crate::dates::parse_target_dates;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the axum Router with all REST endpoints.
pub fn router(acquisition: Arc<Acquisition>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/rentals", get(rentals))
        .layer(cors)
        .with_state(acquisition)
}

/// Serve the REST API until the process is stopped.
pub async fn serve(addr: SocketAddr, acquisition: Arc<Acquisition>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{addr}");
    axum::serve(listener, router(acquisition)).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /rentals?dates=2025-12-10,2025-12-15&dates=2025-12-20`
async fn rentals(
    State(acquisition): State<Arc<Acquisition>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let raw: Vec<&str> = params
        .iter()
        .filter(|(k, _)| k == "dates")
        .map(|(_, v)| v.as_str())
        .collect();
    let dates = parse_target_dates(&raw);
    if dates.is_empty() {
        return detail(
            StatusCode::BAD_REQUEST,
            "no valid dates given (expected dates=YYYY-MM-DD)".to_string(),
        );
    }

    // Detached so a dropped request still closes the browser and cleans up.
    let run = tokio::spawn(async move { acquisition.run(&dates).await });
    match run.await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => {
            tracing::error!("rentals request failed: {e}");
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            tracing::error!("rentals task failed: {e}");
            detail(StatusCode::INTERNAL_SERVER_ERROR, format!("acquisition task failed: {e}"))
        }
    }
}

fn detail(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}
