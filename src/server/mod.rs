//! Vaidya HTTP server
//!
//! Endpoints:
//! - `/health` liveness check
//! - `/api/health`, `/api/predict`, `/api/predictions` for diabetes risk
//! - `/model-info`, `/predict` for brain tumor MRI classification

use anyhow::Result;
use axum::{middleware::from_fn, response::IntoResponse, routing::get, Json, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub mod middleware;
pub mod routes;
pub mod state;

use state::ServerState;

/// Create the main application router
pub fn create_app(state: ServerState) -> Router {
    let cors_config = state.config.cors.clone();
    let timeout_duration = Duration::from_secs(state.config.request_timeout_secs);
    let max_upload_bytes = state.config.max_upload_bytes;

    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes::tabular::create_router())
        .merge(routes::vision::create_router(max_upload_bytes))
        .layer(from_fn(middleware::logging_middleware))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(TimeoutLayer::new(timeout_duration))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // CORS must stay outermost
    if cors_config.enabled {
        app = app.layer(middleware::cors_layer(&cors_config));
    }

    app
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "vaidya",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Start the HTTP server, stopping on Ctrl-C
pub async fn start_server(addr: SocketAddr, state: ServerState) -> Result<()> {
    let app = create_app(state);

    info!("Starting Vaidya server on {}", addr);
    info!("Diabetes risk API available at http://{}/api", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
