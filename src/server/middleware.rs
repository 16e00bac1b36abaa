//! Middleware for logging, CORS and panic recovery

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, Method, Response as HttpResponse, StatusCode},
    middleware::Next,
    response::Response,
};
use std::any::Any;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::config::CorsConfig;
use crate::error::ErrorBody;

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    info!(">>> {} {}", method, uri.path());
    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        warn!("<<< {} {} {} ({:?})", status.as_u16(), method, uri.path(), duration);
    } else {
        info!("<<< {} {} {} ({:?})", status.as_u16(), method, uri.path(), duration);
    }

    response
}

/// CORS middleware configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
        .max_age(Duration::from_secs(config.max_age));

    if config.allowed_origins.iter().any(|o| o == "*") {
        // never allow credentials with a wildcard origin
        cors.allow_origin(tower_http::cors::Any).allow_credentials(false)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Turn a handler panic into the generic internal-error response.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> HttpResponse<Body> {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!("Unhandled panic in request handler: {}", detail);

    let body = serde_json::to_vec(&ErrorBody::internal()).unwrap_or_default();
    let mut response = HttpResponse::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
