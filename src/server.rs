use crate::collector::Gatherer;
use axum::{
    http::{header, Method},
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use hyper::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "hue-exporter",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus scrape endpoint; delegates to the Gatherer's render facade
async fn metrics(Extension(gatherer): Extension<Arc<Gatherer>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gatherer.render(),
    )
}

/// Create the HTTP server with the scrape and health routes
pub fn create_server(gatherer: Arc<Gatherer>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(Extension(gatherer))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Serve scrape traffic on the specified port until the server fails.
///
/// Bind failures are returned rather than panicking so the caller can retry.
pub async fn start_server(gatherer: Arc<Gatherer>, port: u16) -> hyper::Result<()> {
    let app = create_server(gatherer);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "serving metrics over HTTP");

    Server::try_bind(&addr)?
        .serve(app.into_make_service())
        .await
}
