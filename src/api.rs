use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config;
use crate::dispatcher::BookDispatcher;
use crate::instrument::InstrumentRegistry;

mod error;
mod extract;
pub mod layers;
mod market;
mod orders;

/// Shared handler state: the immutable instrument registry plus the
/// dispatcher owning one mutex-guarded book per symbol.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<InstrumentRegistry>,
    pub dispatcher: Arc<BookDispatcher>,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Quern Matching Engine API", version = "1.0.0"),
    paths(
        orders::place_order,
        orders::cancel_order,
        market::depth,
        market::trades,
        market::status,
    )
)]
pub struct ApiDoc;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to setup Prometheus recorder: {0}")]
    PrometheusSetup(#[from] metrics_exporter_prometheus::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The request-routing core, shared between the server and tests.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/orders",
            post(orders::place_order).delete(orders::cancel_order),
        )
        .route("/depth", get(market::depth))
        .route("/trades", get(market::trades))
        .route("/status", get(market::status))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}

/// Bind and serve until the cancellation token fires; in-flight requests
/// complete before shutdown.
pub async fn start(
    cfg: &config::ApiConfig,
    state: AppState,
    cancellation_token: CancellationToken,
) -> Result<(), ApiError> {
    let prom_handle = PrometheusBuilder::new().install_recorder()?;
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/metrics", get(|| async move { prom_handle.render() }))
        .merge(router(state))
        .layer(layers::cors())
        .layer(axum_metrics::MetricLayer::default())
        .layer(layers::tracing())
        .layer(PropagateRequestIdLayer::new(
            layers::REQUEST_ID_HEADER.clone(),
        ))
        .layer(SetRequestIdLayer::new(
            layers::REQUEST_ID_HEADER.clone(),
            layers::MakeRequestUuid,
        ));

    let listener = tokio::net::TcpListener::bind((cfg.host.clone(), cfg.port)).await?;
    info!(host = %cfg.host, port = cfg.port, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
        })
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}
