//! Market data endpoints: depth, trades, and service status.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::error::Error;
use crate::api::extract::QueryParams;
use crate::api::orders::TradeFill;
use crate::api::AppState;
use crate::order::book::BookLevel;
use crate::order::{Price, Qty};

#[derive(Debug, Deserialize, IntoParams)]
pub struct DepthParams {
    /// Instrument symbol to query.
    pub symbol: Option<String>,
    /// Number of levels per side. Defaults to 5.
    pub levels: Option<usize>,
}

/// One aggregated price level.
#[derive(Debug, Serialize, ToSchema)]
pub struct DepthLevel {
    pub price: Price,
    pub qty: Qty,
    pub count: usize,
}

impl From<BookLevel> for DepthLevel {
    fn from(level: BookLevel) -> Self {
        DepthLevel {
            price: level.price,
            qty: level.qty,
            count: level.count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepthResponse {
    /// Best bids, highest price first.
    pub bids: Vec<DepthLevel>,
    /// Best asks, lowest price first.
    pub asks: Vec<DepthLevel>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TradesResponse {
    pub trades: Vec<TradeFill>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: &'static str,
    /// Resting orders across all books.
    pub orders: usize,
}

/// Top-of-book depth for one instrument
#[utoipa::path(
    get,
    path = "/depth",
    params(DepthParams),
    responses(
        (status = 200, description = "Aggregated depth, best levels first", body = DepthResponse),
        (status = 400, description = "Missing or unknown symbol"),
    )
)]
pub(super) async fn depth(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<DepthParams>,
) -> Result<Json<DepthResponse>, Error> {
    let symbol = params
        .symbol
        .ok_or_else(|| Error::BadRequest("Unknown symbol".to_string()))?;
    let book = state
        .dispatcher
        .book(&symbol)
        .ok_or_else(|| Error::BadRequest("Unknown symbol".to_string()))?;

    let levels = params.levels.unwrap_or(5);
    let depth = book
        .lock()
        .map_err(|err| Error::Internal(err.to_string().into()))?
        .depth(levels);

    Ok(Json(DepthResponse {
        bids: depth.bids.into_iter().map(DepthLevel::from).collect(),
        asks: depth.asks.into_iter().map(DepthLevel::from).collect(),
    }))
}

/// Trade history
///
/// History is not retained; trades are only reported on the add-order
/// response, so this is always an empty list.
#[utoipa::path(
    get,
    path = "/trades",
    responses((status = 200, description = "Always an empty trade list", body = TradesResponse))
)]
pub(super) async fn trades() -> Json<TradesResponse> {
    Json(TradesResponse { trades: Vec::new() })
}

/// Service status
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Liveness plus total resting orders", body = StatusResponse))
)]
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        orders: state.dispatcher.total_orders(),
    })
}
