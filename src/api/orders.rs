//! Order entry endpoints: add and cancel.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::Error;
use crate::api::extract::JsonBody;
use crate::api::AppState;
use crate::order::{self, Order, OrderType, Side};
use crate::trade::Trade;

/// Body of an add-order request. Every field is optional; absent fields
/// fall back to the zero value, and unrecognized side/type codes degrade to
/// Buy/Market respectively.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub symbol: String,
    /// 1 = Buy, -1 = Sell. Anything other than -1 is treated as Buy.
    #[serde(default)]
    pub side: i64,
    /// Fixed-point limit price. Ignored for market orders.
    #[serde(default)]
    pub price: order::Price,
    #[serde(default)]
    pub qty: order::Qty,
    #[serde(default)]
    pub id: order::Id,
    /// 1 = Limit, 2 = Market. Anything other than 1 is treated as Market.
    #[serde(default, rename = "type")]
    pub order_type: i64,
}

impl From<&PlaceOrderRequest> for Order {
    fn from(req: &PlaceOrderRequest) -> Self {
        let side = if req.side == -1 { Side::Sell } else { Side::Buy };
        let order_type = if req.order_type == 1 {
            OrderType::Limit
        } else {
            OrderType::Market
        };
        Order::new(req.id, side, order_type, req.price, req.qty)
    }
}

/// One execution as reported back to the order's submitter.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TradeFill {
    pub price: order::Price,
    pub qty: order::Qty,
    pub maker_id: order::Id,
    pub taker_id: order::Id,
}

impl From<&Trade> for TradeFill {
    fn from(trade: &Trade) -> Self {
        TradeFill {
            price: trade.price,
            qty: trade.qty,
            maker_id: trade.maker_id,
            taker_id: trade.taker_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceOrderResponse {
    pub status: &'static str,
    pub trades: Vec<TradeFill>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub id: order::Id,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelOrderResponse {
    pub status: &'static str,
}

/// Place a new order
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order accepted, with any executions", body = PlaceOrderResponse),
        (status = 400, description = "Unknown symbol, off-tick price, or off-lot quantity"),
        (status = 500, description = "Internal error"),
    )
)]
pub(super) async fn place_order(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, Error> {
    let instrument = state
        .registry
        .find(&req.symbol)
        .ok_or_else(|| Error::BadRequest("Unknown symbol".to_string()))?;

    let order = Order::from(&req);
    if order.order_type == OrderType::Limit && !instrument.is_valid_price(order.price) {
        return Err(Error::BadRequest("Price not on tick".to_string()));
    }
    if !instrument.is_valid_qty(order.qty) {
        return Err(Error::BadRequest("Quantity not on lot".to_string()));
    }

    let book = state
        .dispatcher
        .book(&req.symbol)
        .ok_or_else(|| Error::BadRequest("Unknown symbol".to_string()))?;
    let trades = book
        .lock()
        .map_err(|err| Error::Internal(err.to_string().into()))?
        .add_order(order);

    Ok(Json(PlaceOrderResponse {
        status: "accepted",
        trades: trades.iter().map(TradeFill::from).collect(),
    }))
}

/// Cancel an order by id
///
/// No symbol is required: every book is probed in turn for the id.
#[utoipa::path(
    delete,
    path = "/orders",
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = CancelOrderResponse),
        (status = 404, description = "Order not found"),
    )
)]
pub(super) async fn cancel_order(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CancelOrderRequest>,
) -> Result<Json<CancelOrderResponse>, Error> {
    if state.dispatcher.cancel(req.id) {
        Ok(Json(CancelOrderResponse {
            status: "cancelled",
        }))
    } else {
        Err(Error::NotFound("Order not found".to_string()))
    }
}
