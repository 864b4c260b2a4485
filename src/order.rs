//! Core order domain types.
//!
//! All monetary values are fixed-point integers: a [`Price`] is scaled by the
//! owning instrument's `price_scale` (at the typical scale of 10000, $10.52
//! is 105200). Quantities are whole units. Timestamps are nanosecond readings
//! from a monotonic clock and are only stamped into orders and trades; they
//! never participate in priority, which is insertion order within a level.

/// Fixed-point price, scaled by the owning instrument's `price_scale`.
pub type Price = i64;
/// Number of units (shares, contracts).
pub type Qty = u32;
/// Client-supplied opaque order identifier.
pub type Id = u64;
/// Nanoseconds from a monotonic clock.
pub type Timestamp = u64;

/// Which side of the book an order belongs to.
///
/// On the wire a side is encoded as `1` (Buy) or `-1` (Sell).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming order matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type. Market orders carry no usable price and never rest.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

/// A single order, either incoming (aggressor) or resting in a book.
///
/// Invariants: `remaining <= qty`; `remaining == 0` iff fully filled; a
/// resting order always has `remaining > 0`.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Id,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price; meaningless for market orders.
    pub price: Price,
    /// Original quantity at acceptance.
    pub qty: Qty,
    /// Quantity still open.
    pub remaining: Qty,
    /// Arrival time, stamped by the book on acceptance.
    pub timestamp: Timestamp,
}

impl Order {
    /// Create a new order with its full quantity open.
    pub fn new(id: Id, side: Side, order_type: OrderType, price: Price, qty: Qty) -> Self {
        Order {
            id,
            side,
            order_type,
            price,
            qty,
            remaining: qty,
            timestamp: 0,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    /// Reduce the open quantity after a fill. `amount` must not exceed
    /// `remaining`.
    pub fn fill(&mut self, amount: Qty) {
        self.remaining -= amount;
    }
}

pub mod book;
