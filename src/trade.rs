//! Trade representation produced by the matching engine.
//!
//! A trade links an aggressive (taker) order to a passive (maker) order that
//! was resting in the book. The execution price is always the maker's resting
//! price. Trades are immutable once emitted; the engine keeps no history
//! beyond what a single `add_order` call returns.

use crate::order::{Id, Price, Qty, Side, Timestamp};

/// A single execution between a taker and a maker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    /// The aggressive order that initiated matching.
    pub taker_id: Id,
    /// The passive order that was resting in the book.
    pub maker_id: Id,
    /// Side of the taker.
    pub taker_side: Side,
    /// Execution price (the maker's resting price).
    pub price: Price,
    /// Quantity traded. Always greater than zero.
    pub qty: Qty,
    /// Execution time.
    pub timestamp: Timestamp,
}
