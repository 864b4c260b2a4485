//! Per-instrument book ownership and routing.
//!
//! The dispatcher creates one [`OrderBook`] per registered symbol at startup
//! and routes symbol-qualified operations to it by exact string match. There
//! is no cross-book logic: an order for one symbol can never interact with
//! another symbol's book. Each book sits behind its own mutex, which is what
//! serializes operations on it; handlers lock one book at a time.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::instrument::InstrumentRegistry;
use crate::order::book::OrderBook;
use crate::order::Id;

/// Owns one order book per instrument symbol.
pub struct BookDispatcher {
    books: HashMap<String, Mutex<OrderBook>>,
}

impl BookDispatcher {
    /// Create one book per symbol in the registry. Every book gets a trade
    /// callback that logs executions; nothing is retained.
    pub fn new(registry: &InstrumentRegistry) -> Self {
        let mut books = HashMap::new();
        for symbol in registry.all_symbols() {
            let mut book = OrderBook::new();
            let tag = symbol.to_string();
            book.set_trade_callback(move |trade| {
                debug!(
                    symbol = %tag,
                    maker = trade.maker_id,
                    taker = trade.taker_id,
                    price = trade.price,
                    qty = trade.qty,
                    "trade executed"
                );
            });
            books.insert(symbol.to_string(), Mutex::new(book));
        }
        BookDispatcher { books }
    }

    /// The book for a symbol, if the symbol is registered.
    pub fn book(&self, symbol: &str) -> Option<&Mutex<OrderBook>> {
        self.books.get(symbol)
    }

    /// Cancel by id alone: probe every book in turn until one owns the id.
    pub fn cancel(&self, id: Id) -> bool {
        self.books
            .values()
            .any(|book| book.lock().unwrap().cancel_order(id))
    }

    /// Total resting orders across all books.
    pub fn total_orders(&self) -> usize {
        self.books
            .values()
            .map(|book| book.lock().unwrap().order_count())
            .sum()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }
}
