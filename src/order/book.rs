//! Price-time priority limit order book.
//!
//! Two BTreeMap ladders (bids iterated descending, asks ascending) hold one
//! [`PriceLevel`] per occupied price. Orders themselves live in a slab; each
//! level chains its orders as a doubly-linked FIFO of slab indices, and a
//! secondary id index locates an order's node in O(1) for cancel and modify.
//! The index holds lookup keys only; a level is the sole owner of its orders.
//!
//! Matching is aggressor-driven: an incoming order that crosses the opposite
//! best walks the opposite ladder best-first, filling level heads FIFO, and
//! any unfilled limit remainder is inserted as a passive order. Market
//! remainders are dropped. Trades execute at the maker's resting price.

pub mod price_level;

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use slab::Slab;
use thiserror::Error;

use crate::order::{Id, Order, OrderType, Price, Qty, Side, Timestamp};
use crate::trade::Trade;

use price_level::{OrderNode, PriceLevel};

/// Generic order-book errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Tried to look up an order that does not exist.
    #[error("could not find order with id #{0}")]
    OrderNotFound(Id),
}

/// Aggregated depth at a single price level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BookLevel {
    pub price: Price,
    /// Total open quantity at this price.
    pub qty: Qty,
    /// Number of resting orders at this price.
    pub count: usize,
}

/// A snapshot of the best price levels on both sides of the book.
#[derive(Debug, Clone)]
pub struct Depth {
    /// Best bids in descending price order.
    pub bids: Vec<BookLevel>,
    /// Best asks in ascending price order.
    pub asks: Vec<BookLevel>,
}

/// Per-trade sink invoked synchronously during matching, in generation
/// order, before `add_order` returns. Must not re-enter the book.
pub type TradeCallback = Box<dyn FnMut(&Trade) + Send>;

/// A single instrument's order book.
pub struct OrderBook {
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    orders: Slab<OrderNode>,
    /// OrderId -> slab index of the resting node.
    index: HashMap<Id, usize>,
    trade_callback: Option<TradeCallback>,
    /// Anchor for the monotonic nanosecond clock stamped into orders and
    /// trades. Timestamps are advisory; priority is insertion order.
    epoch: Instant,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    /// Create a new, empty order book.
    pub fn new() -> Self {
        OrderBook {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: Slab::new(),
            index: HashMap::new(),
            trade_callback: None,
            epoch: Instant::now(),
        }
    }

    /// Install an optional per-trade callback.
    pub fn set_trade_callback(&mut self, callback: impl FnMut(&Trade) + Send + 'static) {
        self.trade_callback = Some(Box::new(callback));
    }

    /// Accept an order: match what crosses, rest any limit remainder.
    ///
    /// Returns the trades generated, in match order. Market orders that do
    /// not fully fill never rest; the shortfall is visible only as returned
    /// trades summing to less than the order's quantity.
    pub fn add_order(&mut self, mut order: Order) -> Vec<Trade> {
        order.timestamp = self.now();
        let exec_time = order.timestamp;

        let mut trades = Vec::new();
        if self.can_match(&order) {
            self.match_order(&mut order, exec_time, &mut trades);
        }

        if !order.is_filled() && order.order_type == OrderType::Limit {
            self.insert_order(order);
        }

        trades
    }

    /// Cancel a resting order by id. Returns false if the id is unknown.
    pub fn cancel_order(&mut self, id: Id) -> bool {
        let Some(&idx) = self.index.get(&id) else {
            return false;
        };
        self.remove_resting(idx);
        true
    }

    /// Reduce a resting order to `new_qty` open units, keeping its place in
    /// the queue. Only strict reductions are allowed; `new_qty == 0` is a
    /// cancel. Returns false if the id is unknown or the change is not a
    /// strict reduction.
    pub fn modify_order(&mut self, id: Id, new_qty: Qty) -> bool {
        let Some(&idx) = self.index.get(&id) else {
            return false;
        };

        let remaining = self.orders[idx].order.remaining;
        if new_qty >= remaining {
            return false;
        }
        if new_qty == 0 {
            return self.cancel_order(id);
        }

        let side = self.orders[idx].order.side;
        let price = self.orders[idx].order.price;
        let level = match side {
            Side::Buy => self.bids.get_mut(&price).unwrap(),
            Side::Sell => self.asks.get_mut(&price).unwrap(),
        };
        level.reduce(&mut self.orders, idx, remaining - new_qty);
        true
    }

    /// Highest resting buy price, if any.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.last_key_value().map(|(price, _)| *price)
    }

    /// Lowest resting sell price, if any.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first_key_value().map(|(price, _)| *price)
    }

    /// Ask minus bid, when both sides are populated.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Up to `levels` top bid levels, best (highest) first.
    pub fn bid_depth(&self, levels: usize) -> Vec<BookLevel> {
        self.bids
            .iter()
            .rev()
            .take(levels)
            .map(|(price, level)| BookLevel {
                price: *price,
                qty: level.total_qty(),
                count: level.order_count(),
            })
            .collect()
    }

    /// Up to `levels` top ask levels, best (lowest) first.
    pub fn ask_depth(&self, levels: usize) -> Vec<BookLevel> {
        self.asks
            .iter()
            .take(levels)
            .map(|(price, level)| BookLevel {
                price: *price,
                qty: level.total_qty(),
                count: level.order_count(),
            })
            .collect()
    }

    /// Both sides of the depth ladder in one snapshot.
    pub fn depth(&self, levels: usize) -> Depth {
        Depth {
            bids: self.bid_depth(levels),
            asks: self.ask_depth(levels),
        }
    }

    /// Read-only view of a resting order.
    pub fn find_order(&self, id: Id) -> Result<&Order, Error> {
        let idx = self.index.get(&id).ok_or(Error::OrderNotFound(id))?;
        Ok(&self.orders[*idx].order)
    }

    /// Number of resting orders across both sides.
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    pub fn bid_level_count(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_level_count(&self) -> usize {
        self.asks.len()
    }

    fn now(&self) -> Timestamp {
        self.epoch.elapsed().as_nanos() as Timestamp
    }

    /// Whether an incoming order crosses the opposite best at all.
    fn can_match(&self, order: &Order) -> bool {
        if order.order_type == OrderType::Market {
            return match order.side {
                Side::Buy => !self.asks.is_empty(),
                Side::Sell => !self.bids.is_empty(),
            };
        }

        match order.side {
            Side::Buy => self.best_ask().is_some_and(|ask| order.price >= ask),
            Side::Sell => self.best_bid().is_some_and(|bid| order.price <= bid),
        }
    }

    fn crosses(taker: &Order, level_price: Price) -> bool {
        match taker.side {
            Side::Buy => taker.price >= level_price,
            Side::Sell => taker.price <= level_price,
        }
    }

    /// Walk the opposite ladder best-first, filling level heads FIFO until
    /// the taker is done or prices stop crossing.
    fn match_order(&mut self, taker: &mut Order, exec_time: Timestamp, out: &mut Vec<Trade>) {
        while taker.remaining > 0 {
            let entry = match taker.side {
                Side::Buy => self.asks.first_entry(),
                Side::Sell => self.bids.last_entry(),
            };
            let Some(mut entry) = entry else { break };

            let level_price = *entry.key();
            if taker.order_type == OrderType::Limit && !Self::crosses(taker, level_price) {
                break;
            }

            let trades = entry
                .get_mut()
                .match_against(&mut self.orders, taker, exec_time);
            if entry.get().is_empty() {
                entry.remove();
            }

            for trade in trades {
                self.retire_filled_maker(trade.maker_id);
                if let Some(callback) = self.trade_callback.as_mut() {
                    callback(&trade);
                }
                out.push(trade);
            }
        }
    }

    /// Drop a fully filled maker from the slab and the id index. Partially
    /// filled makers stay resting.
    fn retire_filled_maker(&mut self, maker_id: Id) {
        if let Some(&idx) = self.index.get(&maker_id) {
            if self.orders[idx].order.is_filled() {
                self.orders.remove(idx);
                self.index.remove(&maker_id);
            }
        }
    }

    /// Rest a limit remainder. An id matching a resting order is a replace:
    /// the resting order is cancelled first.
    fn insert_order(&mut self, order: Order) {
        if self.index.contains_key(&order.id) {
            self.cancel_order(order.id);
        }

        let id = order.id;
        let side = order.side;
        let price = order.price;
        let idx = self.orders.insert(OrderNode::new(order));
        self.index.insert(id, idx);

        let level = match side {
            Side::Buy => self
                .bids
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price)),
            Side::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price)),
        };
        level.push(&mut self.orders, idx);
    }

    /// Unlink a resting order from its level, drop the level if it became
    /// empty, and erase the order from the slab and index.
    fn remove_resting(&mut self, idx: usize) -> Order {
        let side = self.orders[idx].order.side;
        let price = self.orders[idx].order.price;

        let level = match side {
            Side::Buy => self.bids.get_mut(&price).unwrap(),
            Side::Sell => self.asks.get_mut(&price).unwrap(),
        };
        level.unlink(&mut self.orders, idx);
        if level.is_empty() {
            match side {
                Side::Buy => self.bids.remove(&price),
                Side::Sell => self.asks.remove(&price),
            };
        }

        let node = self.orders.remove(idx);
        self.index.remove(&node.order.id);
        node.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn limit(id: Id, side: Side, price: Price, qty: Qty) -> Order {
        Order::new(id, side, OrderType::Limit, price, qty)
    }

    fn market(id: Id, side: Side, qty: Qty) -> Order {
        Order::new(id, side, OrderType::Market, 0, qty)
    }

    /// Walk every level of both ladders and cross-check the structural
    /// invariants that must hold after every accepted operation.
    fn assert_invariants(book: &OrderBook) {
        let mut linked_orders = 0;
        for (side, ladder) in [(Side::Buy, &book.bids), (Side::Sell, &book.asks)] {
            for (&price, level) in ladder {
                assert!(!level.is_empty(), "empty level reachable at {price}");
                assert_eq!(level.price(), price);

                let mut qty_sum: Qty = 0;
                let mut count = 0;
                let mut cursor = level.head();
                while let Some(idx) = cursor {
                    let node = &book.orders[idx];
                    assert_eq!(node.order.side, side);
                    assert_eq!(node.order.price, price);
                    assert!(node.order.remaining > 0, "resting order with no balance");
                    assert_eq!(
                        book.index.get(&node.order.id),
                        Some(&idx),
                        "index entry missing or stale for id {}",
                        node.order.id
                    );
                    qty_sum += node.order.remaining;
                    count += 1;
                    cursor = node.next;
                }
                assert_eq!(level.total_qty(), qty_sum, "level aggregate drifted");
                assert_eq!(level.order_count(), count);
                linked_orders += count;
            }
        }
        assert_eq!(book.index.len(), linked_orders, "index size mismatch");

        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask, "book is crossed at rest: bid {bid} >= ask {ask}");
        }
    }

    #[test]
    fn simple_fill_empties_both_sides() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));
        let trades = book.add_order(limit(2, Side::Buy, 10000, 10));

        assert_eq!(trades.len(), 1, "expected one trade, got {trades:?}");
        assert_eq!(trades[0].price, 10000);
        assert_eq!(trades[0].qty, 10);
        assert_eq!(trades[0].maker_id, 1);
        assert_eq!(trades[0].taker_id, 2);
        assert_eq!(trades[0].taker_side, Side::Buy);

        assert_eq!(book.order_count(), 0);
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
        assert_invariants(&book);
    }

    #[test]
    fn partial_passive_rests_remainder() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));
        let trades = book.add_order(limit(2, Side::Buy, 10000, 20));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].qty, 10);

        assert_eq!(book.best_bid(), Some(10000));
        assert_eq!(book.best_ask(), None);
        let bids = book.bid_depth(1);
        assert_eq!(
            bids,
            vec![BookLevel {
                price: 10000,
                qty: 10,
                count: 1
            }]
        );
        assert_invariants(&book);
    }

    #[test]
    fn market_buy_sweeps_ascending_asks() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));
        book.add_order(limit(2, Side::Sell, 10100, 10));
        book.add_order(limit(3, Side::Sell, 10200, 10));

        let trades = book.add_order(market(4, Side::Buy, 25));

        assert_eq!(trades.len(), 3, "expected three trades, got {trades:?}");
        assert_eq!((trades[0].qty, trades[0].price, trades[0].maker_id), (10, 10000, 1));
        assert_eq!((trades[1].qty, trades[1].price, trades[1].maker_id), (10, 10100, 2));
        assert_eq!((trades[2].qty, trades[2].price, trades[2].maker_id), (5, 10200, 3));

        let asks = book.ask_depth(10);
        assert_eq!(
            asks,
            vec![BookLevel {
                price: 10200,
                qty: 5,
                count: 1
            }]
        );
        assert_eq!(book.find_order(3).unwrap().remaining, 5);
        assert_invariants(&book);
    }

    #[test]
    fn fifo_within_a_level() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));
        book.add_order(limit(2, Side::Sell, 10000, 10));
        book.add_order(limit(3, Side::Sell, 10000, 10));

        let trades = book.add_order(limit(4, Side::Buy, 10000, 15));

        assert_eq!(trades.len(), 2);
        assert_eq!((trades[0].maker_id, trades[0].qty), (1, 10));
        assert_eq!((trades[1].maker_id, trades[1].qty), (2, 5));

        let asks = book.ask_depth(1);
        assert_eq!(
            asks,
            vec![BookLevel {
                price: 10000,
                qty: 15,
                count: 2
            }],
            "level should hold id=2 residual plus id=3"
        );
        assert_invariants(&book);
    }

    #[test]
    fn non_crossing_orders_rest_uncrossed() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10100, 10));
        let trades = book.add_order(limit(2, Side::Buy, 10000, 10));

        assert!(trades.is_empty(), "no price overlap, got {trades:?}");
        assert_eq!(book.best_bid(), Some(10000));
        assert_eq!(book.best_ask(), Some(10100));
        assert_eq!(book.spread(), Some(100));
        assert_invariants(&book);
    }

    #[test]
    fn market_into_empty_opposite_side_is_dropped() {
        let mut book = OrderBook::new();
        let trades = book.add_order(market(1, Side::Buy, 10));

        assert!(trades.is_empty());
        assert_eq!(book.order_count(), 0, "market orders never rest");
        assert_invariants(&book);
    }

    #[test]
    fn limit_sell_crosses_equal_bid() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Buy, 10100, 10));
        let trades = book.add_order(limit(2, Side::Sell, 10100, 10));

        assert_eq!(trades.len(), 1, "equal prices cross");
        assert_eq!(trades[0].price, 10100);
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn trade_price_is_always_the_makers() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));
        // Taker is willing to pay more; execution stays at the resting price.
        let trades = book.add_order(limit(2, Side::Buy, 10500, 10));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 10000);
    }

    #[test]
    fn price_priority_before_time_priority() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10200, 10));
        book.add_order(limit(2, Side::Sell, 10000, 10));
        book.add_order(limit(3, Side::Sell, 10100, 10));

        let trades = book.add_order(limit(4, Side::Buy, 10200, 30));

        assert_eq!(trades.len(), 3);
        assert_eq!(
            trades.iter().map(|t| t.maker_id).collect::<Vec<_>>(),
            vec![2, 3, 1],
            "best price matches first regardless of arrival order"
        );
        assert_invariants(&book);
    }

    #[test]
    fn cancel_is_idempotent_and_drops_empty_levels() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Buy, 10000, 10));

        assert!(book.cancel_order(1));
        assert!(!book.cancel_order(1), "second cancel must report absent");
        assert_eq!(book.bid_level_count(), 0);
        assert_eq!(book.order_count(), 0);
        assert_invariants(&book);
    }

    #[test]
    fn cancel_unknown_id_is_refused() {
        let mut book = OrderBook::new();
        assert!(!book.cancel_order(404));
    }

    #[test]
    fn cancel_head_promotes_next_in_queue() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Buy, 10000, 2));
        book.add_order(limit(2, Side::Buy, 10000, 3));
        assert!(book.cancel_order(1));

        let trades = book.add_order(limit(3, Side::Sell, 10000, 2));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].maker_id, 2, "second arrival becomes the head");
        assert_invariants(&book);
    }

    #[test]
    fn modify_only_accepts_strict_reductions() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Buy, 10000, 10));

        assert!(!book.modify_order(1, 10), "equal remaining is not a reduction");
        assert!(!book.modify_order(1, 15), "increase is refused");
        assert!(!book.modify_order(2, 5), "unknown id is refused");

        assert!(book.modify_order(1, 4));
        assert_eq!(book.find_order(1).unwrap().remaining, 4);
        assert_eq!(book.bid_depth(1)[0].qty, 4);
        assert_invariants(&book);
    }

    #[test]
    fn modify_to_zero_cancels() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));

        assert!(book.modify_order(1, 0));
        assert_eq!(book.order_count(), 0);
        assert_eq!(book.ask_level_count(), 0);
        assert_invariants(&book);
    }

    #[test]
    fn modify_keeps_time_priority() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));
        book.add_order(limit(2, Side::Sell, 10000, 10));
        assert!(book.modify_order(1, 3));

        let trades = book.add_order(limit(3, Side::Buy, 10000, 5));
        assert_eq!(trades.len(), 2);
        assert_eq!(
            (trades[0].maker_id, trades[0].qty),
            (1, 3),
            "reduced order keeps its place at the head"
        );
        assert_eq!((trades[1].maker_id, trades[1].qty), (2, 2));
        assert_invariants(&book);
    }

    #[test]
    fn id_collision_replaces_resting_order() {
        let mut book = OrderBook::new();
        book.add_order(limit(7, Side::Buy, 10000, 10));
        book.add_order(limit(7, Side::Buy, 10100, 5));

        assert_eq!(book.order_count(), 1);
        let order = book.find_order(7).unwrap();
        assert_eq!(order.price, 10100, "replacement supersedes the old record");
        assert_eq!(order.remaining, 5);
        assert_eq!(book.bid_level_count(), 1, "old level must be gone");
        assert_invariants(&book);
    }

    #[test]
    fn conservation_across_fills_and_cancel() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));

        let mut filled: Qty = 0;
        filled += book
            .add_order(limit(2, Side::Buy, 10000, 4))
            .iter()
            .map(|t| t.qty)
            .sum::<Qty>();
        filled += book
            .add_order(limit(3, Side::Buy, 10000, 3))
            .iter()
            .map(|t| t.qty)
            .sum::<Qty>();

        let unfilled = book.find_order(1).unwrap().remaining;
        assert!(book.cancel_order(1));
        assert_eq!(filled + unfilled, 10, "fills plus cancelled balance must equal the original qty");
        assert_invariants(&book);
    }

    #[test]
    fn find_order_signals_not_found() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Buy, 10000, 10));

        assert_eq!(book.find_order(1).unwrap().id, 1);
        assert!(matches!(book.find_order(2), Err(Error::OrderNotFound(2))));
    }

    #[test]
    fn depth_is_best_first_and_bounded() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Buy, 10000, 1));
        book.add_order(limit(2, Side::Buy, 10100, 2));
        book.add_order(limit(3, Side::Buy, 10200, 3));
        book.add_order(limit(4, Side::Sell, 10300, 4));
        book.add_order(limit(5, Side::Sell, 10400, 5));

        let bids = book.bid_depth(2);
        assert_eq!(bids.iter().map(|l| l.price).collect::<Vec<_>>(), vec![10200, 10100]);
        let asks = book.ask_depth(10);
        assert_eq!(asks.iter().map(|l| l.price).collect::<Vec<_>>(), vec![10300, 10400]);
        assert!(book.bid_depth(0).is_empty());
    }

    #[test]
    fn callback_sees_trades_in_generation_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut book = OrderBook::new();
        book.set_trade_callback(move |trade: &Trade| {
            sink.lock().unwrap().push((trade.maker_id, trade.qty));
        });

        book.add_order(limit(1, Side::Sell, 10000, 10));
        book.add_order(limit(2, Side::Sell, 10100, 10));
        let trades = book.add_order(market(3, Side::Buy, 15));

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(1, 10), (2, 5)]);
        assert_eq!(
            trades.iter().map(|t| (t.maker_id, t.qty)).collect::<Vec<_>>(),
            *seen,
            "callback order must match the returned trade order"
        );
    }

    #[test]
    fn timestamps_are_monotonic_across_adds() {
        let mut book = OrderBook::new();
        book.add_order(limit(1, Side::Sell, 10000, 10));
        let t1 = book.find_order(1).unwrap().timestamp;
        let trades = book.add_order(limit(2, Side::Buy, 10000, 5));
        assert!(trades[0].timestamp >= t1);
    }
}
