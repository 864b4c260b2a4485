use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use quern::order::book::OrderBook;
use quern::order::{Order, OrderType, Side};

fn limit(id: u64, side: Side, price: i64, qty: u32) -> Order {
    Order::new(id, side, OrderType::Limit, price, qty)
}

/// A book with `levels` ask levels of `per_level` orders each, starting at
/// price 10000 with a 100-tick gap between levels.
fn ask_heavy_book(levels: u64, per_level: u64) -> OrderBook {
    let mut book = OrderBook::new();
    let mut id = 0;
    for level in 0..levels {
        for _ in 0..per_level {
            id += 1;
            book.add_order(limit(id, Side::Sell, 10000 + (level as i64) * 100, 10));
        }
    }
    book
}

fn bench_passive_insert_and_cancel(c: &mut Criterion) {
    let mut book = ask_heavy_book(1_000, 10);

    c.bench_function("add then cancel one passive order in a deep book", |b| {
        b.iter(|| {
            book.add_order(limit(u64::MAX, Side::Buy, 9_000, 10));
            black_box(book.cancel_order(u64::MAX));
        });
    });
}

fn bench_market_sweep(c: &mut Criterion) {
    c.bench_function("market order sweeping ten ask levels", |b| {
        b.iter_batched(
            || ask_heavy_book(10, 10),
            |mut book| {
                let trades = book.add_order(Order::new(
                    u64::MAX,
                    Side::Buy,
                    OrderType::Market,
                    0,
                    10 * 10 * 10,
                ));
                black_box(trades)
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_depth_query(c: &mut Criterion) {
    let book = ask_heavy_book(1_000, 10);

    c.bench_function("top-five depth on a thousand-level book", |b| {
        b.iter(|| black_box(book.depth(5)));
    });
}

criterion_group!(
    benches,
    bench_passive_insert_and_cancel,
    bench_market_sweep,
    bench_depth_query
);
criterion_main!(benches);
