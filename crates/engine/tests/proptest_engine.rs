use proptest::prelude::*;
use rust_decimal::Decimal;

use common::{Bar, BookTicker, MarketEvent, MarketSnapshot, RunConfig, Trade};
use engine::{BacktestState, BoundedRing, Execution, PriceBarAggregator};
use strategy::Strategy as TradingStrategy;

const PERIOD: i64 = 1_000;

/// Signals from the tick number alone.
struct Parity;

impl TradingStrategy for Parity {
    fn name(&self) -> &str {
        "parity"
    }

    fn buy_signal(&self, snap: &MarketSnapshot<'_>) -> bool {
        snap.tick % 2 == 0
    }

    fn sell_signal(&self, snap: &MarketSnapshot<'_>) -> bool {
        snap.tick % 3 != 0
    }
}

fn config(window: usize, limit: Decimal) -> RunConfig {
    RunConfig {
        symbol: "TESTUSDT".into(),
        fee_buy: Decimal::new(1, 3),
        fee_sell: Decimal::new(1, 3),
        starting_account: Decimal::from(1000),
        period_ms: PERIOD,
        window_size: window,
        capital_limit: limit,
    }
}

fn price() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn quantity() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|milli| Decimal::new(milli, 3))
}

/// Events with non-decreasing timestamps.
fn event_stream() -> impl Strategy<Value = Vec<MarketEvent>> {
    let step = (0i64..2_500, 0u8..3, price(), price(), quantity(), any::<bool>());
    prop::collection::vec(step, 1..200).prop_map(|steps| {
        let mut time = 0;
        steps
            .into_iter()
            .map(|(gap, kind, a, b, qty, maker)| {
                time += gap;
                match kind {
                    0 => MarketEvent::Trade(Trade {
                        time,
                        price: a,
                        quantity: qty,
                        is_buyer_maker: maker,
                    }),
                    1 => {
                        let (low, high) = if a <= b { (a, b) } else { (b, a) };
                        MarketEvent::Bar(Bar::new(time, low, high, low, high, qty))
                    }
                    _ => MarketEvent::BookTicker(BookTicker {
                        time,
                        best_bid_price: a.min(b),
                        best_bid_qty: qty,
                        best_ask_price: a.max(b),
                        best_ask_qty: qty,
                    }),
                }
            })
            .collect()
    })
}

proptest! {
    /// After more pushes than capacity the ring holds exactly the newest `cap` values.
    #[test]
    fn ring_keeps_last_cap_in_order(
        cap in 1usize..32,
        values in prop::collection::vec(any::<i32>(), 0..128),
    ) {
        let mut ring = BoundedRing::new(cap);
        for &v in &values {
            ring.push_back_forced(v);
        }

        let expected: Vec<i32> = values.iter().rev().take(cap).rev().copied().collect();
        let mut dst = vec![0; cap];
        let n = ring.copy_into(&mut dst);

        prop_assert_eq!(ring.len(), values.len().min(cap));
        prop_assert_eq!(n, ring.len());
        prop_assert_eq!(&dst[..n], expected.as_slice());
        prop_assert_eq!(ring.full(), values.len() >= cap);
    }

    /// Every sealed bar is well-formed and its volume is the sum of its prints.
    #[test]
    fn sealed_bars_are_well_formed(
        prints in prop::collection::vec((0i64..3_000, price(), quantity()), 1..150)
    ) {
        let mut agg = PriceBarAggregator::new(PERIOD, 256);
        let mut time = 0;
        let mut open_volume = Decimal::ZERO;
        let mut sealed_volumes = Vec::new();

        for (gap, price, qty) in prints {
            time += gap;
            if agg.add(Trade::new(time, price, qty)) {
                sealed_volumes.push(open_volume);
                open_volume = Decimal::ZERO;
            }
            open_volume += qty;
        }
        if agg.flush() {
            sealed_volumes.push(open_volume);
        }

        let history = agg.history();
        prop_assert_eq!(history.len(), sealed_volumes.len());
        for i in 0..history.len() {
            let (o, h, l, c) = (history.open[i], history.high[i], history.low[i], history.close[i]);
            prop_assert!(h >= o.max(c).max(l));
            prop_assert!(l <= o.min(c).min(h));
            prop_assert!(history.volume[i] >= Decimal::ZERO);
            prop_assert_eq!(history.volume[i], sealed_volumes[i]);
        }
    }

    /// Decisions happen at strictly increasing ticks and executions alternate
    /// buy, sell, buy, ... starting with a buy.
    #[test]
    fn decisions_advance_and_sides_alternate(events in event_stream(), limit in 0i64..3_000) {
        let mut state = BacktestState::new(&config(16, Decimal::from(limit)));
        let mut decided_ticks = Vec::new();
        let mut executions = Vec::new();

        for event in &events {
            let before = state.decisions();
            state.apply(event);
            if let Some(execution) = state.decide(&Parity) {
                executions.push(execution);
            }
            if state.decisions() > before {
                decided_ticks.push(state.tick());
            }
        }
        if let Some(execution) = state.finish(&Parity) {
            executions.push(execution);
        }

        prop_assert!(decided_ticks.windows(2).all(|w| w[0] < w[1]));
        for (i, execution) in executions.iter().enumerate() {
            let is_buy = matches!(execution, Execution::Buy { .. });
            prop_assert_eq!(is_buy, i % 2 == 0);
        }
        if limit > 0 {
            for execution in &executions {
                if let Execution::Sell { account, .. } = execution {
                    prop_assert!(*account <= Decimal::from(limit));
                }
            }
        }
        prop_assert!(state.pool() >= Decimal::ZERO);
    }
}
