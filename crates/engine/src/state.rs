use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use common::{BookTicker, MarketEvent, MarketSnapshot, RunConfig, Side, Trade};
use strategy::Strategy;

use crate::candle::PriceBarAggregator;
use crate::cluster::VolumeClusterTracker;

/// A simulated trade produced by a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Buy {
        time: i64,
        price: Decimal,
    },
    /// `account` is the tradable balance after fees and skimming.
    Sell {
        time: i64,
        price: Decimal,
        account: Decimal,
    },
}

/// Folds market events into rolling histories and drives the buy/sell
/// state machine, asking the strategy at most once per advancing tick.
pub struct BacktestState {
    period_ms: i64,
    fee_buy: Decimal,
    fee_sell: Decimal,
    capital_limit: Decimal,

    side: Side,
    account: Decimal,
    pool: Decimal,

    price: PriceBarAggregator,
    buy_count: PriceBarAggregator,
    sell_count: PriceBarAggregator,
    buy_volume: PriceBarAggregator,
    sell_volume: PriceBarAggregator,
    best_ask: PriceBarAggregator,
    best_bid: PriceBarAggregator,
    clusters: VolumeClusterTracker,

    tick: i64,
    finished_tick: Option<i64>,
    pending: bool,
    decisions: u64,
}

impl BacktestState {
    /// `cfg` is expected to have passed [`RunConfig::validate`].
    pub fn new(cfg: &RunConfig) -> Self {
        let aggregator = || PriceBarAggregator::new(cfg.period_ms, cfg.window_size);
        Self {
            period_ms: cfg.period_ms,
            fee_buy: cfg.fee_buy,
            fee_sell: cfg.fee_sell,
            capital_limit: cfg.capital_limit,
            side: Side::AwaitingBuy,
            account: cfg.starting_account,
            pool: Decimal::ZERO,
            price: aggregator(),
            buy_count: aggregator(),
            sell_count: aggregator(),
            buy_volume: aggregator(),
            sell_volume: aggregator(),
            best_ask: aggregator(),
            best_bid: aggregator(),
            clusters: VolumeClusterTracker::new(cfg.window_size),
            tick: 0,
            finished_tick: None,
            pending: false,
            decisions: 0,
        }
    }

    /// Fold one event. Errors are terminal and handled by the caller.
    pub fn apply(&mut self, event: &MarketEvent) {
        match event {
            MarketEvent::Bar(bar) => {
                self.price.append_raw(*bar);
                self.tick = self.tick_of(bar.time);
                self.pending = true;
            }
            MarketEvent::Trade(trade) => self.on_trade(trade),
            MarketEvent::BookTicker(ticker) => self.on_book_ticker(ticker),
            MarketEvent::Error(_) => {}
        }
    }

    /// Ask the strategy if a decision is pending for a tick not yet decided.
    pub fn decide(&mut self, strategy: &dyn Strategy) -> Option<Execution> {
        if !self.pending || self.finished_tick.is_some_and(|done| self.tick <= done) {
            return None;
        }
        self.finished_tick = Some(self.tick);
        self.evaluate(strategy)
    }

    /// End of stream: while holding, seal every partial bar and give the
    /// strategy one last chance to sell, regardless of tick gating.
    pub fn finish(&mut self, strategy: &dyn Strategy) -> Option<Execution> {
        if self.side != Side::AwaitingSell {
            return None;
        }
        for aggregator in [
            &mut self.price,
            &mut self.buy_count,
            &mut self.sell_count,
            &mut self.buy_volume,
            &mut self.sell_volume,
            &mut self.best_ask,
            &mut self.best_bid,
        ] {
            aggregator.flush();
        }
        debug!(tick = self.tick, "Final sell evaluation");
        self.evaluate(strategy)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn account(&self) -> Decimal {
        self.account
    }

    pub fn pool(&self) -> Decimal {
        self.pool
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn finished_tick(&self) -> Option<i64> {
        self.finished_tick
    }

    /// Number of strategy evaluations so far.
    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    pub fn price(&self) -> &PriceBarAggregator {
        &self.price
    }

    fn tick_of(&self, time: i64) -> i64 {
        time.div_euclid(self.period_ms)
    }

    fn on_trade(&mut self, trade: &Trade) {
        self.tick = self.tick_of(trade.time);

        let volume = Trade::new(trade.time, Decimal::ZERO, trade.quantity);
        let unit = Trade::new(trade.time, Decimal::ZERO, Decimal::ONE);
        let zero = Trade::new(trade.time, Decimal::ZERO, Decimal::ZERO);

        // Buyer maker means the aggressor sold into the bid.
        let (sell_count, sell_volume, buy_count, buy_volume) = if trade.is_buyer_maker {
            (unit, volume, zero, zero)
        } else {
            (zero, zero, unit, volume)
        };
        self.sell_count.add(sell_count);
        self.sell_volume.add(sell_volume);
        self.buy_count.add(buy_count);
        self.buy_volume.add(buy_volume);

        self.clusters.accumulate(trade.price, trade.quantity);

        self.pending = self.price.add(*trade);
    }

    fn on_book_ticker(&mut self, ticker: &BookTicker) {
        self.tick = self.tick_of(ticker.time);

        self.best_ask.add(Trade::new(
            ticker.time,
            ticker.best_ask_price,
            ticker.best_ask_qty,
        ));
        // Only the bid side's boundary crossing raises a decision.
        self.pending = self.best_bid.add(Trade::new(
            ticker.time,
            ticker.best_bid_price,
            ticker.best_bid_qty,
        ));
    }

    /// Commit the tick, build a snapshot, ask the strategy and execute.
    fn evaluate(&mut self, strategy: &dyn Strategy) -> Option<Execution> {
        self.decisions += 1;

        let side = self.side;
        let snap = MarketSnapshot {
            tick: self.tick,
            price: self.price.history_f32(),
            buy_count: self.buy_count.history_f32(),
            sell_count: self.sell_count.history_f32(),
            buy_volume: self.buy_volume.history_f32(),
            sell_volume: self.sell_volume.history_f32(),
            best_ask: self.best_ask.history_f32(),
            best_bid: self.best_bid.history_f32(),
            clusters: self.clusters.commit_tick(),
        };
        let signal = match side {
            Side::AwaitingBuy => strategy.buy_signal(&snap),
            Side::AwaitingSell => strategy.sell_signal(&snap),
        };
        debug!(tick = self.tick, side = %side, signal, "Decision");

        if !signal {
            return None;
        }
        match side {
            Side::AwaitingBuy => self.buy(),
            Side::AwaitingSell => self.sell(),
        }
    }

    fn buy(&mut self) -> Option<Execution> {
        let last = self.price.last();
        let Some(account) = (self.account - self.account * self.fee_buy).checked_div(last.close)
        else {
            warn!(
                time = last.time,
                close = %last.close,
                "Buy signal skipped: no usable close price"
            );
            return None;
        };

        self.account = account;
        self.side = Side::AwaitingSell;
        info!(time = last.time, price = %last.close, quantity = %account, "Buy executed");
        Some(Execution::Buy {
            time: last.time,
            price: last.close,
        })
    }

    fn sell(&mut self) -> Option<Execution> {
        let last = self.price.last();
        let proceeds = (!last.close.is_zero())
            .then(|| (self.account - self.account * self.fee_sell).checked_mul(last.close))
            .flatten();
        let Some(mut account) = proceeds else {
            warn!(
                time = last.time,
                close = %last.close,
                "Sell signal skipped: no usable close price"
            );
            return None;
        };

        if !self.capital_limit.is_zero() && account > self.capital_limit {
            self.pool += account - self.capital_limit;
            account = self.capital_limit;
        }

        self.account = account;
        self.side = Side::AwaitingBuy;
        info!(
            time = last.time,
            price = %last.close,
            account = %account,
            pool = %self.pool,
            "Sell executed"
        );
        Some(Execution::Sell {
            time: last.time,
            price: last.close,
            account,
        })
    }
}
