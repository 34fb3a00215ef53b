use std::collections::HashMap;

use tracing::info;

use common::{Error, MarketSnapshot, Result};

use crate::config::StrategyConfig;
use crate::indicators::{MacdIndicator, RsiIndicator, RsiZone};
use crate::Strategy;

/// Build the configured strategy, rejecting unknown types and bad parameters.
pub fn build_strategy(cfg: &StrategyConfig) -> Result<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match cfg.strategy_type.as_str() {
        "macd" => {
            let fast_buy = param_usize(&cfg.params, "fast_buy", 12);
            let slow_buy = param_usize(&cfg.params, "slow_buy", 26);
            let fast_sell = param_usize(&cfg.params, "fast_sell", 8);
            let slow_sell = param_usize(&cfg.params, "slow_sell", 17);
            let signal = param_usize(&cfg.params, "signal", 9);
            for (fast, slow) in [(fast_buy, slow_buy), (fast_sell, slow_sell)] {
                if fast == 0 || fast >= slow {
                    return Err(Error::Config(format!(
                        "macd fast period must be in 1..slow, got fast={fast} slow={slow}"
                    )));
                }
            }
            if signal == 0 {
                return Err(Error::Config("macd signal period must be >= 1".into()));
            }
            Box::new(MacdCross::new(
                cfg.name.clone(),
                MacdIndicator::new(fast_buy, slow_buy, signal),
                MacdIndicator::new(fast_sell, slow_sell, signal),
            ))
        }
        "rsi" => {
            let period = param_usize(&cfg.params, "period", 14);
            let overbought = param_f32(&cfg.params, "overbought", 70.0);
            let oversold = param_f32(&cfg.params, "oversold", 30.0);
            if period < 2 {
                return Err(Error::Config(format!("rsi period must be >= 2, got {period}")));
            }
            if oversold >= overbought {
                return Err(Error::Config(format!(
                    "rsi oversold ({oversold}) must be below overbought ({overbought})"
                )));
            }
            Box::new(RsiBand::new(
                cfg.name.clone(),
                RsiIndicator::new(period, overbought, oversold),
            ))
        }
        other => {
            return Err(Error::Config(format!("unknown strategy type '{other}'")));
        }
    };

    info!(name = %strategy.name(), kind = %cfg.strategy_type, "Built strategy");
    Ok(strategy)
}

fn param_f32(params: &HashMap<String, toml::Value>, key: &str, default: f32) -> f32 {
    params
        .get(key)
        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        .map(|v| v as f32)
        .unwrap_or(default)
}

fn param_usize(params: &HashMap<String, toml::Value>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|v| v.as_integer())
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

// ─── Concrete strategy types ──────────────────────────────────────────────────

/// Buys when MACD is above its signal line, sells when below.
/// Buy and sell sides use separate fast/slow periods.
pub struct MacdCross {
    name: String,
    buy: MacdIndicator,
    sell: MacdIndicator,
}

impl MacdCross {
    pub fn new(name: impl Into<String>, buy: MacdIndicator, sell: MacdIndicator) -> Self {
        Self {
            name: name.into(),
            buy,
            sell,
        }
    }
}

impl Strategy for MacdCross {
    fn name(&self) -> &str {
        &self.name
    }

    fn buy_signal(&self, snap: &MarketSnapshot<'_>) -> bool {
        self.buy
            .compute(snap.price.close)
            .is_some_and(|v| v.macd > v.signal)
    }

    fn sell_signal(&self, snap: &MarketSnapshot<'_>) -> bool {
        self.sell
            .compute(snap.price.close)
            .is_some_and(|v| v.macd < v.signal)
    }
}

/// Buys oversold, sells overbought.
pub struct RsiBand {
    name: String,
    indicator: RsiIndicator,
}

impl RsiBand {
    pub fn new(name: impl Into<String>, indicator: RsiIndicator) -> Self {
        Self {
            name: name.into(),
            indicator,
        }
    }
}

impl Strategy for RsiBand {
    fn name(&self) -> &str {
        &self.name
    }

    fn buy_signal(&self, snap: &MarketSnapshot<'_>) -> bool {
        self.indicator.zone_of(&snap.price) == Some(RsiZone::Oversold)
    }

    fn sell_signal(&self, snap: &MarketSnapshot<'_>) -> bool {
        self.indicator.zone_of(&snap.price) == Some(RsiZone::Overbought)
    }
}
