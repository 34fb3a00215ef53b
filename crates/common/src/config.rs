use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, SourceKind};

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Parameters of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Traded instrument, e.g. "BTCUSDT".
    pub symbol: String,
    /// Fraction of the account paid on every buy (e.g. 0.001 = 0.1%).
    pub fee_buy: Decimal,
    /// Fraction of the account paid on every sell.
    pub fee_sell: Decimal,
    /// Starting balance in quote currency.
    pub starting_account: Decimal,
    /// Bar and decision period in milliseconds.
    pub period_ms: i64,
    /// Number of sealed bars kept per rolling history.
    pub window_size: usize,
    /// Account ceiling after a sell; the excess goes to the pool. Zero disables skimming.
    #[serde(default)]
    pub capital_limit: Decimal,
}

impl RunConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Config("symbol must not be empty".into()));
        }
        if self.period_ms <= 0 {
            return Err(Error::Config(format!(
                "period must be positive, got {} ms",
                self.period_ms
            )));
        }
        if self.window_size == 0 {
            return Err(Error::Config("window size must be at least 1".into()));
        }
        for (name, fee) in [("buy", self.fee_buy), ("sell", self.fee_sell)] {
            if fee < Decimal::ZERO || fee >= Decimal::ONE {
                return Err(Error::Config(format!(
                    "{name} fee must be in [0, 1), got {fee}"
                )));
            }
        }
        if self.starting_account < Decimal::ZERO {
            return Err(Error::Config("starting account must not be negative".into()));
        }
        if self.capital_limit < Decimal::ZERO {
            return Err(Error::Config("capital limit must not be negative".into()));
        }
        Ok(())
    }
}

/// Process configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub run: RunConfig,

    /// Bar period as written, e.g. "1d"; also the kline interval requested from Binance.
    pub interval: String,

    // Event source
    pub source: SourceKind,
    pub history_path: String,
    pub record_path: Option<String>,
    pub testnet: bool,

    // Strategy config file path
    pub strategy_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let symbol = optional_env("RETRADE_SYMBOL").unwrap_or_else(|| "BTCUSDT".to_string());
        let interval = optional_env("RETRADE_PERIOD").unwrap_or_else(|| "1d".to_string());
        let period_ms = parse_interval(&interval)?;

        let run = RunConfig {
            fee_buy: decimal_env("RETRADE_FEE_BUY", "0.001")?,
            fee_sell: decimal_env("RETRADE_FEE_SELL", "0.001")?,
            starting_account: decimal_env("RETRADE_ACCOUNT", "1000")?,
            capital_limit: decimal_env("RETRADE_LIMIT", "0")?,
            window_size: optional_env("RETRADE_WINDOW")
                .map(|v| {
                    v.parse::<usize>().map_err(|_| {
                        Error::Config(format!("RETRADE_WINDOW must be an integer, got: '{v}'"))
                    })
                })
                .transpose()?
                .unwrap_or(1000),
            period_ms,
            symbol,
        };
        run.validate()?;

        let source = optional_env("RETRADE_SOURCE")
            .map(|v| v.parse::<SourceKind>())
            .transpose()?
            .unwrap_or(SourceKind::File);

        Ok(Config {
            interval: interval.trim().to_string(),
            history_path: optional_env("RETRADE_HISTORY_PATH")
                .unwrap_or_else(|| format!("{}.csv", run.symbol)),
            record_path: optional_env("RETRADE_RECORD_PATH"),
            testnet: optional_env("RETRADE_TESTNET")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategy.toml".to_string()),
            source,
            run,
        })
    }
}

/// Parse a Binance-style interval such as `30m` or `1d` into milliseconds.
pub fn parse_interval(s: &str) -> Result<i64> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| Error::Config(format!("interval '{s}' has no unit")))?;
    let (count, unit) = s.split_at(split);

    let count: i64 = count
        .parse()
        .map_err(|_| Error::Config(format!("interval '{s}' has no count")))?;
    let scale = match unit {
        "s" => SECOND_MS,
        "m" => MINUTE_MS,
        "h" => HOUR_MS,
        "d" => DAY_MS,
        "w" => WEEK_MS,
        other => {
            return Err(Error::Config(format!(
                "unexpected interval unit '{other}' in '{s}'"
            )))
        }
    };
    if count <= 0 {
        return Err(Error::Config(format!("interval '{s}' must be positive")));
    }
    count
        .checked_mul(scale)
        .ok_or_else(|| Error::Config(format!("interval '{s}' is too long")))
}

fn decimal_env(key: &str, default: &str) -> Result<Decimal> {
    let raw = optional_env(key).unwrap_or_else(|| default.to_string());
    Decimal::from_str(raw.trim())
        .map_err(|e| Error::Config(format!("{key} must be a decimal number, got '{raw}': {e}")))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn run_config() -> RunConfig {
        RunConfig {
            symbol: "BTCUSDT".into(),
            fee_buy: dec!(0.001),
            fee_sell: dec!(0.001),
            starting_account: dec!(1000),
            period_ms: 60_000,
            window_size: 10,
            capital_limit: Decimal::ZERO,
        }
    }

    #[test]
    fn parse_interval_units() {
        assert_eq!(parse_interval("1s").unwrap(), 1_000);
        assert_eq!(parse_interval("30m").unwrap(), 1_800_000);
        assert_eq!(parse_interval("4h").unwrap(), 14_400_000);
        assert_eq!(parse_interval("1d").unwrap(), 86_400_000);
        assert_eq!(parse_interval("1w").unwrap(), 604_800_000);
    }

    #[test]
    fn parse_interval_rejects_garbage() {
        assert!(parse_interval("15").is_err());
        assert!(parse_interval("m").is_err());
        assert!(parse_interval("0m").is_err());
        assert!(parse_interval("3y").is_err());
        assert!(matches!(
            parse_interval("9000000000000000w"),
            Err(Error::Config(ref msg)) if msg.contains("too long")
        ));
    }

    #[test]
    fn valid_config_passes() {
        assert!(run_config().validate().is_ok());
    }

    #[test]
    fn zero_window_rejected() {
        let cfg = RunConfig {
            window_size: 0,
            ..run_config()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn zero_period_rejected() {
        let cfg = RunConfig {
            period_ms: 0,
            ..run_config()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn fee_out_of_range_rejected() {
        let cfg = RunConfig {
            fee_sell: dec!(1),
            ..run_config()
        };
        assert!(cfg.validate().is_err());

        let cfg = RunConfig {
            fee_buy: dec!(-0.01),
            ..run_config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn run_config_deserializes_with_default_limit() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{
                "symbol": "ETHUSDT",
                "fee_buy": "0.001",
                "fee_sell": "0.002",
                "starting_account": "500",
                "period_ms": 60000,
                "window_size": 20
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.capital_limit, Decimal::ZERO);
        assert_eq!(cfg.fee_sell, dec!(0.002));
    }
}
