use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use common::{Error, Result};

/// Strategy config file (TOML).
///
/// Example `config/strategy.toml`:
/// ```toml
/// [strategy]
/// type = "macd"
/// name = "Cross Moving Averages"
///
/// [strategy.params]
/// fast_buy = 12
/// slow_buy = 26
/// fast_sell = 8
/// slow_sell = 17
/// signal = 9
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy type identifier: "macd" or "rsi".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Human-readable name shown in logs and the report.
    pub name: String,
    /// Indicator-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

impl StrategyFileConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read strategy config at '{path}': {e}"))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("strategy config at '{path}': {e}")))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}
