use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, Error, EventSource, SourceKind};
use engine::{BinanceHistory, BinanceStream, HistoryFile, Recorder, Runner};
use strategy::{build_strategy, StrategyFileConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid configuration")?;
    info!(
        symbol = %cfg.run.symbol,
        source = %cfg.source,
        period = %cfg.interval,
        window = cfg.run.window_size,
        "retrade starting"
    );

    // ── Strategy ──────────────────────────────────────────────────────────────
    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path)?;
    let strategy = build_strategy(&strategy_file.strategy)?;

    // ── Event source ──────────────────────────────────────────────────────────
    let source: Arc<dyn EventSource> = match cfg.source {
        SourceKind::File => Arc::new(HistoryFile::new(&cfg.history_path)),
        SourceKind::BinanceHistory => Arc::new(BinanceHistory::new(cfg.testnet, &cfg.interval)?),
        SourceKind::BinanceLive => Arc::new(BinanceStream::new(cfg.testnet)),
    };
    let source: Arc<dyn EventSource> = match &cfg.record_path {
        Some(path) => {
            if cfg.source == SourceKind::BinanceLive {
                warn!("Live streams carry no bars; the recording will stay empty");
            }
            Arc::new(Recorder::new(source, path))
        }
        None => source,
    };

    // ── Shutdown ──────────────────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, cancelling run");
                cancel.cancel();
            }
        });
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    let runner = Runner::new(source);
    let result = match runner.run(strategy.as_ref(), &cfg.run, cancel).await {
        Ok(result) => result,
        Err(Error::Cancelled) => {
            info!("Run cancelled before completion; no report");
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "Backtest failed");
            return Err(e.into());
        }
    };

    // ── Report ────────────────────────────────────────────────────────────────
    let summary = result.summary(cfg.run.starting_account);
    info!(
        strategy = %strategy.name(),
        round_trips = summary.round_trips,
        final_equity = %summary.final_equity,
        return_fraction = %summary.return_fraction.round_dp(4),
        pool = %summary.pool,
        open_position = summary.open_position,
        "Backtest complete"
    );

    let report = serde_json::json!({
        "strategy": strategy.name(),
        "summary": summary,
        "result": result,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
