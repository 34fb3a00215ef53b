use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use common::{Error, EventSource, MarketEvent, Result, RunConfig};
use strategy::Strategy;

use crate::report::{Ledger, RunResult};
use crate::state::BacktestState;

/// Drives one strategy over one event stream.
///
/// Every run owns a fresh [`BacktestState`]; a runner can be reused for
/// several runs against the same source.
pub struct Runner {
    source: Arc<dyn EventSource>,
}

impl Runner {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self { source }
    }

    /// Fold the source's events until it closes.
    ///
    /// A source error aborts the run with [`Error::Source`]; cancellation
    /// returns [`Error::Cancelled`]. Either way the partial ledger is dropped.
    pub async fn run(
        &self,
        strategy: &dyn Strategy,
        cfg: &RunConfig,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        cfg.validate()?;

        info!(
            symbol = %cfg.symbol,
            strategy = %strategy.name(),
            period_ms = cfg.period_ms,
            window = cfg.window_size,
            "Backtest run starting"
        );

        let mut events = self.source.subscribe(&cfg.symbol, cancel.clone());
        let mut state = BacktestState::new(cfg);
        let mut ledger = Ledger::default();
        let mut seen: u64 = 0;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(seen, &ledger)),
                event = events.recv() => event,
            };
            let Some(event) = event else { break };
            seen += 1;
            if seen == 1 {
                debug!(kind = event.kind(), time = ?event.time(), "First event received");
            }

            if let MarketEvent::Error(err) = event {
                error!(events = seen, error = %err, "Event source failed, aborting run");
                return Err(Error::wrap_source(err));
            }

            state.apply(&event);
            if let Some(execution) = state.decide(strategy) {
                ledger.record(execution);
            }

            if cancel.is_cancelled() {
                return Err(cancelled(seen, &ledger));
            }
        }

        if let Some(execution) = state.finish(strategy) {
            ledger.record(execution);
        }

        info!(
            events = seen,
            decisions = state.decisions(),
            executions = ledger.len(),
            account = %state.account(),
            pool = %state.pool(),
            "Backtest run finished"
        );

        Ok(ledger.into_result(
            state.account(),
            state.pool(),
            state.side(),
            state.decisions(),
        ))
    }
}

fn cancelled(events: u64, ledger: &Ledger) -> Error {
    info!(events, executions = ledger.len(), "Backtest run cancelled");
    Error::Cancelled
}
