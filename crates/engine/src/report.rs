use rust_decimal::Decimal;
use serde::Serialize;

use common::Side;

use crate::state::Execution;

/// One executed buy or sell at the last sealed close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fill {
    pub time: i64,
    pub price: Decimal,
}

/// Tradable account right after a sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EquityPoint {
    pub time: i64,
    pub account: Decimal,
}

/// Append-only record of executions during a run.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    buys: Vec<Fill>,
    sells: Vec<Fill>,
    equity: Vec<EquityPoint>,
}

impl Ledger {
    pub(crate) fn record(&mut self, execution: Execution) {
        match execution {
            Execution::Buy { time, price } => self.buys.push(Fill { time, price }),
            Execution::Sell {
                time,
                price,
                account,
            } => {
                self.sells.push(Fill { time, price });
                self.equity.push(EquityPoint { time, account });
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buys.len() + self.sells.len()
    }

    pub(crate) fn into_result(
        self,
        account: Decimal,
        pool: Decimal,
        side: Side,
        decisions: u64,
    ) -> RunResult {
        RunResult {
            equity_curve: self.equity,
            buys: self.buys,
            sells: self.sells,
            pool,
            account,
            side,
            decisions,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub equity_curve: Vec<EquityPoint>,
    pub buys: Vec<Fill>,
    pub sells: Vec<Fill>,
    /// Profit skimmed above the capital limit.
    pub pool: Decimal,
    /// Final tradable balance; base quantity when `side` is `AwaitingSell`.
    pub account: Decimal,
    pub side: Side,
    pub decisions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub round_trips: usize,
    pub final_equity: Decimal,
    /// `(final_equity - starting_account) / starting_account`, zero for an empty account.
    pub return_fraction: Decimal,
    pub pool: Decimal,
    pub open_position: bool,
}

impl RunResult {
    /// Held base quantity is not marked to market: with an open position
    /// the last realized equity stands in for it.
    pub fn summary(&self, starting_account: Decimal) -> Summary {
        let open_position = self.side == Side::AwaitingSell;
        let realized = if open_position {
            self.equity_curve
                .last()
                .map_or(starting_account, |p| p.account)
        } else {
            self.account
        };
        let final_equity = realized + self.pool;
        let return_fraction = (final_equity - starting_account)
            .checked_div(starting_account)
            .unwrap_or(Decimal::ZERO);

        Summary {
            round_trips: self.sells.len(),
            final_equity,
            return_fraction,
            pool: self.pool,
            open_position,
        }
    }
}
