pub mod config;
pub mod indicators;
pub mod registry;

pub use config::{StrategyConfig, StrategyFileConfig};
pub use registry::{build_strategy, MacdCross, RsiBand};

use common::MarketSnapshot;

/// All strategy implementations must satisfy this trait.
///
/// Signals must be a pure function of the snapshot and the strategy's own
/// parameters; the engine hands over no other state.
pub trait Strategy: Send + Sync {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// Asked once per decision tick while flat.
    fn buy_signal(&self, snap: &MarketSnapshot<'_>) -> bool;

    /// Asked once per decision tick while holding.
    fn sell_signal(&self, snap: &MarketSnapshot<'_>) -> bool;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn buy_signal(&self, snap: &MarketSnapshot<'_>) -> bool {
        (**self).buy_signal(snap)
    }

    fn sell_signal(&self, snap: &MarketSnapshot<'_>) -> bool {
        (**self).sell_signal(snap)
    }
}
