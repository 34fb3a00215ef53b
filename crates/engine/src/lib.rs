pub mod binance;
pub mod candle;
pub mod cluster;
pub mod history;
pub mod memory;
pub mod report;
pub mod ring;
pub mod runner;
pub mod state;

pub use binance::{BinanceHistory, BinanceStream};
pub use candle::PriceBarAggregator;
pub use cluster::VolumeClusterTracker;
pub use history::{HistoryFile, HistoryReader, HistoryWriter, Recorder};
pub use memory::VecSource;
pub use report::{EquityPoint, Fill, RunResult, Summary};
pub use ring::BoundedRing;
pub use runner::Runner;
pub use state::{BacktestState, Execution};
