pub mod config;
pub mod error;
pub mod snapshot;
pub mod source;
pub mod types;

pub use config::{parse_interval, Config, RunConfig};
pub use error::{Error, Result};
pub use snapshot::{Cluster, ClusterWindow, Columns, History, HistoryF32, MarketSnapshot};
pub use source::{EventSource, EVENT_QUEUE_CAPACITY};
pub use types::*;
