pub mod rest;
pub mod stream;

pub use rest::BinanceHistory;
pub use stream::BinanceStream;
