pub mod binance;
pub mod candle;
pub mod source;

// Re-export the Candle struct for convenient access (e.g. `use crate::market_data::Candle`).
pub use binance::BinanceKlineSource;
pub use candle::{validate_window, Candle};
pub use source::MarketDataSource;
