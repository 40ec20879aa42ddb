use anyhow::Result;
use async_trait::async_trait;

use super::Candle;

/// Upstream provider of the trailing candle window for one instrument.
///
/// Implementations return candles oldest-first (most recent last).  Failures
/// are reported as errors and never panic; the broadcast loop turns them into
/// an error payload for subscribers.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the candles covering the last `lookback_minutes` minutes.
    async fn fetch_candles(&self, lookback_minutes: u32) -> Result<Vec<Candle>>;

    /// Short human-readable description used in logs.
    fn describe(&self) -> String;
}
