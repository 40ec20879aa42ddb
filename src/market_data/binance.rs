// =============================================================================
// Binance Klines Source — public REST candle retrieval
// =============================================================================
//
// Fetches the trailing candle window from GET /api/v3/klines.  The endpoint is
// public, so no API key or request signing is involved.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{Candle, MarketDataSource};

/// Binance caps a single klines request at this many entries.
const MAX_KLINES_LIMIT: u32 = 1000;

/// Market data source backed by the Binance spot klines endpoint.
#[derive(Clone)]
pub struct BinanceKlineSource {
    symbol: String,
    interval: String,
    interval_minutes: u32,
    base_url: String,
    client: reqwest::Client,
}

impl BinanceKlineSource {
    /// Create a source for `symbol` at kline `interval` (e.g. "1m", "5m", "1h").
    pub fn new(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let interval = interval.into();
        let interval_minutes = interval_minutes(&interval)?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "BinanceKlineSource initialised");

        Ok(Self {
            symbol: symbol.into().to_uppercase(),
            interval,
            interval_minutes,
            base_url,
            client,
        })
    }

    /// Number of klines needed to cover `lookback_minutes`.
    fn limit_for(&self, lookback_minutes: u32) -> u32 {
        lookback_minutes
            .div_ceil(self.interval_minutes)
            .clamp(1, MAX_KLINES_LIMIT)
    }
}

#[async_trait]
impl MarketDataSource for BinanceKlineSource {
    /// GET /api/v3/klines (public — no signature required).
    #[instrument(skip(self), name = "binance::fetch_candles", fields(symbol = %self.symbol))]
    async fn fetch_candles(&self, lookback_minutes: u32) -> Result<Vec<Candle>> {
        let limit = self.limit_for(lookback_minutes);
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, self.symbol, self.interval, limit
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            anyhow::bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        let candles = parse_klines(&body)?;
        debug!(
            interval = %self.interval,
            limit,
            count = candles.len(),
            "klines fetched"
        );
        Ok(candles)
    }

    fn describe(&self) -> String {
        format!("binance {}@{}", self.symbol, self.interval)
    }
}

impl std::fmt::Debug for BinanceKlineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceKlineSource")
            .field("symbol", &self.symbol)
            .field("interval", &self.interval)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Parsing helpers
// -----------------------------------------------------------------------------

/// Convert a kline interval label ("1m", "15m", "1h", "1d", ...) to minutes.
pub fn interval_minutes(interval: &str) -> Result<u32> {
    let split = interval
        .find(|c: char| !c.is_ascii_digit())
        .with_context(|| format!("kline interval '{interval}' has no unit"))?;
    let (count, unit) = interval.split_at(split);
    let count: u32 = count
        .parse()
        .with_context(|| format!("kline interval '{interval}' has no count"))?;
    anyhow::ensure!(count > 0, "kline interval '{interval}' must be positive");

    let per_unit = match unit {
        "m" => 1,
        "h" => 60,
        "d" => 60 * 24,
        "w" => 60 * 24 * 7,
        other => anyhow::bail!("unsupported kline interval unit '{other}'"),
    };
    Ok(count * per_unit)
}

/// Parse Binance's array-of-arrays klines payload.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume, ...
///
/// Entries with fewer than six elements are skipped.
pub fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let timestamp = arr[0].as_i64().context("kline open time is not an integer")?;
        candles.push(Candle::new(
            timestamp,
            parse_str_f64(&arr[1])?,
            parse_str_f64(&arr[2])?,
            parse_str_f64(&arr[3])?,
            parse_str_f64(&arr[4])?,
            parse_str_f64(&arr[5])?,
        ));
    }
    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}
