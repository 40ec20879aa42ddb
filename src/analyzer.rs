// =============================================================================
// Series Analyzer — one full indicator pass over a candle window
// =============================================================================
//
// Takes the trailing candle window, runs every indicator over it, and merges
// the results per candle into `EnrichedCandle` records.  Output length always
// equals input length and input order is preserved.  Nothing is carried
// between passes: every call recomputes from scratch.
//
// Empty or malformed windows produce an empty result instead of an error so
// that the broadcast loop never has to deal with a crash in the math.
// =============================================================================

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::indicators::{
    calculate_bollinger, calculate_dmi_adx, calculate_macd, calculate_sma, directional_signals,
    signals::DEFAULT_ADX_THRESHOLD,
};
use crate::market_data::{validate_window, Candle, MarketDataSource};
use crate::types::Signal;

pub const SMA_WINDOW: usize = 20;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const MACD_SHORT_WINDOW: usize = 12;
pub const MACD_LONG_WINDOW: usize = 26;
pub const DMI_WINDOW: usize = 14;

/// A candle plus every indicator value computed at its index.
///
/// Field names are the wire format consumed by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCandle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub macd: Option<f64>,
    #[serde(rename = "plusDI")]
    pub plus_di: Option<f64>,
    #[serde(rename = "minusDI")]
    pub minus_di: Option<f64>,
    pub adx: Option<f64>,
    pub sma20: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
}

/// Result of one analysis pass, one record per input candle.
pub type AnalysisResult = Vec<EnrichedCandle>;

/// Stateless orchestrator for a single indicator pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesAnalyzer;

impl SeriesAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Fetch the trailing window from `source` and analyse it.
    ///
    /// Upstream failures are returned to the caller; a fetched window that is
    /// empty or malformed yields `Ok` with an empty result.
    pub async fn run(
        &self,
        source: &dyn MarketDataSource,
        lookback_minutes: u32,
    ) -> Result<AnalysisResult> {
        let candles = source.fetch_candles(lookback_minutes).await?;
        debug!(
            source = %source.describe(),
            count = candles.len(),
            "candle window fetched"
        );
        Ok(self.analyze(&candles))
    }

    /// Compute every indicator over `candles` and merge them per index.
    pub fn analyze(&self, candles: &[Candle]) -> AnalysisResult {
        if candles.is_empty() {
            return Vec::new();
        }
        if let Err(e) = validate_window(candles) {
            warn!(error = %e, count = candles.len(), "rejecting malformed candle window");
            return Vec::new();
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let sma = calculate_sma(&closes, SMA_WINDOW);
        let bands = calculate_bollinger(&closes, BOLLINGER_WINDOW, BOLLINGER_STD_DEV);
        let macd = calculate_macd(&closes, MACD_SHORT_WINDOW, MACD_LONG_WINDOW);
        let dmi = calculate_dmi_adx(candles, DMI_WINDOW);

        candles
            .iter()
            .enumerate()
            .map(|(i, c)| EnrichedCandle {
                timestamp: c.timestamp,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
                macd: macd.get(i).copied().filter(|v| v.is_finite()),
                plus_di: at(&dmi.plus_di, i),
                minus_di: at(&dmi.minus_di, i),
                adx: at(&dmi.adx, i),
                sma20: at(&sma, i),
                bb_middle: at(&bands.middle, i),
                bb_upper: at(&bands.upper, i),
                bb_lower: at(&bands.lower, i),
            })
            .collect()
    }
}

/// Directional signal of the most recent record in `result`, if any.
pub fn latest_signal(result: &[EnrichedCandle]) -> Option<Signal> {
    let plus: Vec<Option<f64>> = result.iter().map(|c| c.plus_di).collect();
    let minus: Vec<Option<f64>> = result.iter().map(|c| c.minus_di).collect();
    let adx: Vec<Option<f64>> = result.iter().map(|c| c.adx).collect();
    directional_signals(&plus, &minus, &adx, DEFAULT_ADX_THRESHOLD)
        .last()
        .copied()
}

/// Missing indices resolve to `None`.
fn at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten()
}
