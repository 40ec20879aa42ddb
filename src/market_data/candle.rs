use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV sample for one instrument and one fixed interval.
///
/// `timestamp` is the interval open time in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check that every field is a finite, non-negative number and that the
    /// high/low pair is not inverted.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            ensure!(value.is_finite(), "{name} is not a finite number: {value}");
            ensure!(value >= 0.0, "{name} is negative: {value}");
        }
        ensure!(
            self.high >= self.low,
            "high {} is below low {}",
            self.high,
            self.low
        );
        Ok(())
    }
}

/// Validate a whole candle window: every candle must pass
/// [`Candle::validate`] and timestamps must be non-decreasing.
///
/// The error names the offending index.
pub fn validate_window(candles: &[Candle]) -> Result<()> {
    for (idx, candle) in candles.iter().enumerate() {
        candle
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid candle at index {idx}: {e}"))?;
    }
    if let Some(idx) = candles
        .windows(2)
        .position(|pair| pair[1].timestamp < pair[0].timestamp)
    {
        anyhow::bail!(
            "candle timestamps out of order at index {}: {} < {}",
            idx + 1,
            candles[idx + 1].timestamp,
            candles[idx].timestamp
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64, close: f64) -> Candle {
        Candle::new(ts, close, close + 1.0, close - 1.0, close, 10.0)
    }

    #[test]
    fn valid_window_passes() {
        let candles: Vec<Candle> = (0..60).map(|i| sample(i * 60_000, 100.0 + i as f64)).collect();
        assert!(validate_window(&candles).is_ok());
        assert!(validate_window(&[]).is_ok());
    }

    #[test]
    fn nan_field_is_rejected() {
        let mut candles = vec![sample(0, 100.0), sample(60_000, 101.0)];
        candles[1].close = f64::NAN;
        let err = validate_window(&candles).unwrap_err().to_string();
        assert!(err.contains("index 1"), "{err}");
        assert!(err.contains("close"), "{err}");
    }

    #[test]
    fn negative_volume_is_rejected() {
        let mut candle = sample(0, 100.0);
        candle.volume = -1.0;
        assert!(candle.validate().is_err());
    }

    #[test]
    fn inverted_high_low_is_rejected() {
        let candle = Candle::new(0, 10.0, 9.0, 11.0, 10.0, 1.0);
        assert!(candle.validate().is_err());
    }

    #[test]
    fn out_of_order_timestamps_are_rejected() {
        let candles = vec![sample(120_000, 100.0), sample(60_000, 101.0)];
        let err = validate_window(&candles).unwrap_err().to_string();
        assert!(err.contains("out of order"), "{err}");
    }

    #[test]
    fn candle_serialises_with_plain_field_names() {
        let json = serde_json::to_value(sample(1_700_000_000_000, 5.0)).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
        assert_eq!(json["close"], 5.0);
    }
}
