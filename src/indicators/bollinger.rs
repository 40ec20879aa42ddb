// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the population standard deviation
// of the same trailing window (divide by `window`, not `window - 1`).
//
// All three bands share the SMA warm-up: `None` until a full window exists.

use super::{calculate_sma, finite, NumericSeries};

/// Index-aligned Bollinger Band series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BollingerSeries {
    pub middle: NumericSeries,
    pub upper: NumericSeries,
    pub lower: NumericSeries,
}

impl BollingerSeries {
    fn empty(len: usize) -> Self {
        Self {
            middle: vec![None; len],
            upper: vec![None; len],
            lower: vec![None; len],
        }
    }
}

/// Calculate Bollinger Bands for `closes` over a trailing `window`.
///
/// Every band has `closes.len()` entries.  A zero `window`, or a `num_std`
/// that is negative or non-finite, yields all-`None` bands.
pub fn calculate_bollinger(closes: &[f64], window: usize, num_std: f64) -> BollingerSeries {
    if window == 0 || !num_std.is_finite() || num_std < 0.0 {
        return BollingerSeries::empty(closes.len());
    }

    let middle = calculate_sma(closes, window);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    for i in (window - 1)..closes.len() {
        let Some(mean) = middle[i] else { continue };
        let slice = &closes[i + 1 - window..=i];
        let variance = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / window as f64;
        let std_dev = variance.sqrt();

        upper[i] = finite(mean + num_std * std_dev);
        lower[i] = finite(mean - num_std * std_dev);
    }

    BollingerSeries {
        middle,
        upper,
        lower,
    }
}
