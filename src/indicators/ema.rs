// =============================================================================
// Exponential Moving Average (EMA) and MACD
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (window + 1)
//   EMA_0      = close_0
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The series is seeded with the first close rather than an SMA, so it is
// full-length with no warm-up.  MACD inherits that: it is the per-index
// difference of a short and a long EMA and has no `None` entries.
// =============================================================================

/// Compute the EMA series for `values` with look-back `window`.
///
/// The output has exactly `values.len()` entries.  Returns an empty `Vec`
/// when the input is empty or `window` is zero.
pub fn calculate_ema(values: &[f64], window: usize) -> Vec<f64> {
    let Some(&seed) = values.first() else {
        return Vec::new();
    };
    if window == 0 {
        return Vec::new();
    }

    let multiplier = 2.0 / (window + 1) as f64;
    let mut result = Vec::with_capacity(values.len());
    result.push(seed);

    let mut prev_ema = seed;
    for &value in &values[1..] {
        let ema = value * multiplier + prev_ema * (1.0 - multiplier);
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// MACD line: `EMA(short_window) - EMA(long_window)` at every index.
///
/// Full-length for any non-empty input with non-zero windows; empty
/// otherwise.
pub fn calculate_macd(prices: &[f64], short_window: usize, long_window: usize) -> Vec<f64> {
    let short = calculate_ema(prices, short_window);
    let long = calculate_ema(prices, long_window);
    if short.len() != prices.len() || long.len() != prices.len() {
        return Vec::new();
    }

    short.iter().zip(&long).map(|(s, l)| s - l).collect()
}
