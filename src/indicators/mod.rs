// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators published by the
// feed.  Every series-producing function returns a vector index-aligned with
// its input: positions that cannot be computed (warm-up, degenerate input,
// zero divisors) hold `None`, which serialises as JSON `null`.
//
// Invalid parameters never panic or error; they degrade to an all-`None`
// series so the broadcast loop keeps streaming.

pub mod adx;
pub mod bollinger;
pub mod ema;
pub mod signals;
pub mod sma;

pub use adx::calculate_dmi_adx;
pub use bollinger::calculate_bollinger;
pub use ema::calculate_macd;
pub use signals::directional_signals;
pub use sma::calculate_sma;

/// A sequence of optional values aligned 1:1 with an input series.
pub type NumericSeries = Vec<Option<f64>>;

/// Map a computed value to `None` unless it is finite.
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
