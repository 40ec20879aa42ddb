// =============================================================================
// Directional Signals
// =============================================================================
//
// Classifies each candle from its +DI / -DI / ADX values:
//   long      => +DI > -DI and ADX > threshold
//   short     => -DI > +DI and ADX > threshold
//   crossover => the sign of (+DI - -DI) flipped since the previous candle
//                (takes precedence over long/short)
//   none      => otherwise, or whenever an input is missing
// =============================================================================

use crate::types::Signal;

/// ADX level above which a directional bias counts as a trend.
pub const DEFAULT_ADX_THRESHOLD: f64 = 25.0;

/// Produce one [`Signal`] per index of the DI/ADX series.
///
/// The output length is the length of the shortest input; callers pass the
/// aligned series from [`super::calculate_dmi_adx`].
pub fn directional_signals(
    plus_di: &[Option<f64>],
    minus_di: &[Option<f64>],
    adx: &[Option<f64>],
    threshold: f64,
) -> Vec<Signal> {
    let mut prev: Option<(f64, f64)> = None;

    plus_di
        .iter()
        .zip(minus_di)
        .zip(adx)
        .map(|((&plus, &minus), &adx)| {
            let (Some(plus), Some(minus)) = (plus, minus) else {
                prev = None;
                return Signal::Neutral;
            };

            let mut signal = match adx {
                Some(a) if a > threshold && plus > minus => Signal::Long,
                Some(a) if a > threshold && minus > plus => Signal::Short,
                _ => Signal::Neutral,
            };

            if let Some((prev_plus, prev_minus)) = prev {
                let crossed_up = prev_plus < prev_minus && plus > minus;
                let crossed_down = prev_plus > prev_minus && plus < minus;
                if crossed_up || crossed_down {
                    signal = Signal::Crossover;
                }
            }

            prev = Some((plus, minus));
            signal
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_are_neutral() {
        let signals = directional_signals(
            &[None, Some(30.0)],
            &[None, None],
            &[None, Some(40.0)],
            DEFAULT_ADX_THRESHOLD,
        );
        assert_eq!(signals, vec![Signal::Neutral, Signal::Neutral]);
    }

    #[test]
    fn trend_needs_adx_above_threshold() {
        let signals = directional_signals(
            &[Some(30.0), Some(30.0), Some(10.0)],
            &[Some(10.0), Some(10.0), Some(10.0)],
            &[Some(20.0), Some(50.0), Some(50.0)],
            DEFAULT_ADX_THRESHOLD,
        );
        assert_eq!(signals, vec![Signal::Neutral, Signal::Long, Signal::Neutral]);
    }

    #[test]
    fn short_bias() {
        let signals = directional_signals(
            &[Some(5.0)],
            &[Some(25.0)],
            &[Some(66.0)],
            DEFAULT_ADX_THRESHOLD,
        );
        assert_eq!(signals, vec![Signal::Short]);
    }

    #[test]
    fn crossover_overrides_trend() {
        let signals = directional_signals(
            &[Some(10.0), Some(40.0), Some(45.0)],
            &[Some(30.0), Some(20.0), Some(20.0)],
            &[Some(50.0), Some(50.0), Some(50.0)],
            DEFAULT_ADX_THRESHOLD,
        );
        assert_eq!(
            signals,
            vec![Signal::Short, Signal::Crossover, Signal::Long]
        );
    }

    #[test]
    fn gap_resets_crossover_history() {
        let signals = directional_signals(
            &[Some(10.0), None, Some(40.0)],
            &[Some(30.0), None, Some(20.0)],
            &[Some(10.0), None, Some(10.0)],
            DEFAULT_ADX_THRESHOLD,
        );
        assert_eq!(signals[2], Signal::Neutral);
    }
}
