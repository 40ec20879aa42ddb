// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Unweighted arithmetic mean over a trailing window:
//   SMA_i = (x_{i-window+1} + ... + x_i) / window
//
// The first `window - 1` positions have no complete window and are `None`.
// =============================================================================

use super::{finite, NumericSeries};

/// Compute the SMA series for `values` over a trailing `window`.
///
/// The output always has `values.len()` entries.  When `window` is zero every
/// entry is `None`; an empty input yields an empty series.
pub fn calculate_sma(values: &[f64], window: usize) -> NumericSeries {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let divisor = window as f64;
    for (offset, slice) in values.windows(window).enumerate() {
        out[offset + window - 1] = finite(slice.iter().sum::<f64>() / divisor);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_warm_up_is_null_then_mean() {
        let closes: Vec<f64> = (10..=21).map(|x| x as f64).collect();
        let sma = calculate_sma(&closes, 5);

        assert_eq!(sma.len(), 12);
        assert!(sma[..4].iter().all(Option::is_none));
        assert!((sma[4].unwrap() - 12.0).abs() < 1e-10);
        assert!((sma[11].unwrap() - 19.0).abs() < 1e-10);
    }

    #[test]
    fn sma_empty_input() {
        assert!(calculate_sma(&[], 5).is_empty());
    }

    #[test]
    fn sma_zero_window_is_all_null() {
        let sma = calculate_sma(&[1.0, 2.0, 3.0], 0);
        assert_eq!(sma, vec![None, None, None]);
    }

    #[test]
    fn sma_window_longer_than_input() {
        let sma = calculate_sma(&[1.0, 2.0, 3.0], 20);
        assert_eq!(sma.len(), 3);
        assert!(sma.iter().all(Option::is_none));
    }

    #[test]
    fn sma_window_of_one_is_identity() {
        let closes = vec![3.0, 1.5, 7.25];
        let sma = calculate_sma(&closes, 1);
        assert_eq!(sma, vec![Some(3.0), Some(1.5), Some(7.25)]);
    }

    #[test]
    fn sma_length_matches_for_many_windows() {
        let closes: Vec<f64> = (0..60).map(|x| 100.0 + (x as f64 * 0.4).sin()).collect();
        for window in 1..=70 {
            let sma = calculate_sma(&closes, window);
            assert_eq!(sma.len(), closes.len());
            let warm_up = window.saturating_sub(1).min(closes.len());
            assert!(sma[..warm_up].iter().all(Option::is_none), "window {window}");
        }
    }
}
