// =============================================================================
// Directional Movement Index (DMI) and Average Directional Index (ADX)
// =============================================================================
//
// Calculation pipeline:
//   1. For each adjacent pair of candles compute +DM, -DM and True Range.
//      These form step series of length `len - 1`.
//   2. For every step index `j >= window`, sum the trailing `window` values
//      of TR, +DM and -DM.
//   3. +DI = 100 * sum(+DM) / sum(TR)
//      -DI = 100 * sum(-DM) / sum(TR)
//      ADX = 100 * |+DI - -DI| / (+DI + -DI)
//   4. Step index `j` describes candle `j + 1`; everything before the first
//      computed candle is `None`.
//
// Zero divisors are common (flat runs have TR == 0) and produce `None`
// rather than NaN or infinity.
// =============================================================================

use super::{finite, NumericSeries};
use crate::market_data::Candle;

/// Index-aligned DMI/ADX series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DmiAdxSeries {
    pub plus_di: NumericSeries,
    pub minus_di: NumericSeries,
    pub adx: NumericSeries,
}

/// Per-step directional movement and true range.
struct Step {
    plus_dm: f64,
    minus_dm: f64,
    tr: f64,
}

fn step(prev: &Candle, cur: &Candle) -> Step {
    let up_move = cur.high - prev.high;
    let down_move = prev.low - cur.low;

    let plus_dm = if up_move > down_move && up_move > 0.0 {
        up_move
    } else {
        0.0
    };
    let minus_dm = if down_move > up_move && down_move > 0.0 {
        down_move
    } else {
        0.0
    };

    let tr = (cur.high - cur.low)
        .max((cur.high - prev.close).abs())
        .max((cur.low - prev.close).abs());

    Step {
        plus_dm,
        minus_dm,
        tr,
    }
}

/// Compute +DI, -DI and ADX for `candles` over `window` steps.
///
/// Every output series has `candles.len()` entries.  A zero `window`, or too
/// few candles to fill one window, yields all-`None` series.
pub fn calculate_dmi_adx(candles: &[Candle], window: usize) -> DmiAdxSeries {
    let len = candles.len();
    let mut out = DmiAdxSeries {
        plus_di: vec![None; len],
        minus_di: vec![None; len],
        adx: vec![None; len],
    };
    if window == 0 || len < 2 {
        return out;
    }

    let steps: Vec<Step> = candles.windows(2).map(|w| step(&w[0], &w[1])).collect();

    for j in window..steps.len() {
        let trailing = &steps[j + 1 - window..=j];
        let sum_tr: f64 = trailing.iter().map(|s| s.tr).sum();
        if sum_tr == 0.0 {
            continue;
        }
        let sum_plus: f64 = trailing.iter().map(|s| s.plus_dm).sum();
        let sum_minus: f64 = trailing.iter().map(|s| s.minus_dm).sum();

        let plus_di = 100.0 * sum_plus / sum_tr;
        let minus_di = 100.0 * sum_minus / sum_tr;
        let di_sum = plus_di + minus_di;

        out.plus_di[j + 1] = finite(plus_di);
        out.minus_di[j + 1] = finite(minus_di);
        if di_sum != 0.0 {
            out.adx[j + 1] = finite(100.0 * (plus_di - minus_di).abs() / di_sum);
        }
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: 0,
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    fn uptrend(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                candle(base + 1.5, base - 0.5, base + 1.0)
            })
            .collect()
    }

    #[test]
    fn outputs_are_aligned_to_input() {
        for n in [0, 1, 2, 14, 15, 16, 60] {
            let dmi = calculate_dmi_adx(&uptrend(n), 14);
            assert_eq!(dmi.plus_di.len(), n);
            assert_eq!(dmi.minus_di.len(), n);
            assert_eq!(dmi.adx.len(), n);
        }
    }

    #[test]
    fn warm_up_is_null() {
        let dmi = calculate_dmi_adx(&uptrend(60), 14);
        assert!(dmi.plus_di[..15].iter().all(Option::is_none));
        assert!(dmi.adx[..15].iter().all(Option::is_none));
        assert!(dmi.plus_di[15..].iter().all(Option::is_some));
        assert!(dmi.adx[15..].iter().all(Option::is_some));
    }

    #[test]
    fn window_zero_is_all_null() {
        let dmi = calculate_dmi_adx(&uptrend(30), 0);
        assert!(dmi.adx.iter().all(Option::is_none));
    }

    #[test]
    fn strong_uptrend() {
        // Each step: up_move = 2.0, down_move = -2.0, TR = max(2, 2.5, 0.5).
        let dmi = calculate_dmi_adx(&uptrend(60), 14);
        let plus = dmi.plus_di[59].unwrap();
        let minus = dmi.minus_di[59].unwrap();
        let adx = dmi.adx[59].unwrap();

        assert!((plus - 80.0).abs() < 1e-9, "plus_di {plus}");
        assert_eq!(minus, 0.0);
        assert!((adx - 100.0).abs() < 1e-9, "adx {adx}");
    }

    #[test]
    fn flat_market_has_null_adx() {
        let candles = vec![candle(100.0, 100.0, 100.0); 60];
        let dmi = calculate_dmi_adx(&candles, 14);
        assert!(dmi.adx.iter().all(Option::is_none));
        assert!(dmi.plus_di.iter().all(Option::is_none));
        assert!(dmi.minus_di.iter().all(Option::is_none));
    }

    #[test]
    fn ranging_without_direction_has_null_adx() {
        // Constant non-zero range but no directional movement: TR > 0 while
        // both DI values are zero.
        let candles = vec![candle(101.0, 99.0, 100.0); 40];
        let dmi = calculate_dmi_adx(&candles, 14);
        assert_eq!(dmi.plus_di[39], Some(0.0));
        assert_eq!(dmi.minus_di[39], Some(0.0));
        assert!(dmi.adx.iter().all(Option::is_none));
    }

    #[test]
    fn adx_result_range() {
        let candles: Vec<Candle> = (0..100)
            .map(|i| {
                let base = 50.0 + (i as f64 * 0.3).sin() * 10.0;
                candle(base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        let dmi = calculate_dmi_adx(&candles, 14);
        for value in dmi.adx.iter().flatten() {
            assert!((0.0..=100.0).contains(value), "ADX {value} out of range");
        }
    }
}
