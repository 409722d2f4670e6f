//! Log-space arithmetic kernel.
//!
//! `log_add` approximates `log(exp(x) + exp(y))` with a piecewise-cubic fit
//! to `log(exp(|dx|) + 1)`, avoiding the two `exp` + one `log` calls of the
//! textbook formula. The four polynomial pieces and the underflow threshold
//! below must match the reference implementation bit-for-bit; they are not
//! independently derivable constants.

/// Additive identity for log-space probabilities: `log_add(x, LOG_ZERO) == x`.
pub const LOG_ZERO: f64 = f64::NEG_INFINITY;

/// Aligned pairs are reported as integers in `[0, PROB_SCALE]`.
pub const PROB_SCALE: f64 = 1_000_000.0;

const LOG_UNDERFLOW_THRESHOLD: f64 = 7.5;

/// `log(exp(x) + 1)` for `x` in `[0, LOG_UNDERFLOW_THRESHOLD]`, via a
/// four-piece cubic fit.
fn lookup(x: f64) -> f64 {
    debug_assert!(x >= 0.0);
    debug_assert!(x <= LOG_UNDERFLOW_THRESHOLD);
    if x <= 1.00 {
        return ((-0.009350833524763 * x + 0.130659527668286) * x + 0.498799810682272) * x
            + 0.693203116424741;
    }
    if x <= 2.50 {
        return ((-0.014532321752540 * x + 0.139942324101744) * x + 0.495635523139337) * x
            + 0.692140569840976;
    }
    if x <= 4.50 {
        return ((-0.004605031767994 * x + 0.063427417320019) * x + 0.695956496475118) * x
            + 0.514272634594009;
    }
    ((-0.000458661602210 * x + 0.009695946122598) * x + 0.930734667215156) * x + 0.168037164329057
}

/// `log(exp(x) + exp(y))`, computed via the piecewise-cubic approximation of
/// `lookup`. Symmetric in `x` and `y`, and `>= max(x, y)` for all inputs.
pub fn log_add(x: f64, y: f64) -> f64 {
    if x < y {
        return if x == LOG_ZERO || y - x >= LOG_UNDERFLOW_THRESHOLD {
            y
        } else {
            lookup(y - x) + x
        };
    }
    if y == LOG_ZERO || x - y >= LOG_UNDERFLOW_THRESHOLD {
        x
    } else {
        lookup(x - y) + y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity() {
        for x in [-10.0, -1.0, 0.0, 3.3, -0.0001] {
            assert_eq!(log_add(x, LOG_ZERO), x);
            assert_eq!(log_add(LOG_ZERO, x), x);
        }
    }

    #[test]
    fn symmetric() {
        let pairs = [(-1.0, -2.0), (0.0, -7.0), (-3.3, -3.3), (-100.0, -0.1)];
        for (x, y) in pairs {
            assert_eq!(log_add(x, y), log_add(y, x));
        }
    }

    #[test]
    fn at_least_max() {
        let pairs = [(-1.0, -2.0), (0.0, -7.0), (-3.3, -3.3), (-100.0, -0.1)];
        for (x, y) in pairs {
            assert!(log_add(x, y) >= x.max(y));
        }
    }

    #[test]
    fn agrees_with_naive_exp_log() {
        for (x, y) in [(-1.0, -2.0), (-0.5, -0.5), (-6.0, -0.2)] {
            let naive = (x.exp() + y.exp()).ln();
            assert!((log_add(x, y) - naive).abs() < 1e-6);
        }
    }

    #[test]
    fn far_apart_short_circuits_to_max() {
        assert_eq!(log_add(-1.0, -100.0), -1.0);
        assert_eq!(log_add(-100.0, -1.0), -1.0);
    }
}
