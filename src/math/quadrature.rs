//! Five-point Gauss-Legendre quadrature.

/// Abscissae of the 5-point rule on `[-1, 1]`.
const GAUSS_X: [f64; 5] = [
    -0.906_179_845_938_664,
    -0.538_469_310_105_683,
    0.0,
    0.538_469_310_105_683,
    0.906_179_845_938_664,
];

/// Weights of the 5-point rule on `[-1, 1]` (they sum to 2).
const GAUSS_W: [f64; 5] = [
    0.236_926_885_056_189,
    0.478_628_670_499_366,
    0.568_888_888_888_889,
    0.478_628_670_499_366,
    0.236_926_885_056_189,
];

/// Gauss points and weights mapped onto an interval `[a, b]`.
///
/// The weights carry the interval scale, so `sum(w * f(x))` approximates
/// the signed integral from `a` to `b`.
#[must_use]
pub fn gauss_points(a: f64, b: f64) -> [(f64, f64); 5] {
    let half = 0.5 * (b - a);
    let mid = 0.5 * (a + b);
    let mut out = [(0.0, 0.0); 5];
    for (slot, (x, w)) in out.iter_mut().zip(GAUSS_X.iter().zip(GAUSS_W.iter())) {
        *slot = (mid + half * x, half * w);
    }
    out
}

/// Integrates `f` over `[a, b]` with one 5-point rule per sub-interval.
pub fn integrate<F>(a: f64, b: f64, intervals: usize, mut f: F) -> f64
where
    F: FnMut(f64) -> f64,
{
    let n = intervals.max(1);
    #[allow(clippy::cast_precision_loss)]
    let step = (b - a) / n as f64;
    let mut sum = 0.0;
    for i in 0..n {
        #[allow(clippy::cast_precision_loss)]
        let x0 = a + step * i as f64;
        for (x, w) in gauss_points(x0, x0 + step) {
            sum += w * f(x);
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_interval_length() {
        let total: f64 = gauss_points(2.0, 5.0).iter().map(|(_, w)| w).sum();
        assert!((total - 3.0).abs() < 1e-12);
    }

    #[test]
    fn exact_for_degree_nine_polynomial() {
        let value = integrate(0.0, 1.0, 1, |x| x.powi(9));
        assert!((value - 0.1).abs() < 1e-12);
    }

    #[test]
    fn composite_rule_integrates_sine() {
        let value = integrate(0.0, std::f64::consts::PI, 4, f64::sin);
        assert!((value - 2.0).abs() < 1e-10);
    }

    #[test]
    fn reversed_interval_is_negative() {
        let value = integrate(1.0, 0.0, 2, |x| x);
        assert!((value + 0.5).abs() < 1e-12);
    }
}
