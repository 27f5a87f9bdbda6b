//! Closed-form real roots of low-degree polynomials, and the trig-polynomial
//! reduction used for coplanar arc-arc intersection.
//!
//! Coefficients are given in ascending order (`c0 + c1 x + c2 x^2 + ...`).
//! Returned roots are sorted and near-duplicates are merged.

use std::f64::consts::{PI, TAU};

use super::Vector2;

/// Relative tolerance under which a leading coefficient is treated as zero.
const DEGREE_DROP: f64 = 1e-14;

/// Relative tolerance for near-zero discriminants (double roots).
const DOUBLE_ROOT: f64 = 1e-10;

fn coefficient_scale(coefficients: &[f64]) -> f64 {
    coefficients.iter().fold(0.0_f64, |m, c| m.max(c.abs()))
}

fn sort_and_merge(mut roots: Vec<f64>) -> Vec<f64> {
    roots.retain(|r| r.is_finite());
    roots.sort_by(f64::total_cmp);
    roots.dedup_by(|b, a| (*a - *b).abs() <= 1e-12 * a.abs().max(1.0));
    roots
}

fn evaluate(coefficients: &[f64], x: f64) -> (f64, f64) {
    let mut value = 0.0;
    let mut derivative = 0.0;
    for &c in coefficients.iter().rev() {
        derivative = derivative * x + value;
        value = value * x + c;
    }
    (value, derivative)
}

/// A few Newton steps on the original polynomial; a step is kept only if it
/// does not increase the residual.
fn polish(coefficients: &[f64], roots: Vec<f64>) -> Vec<f64> {
    roots
        .into_iter()
        .map(|mut x| {
            for _ in 0..3 {
                let (value, derivative) = evaluate(coefficients, x);
                if value == 0.0 || derivative == 0.0 {
                    break;
                }
                let candidate = x - value / derivative;
                if evaluate(coefficients, candidate).0.abs() <= value.abs() {
                    x = candidate;
                } else {
                    break;
                }
            }
            x
        })
        .collect()
}

/// Real roots of `c0 + c1 x`.
#[must_use]
pub fn linear_roots(c0: f64, c1: f64) -> Vec<f64> {
    if c1.abs() <= DEGREE_DROP * c0.abs() || c1 == 0.0 {
        Vec::new()
    } else {
        vec![-c0 / c1]
    }
}

/// Real roots of `c0 + c1 x + c2 x^2`.
#[must_use]
pub fn quadratic_roots(c0: f64, c1: f64, c2: f64) -> Vec<f64> {
    let scale = coefficient_scale(&[c0, c1, c2]);
    if c2.abs() <= DEGREE_DROP * scale {
        return linear_roots(c0, c1);
    }
    let disc = c1 * c1 - 4.0 * c2 * c0;
    let disc_scale = c1 * c1 + (4.0 * c2 * c0).abs();
    if disc.abs() <= DOUBLE_ROOT * disc_scale {
        return vec![-c1 / (2.0 * c2)];
    }
    if disc < 0.0 {
        return Vec::new();
    }
    let q = -0.5 * (c1 + c1.signum() * disc.sqrt());
    sort_and_merge(vec![q / c2, c0 / q])
}

/// Real roots of `c0 + c1 x + c2 x^2 + c3 x^3`.
#[must_use]
pub fn cubic_roots(c0: f64, c1: f64, c2: f64, c3: f64) -> Vec<f64> {
    let scale = coefficient_scale(&[c0, c1, c2, c3]);
    if c3.abs() <= DEGREE_DROP * scale {
        return quadratic_roots(c0, c1, c2);
    }
    let a = c2 / c3;
    let b = c1 / c3;
    let c = c0 / c3;
    let p = b - a * a / 3.0;
    let q = 2.0 * a * a * a / 27.0 - a * b / 3.0 + c;
    let shift = -a / 3.0;
    let local_scale = p.abs().max(q.abs()).max(1e-300);

    let depressed: Vec<f64> = if p.abs() <= DEGREE_DROP * local_scale.max(1.0) {
        vec![(-q).cbrt()]
    } else {
        let half_q = 0.5 * q;
        let third_p = p / 3.0;
        let delta = half_q * half_q + third_p * third_p * third_p;
        let delta_scale = half_q * half_q + (third_p * third_p * third_p).abs();
        if delta.abs() <= DOUBLE_ROOT * delta_scale {
            vec![3.0 * q / p, -1.5 * q / p]
        } else if delta > 0.0 {
            let s = delta.sqrt();
            vec![(-half_q + s).cbrt() + (-half_q - s).cbrt()]
        } else {
            let m = 2.0 * (-third_p).sqrt();
            let arg = ((3.0 * q / (2.0 * p)) * (-3.0 / p).sqrt()).clamp(-1.0, 1.0);
            let phi = arg.acos() / 3.0;
            (0..3)
                .map(|k| m * (phi - TAU * f64::from(k) / 3.0).cos())
                .collect()
        }
    };

    let roots = depressed.into_iter().map(|t| t + shift).collect();
    sort_and_merge(polish(&[c0, c1, c2, c3], roots))
}

/// Real roots of `c0 + c1 x + c2 x^2 + c3 x^3 + c4 x^4` (Ferrari).
#[must_use]
pub fn quartic_roots(c0: f64, c1: f64, c2: f64, c3: f64, c4: f64) -> Vec<f64> {
    let scale = coefficient_scale(&[c0, c1, c2, c3, c4]);
    if c4.abs() <= DEGREE_DROP * scale {
        return cubic_roots(c0, c1, c2, c3);
    }
    let a = c3 / c4;
    let b = c2 / c4;
    let c = c1 / c4;
    let d = c0 / c4;
    let a2 = a * a;
    let p = b - 3.0 * a2 / 8.0;
    let q = c - a * b / 2.0 + a2 * a / 8.0;
    let r = d - a * c / 4.0 + a2 * b / 16.0 - 3.0 * a2 * a2 / 256.0;
    let shift = -a / 4.0;

    // Largest root of the resolvent 8m^3 + 8p m^2 + (2p^2 - 8r) m - q^2.
    let m = cubic_roots(-q * q, 2.0 * p * p - 8.0 * r, 8.0 * p, 8.0)
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);

    let local_scale = p.abs().max(r.abs().sqrt()).max(1.0);
    let mut depressed = Vec::new();
    if !m.is_finite() || m <= DEGREE_DROP * local_scale {
        // Biquadratic: y^4 + p y^2 + r = 0.
        for z in quadratic_roots(r, p, 1.0) {
            if z > 0.0 {
                depressed.push(z.sqrt());
                depressed.push(-z.sqrt());
            } else if z.abs() <= DOUBLE_ROOT * local_scale {
                depressed.push(0.0);
            }
        }
    } else {
        let s = (2.0 * m).sqrt();
        let half_p = 0.5 * p + m;
        let correction = q / (2.0 * s);
        depressed.extend(quadratic_roots(half_p + correction, -s, 1.0));
        depressed.extend(quadratic_roots(half_p - correction, s, 1.0));
    }

    let roots = depressed.into_iter().map(|y| y + shift).collect();
    sort_and_merge(polish(&[c0, c1, c2, c3, c4], roots))
}

/// Intersections of the unit circle with the ellipse
/// `X(phi) = center + vector0 cos(phi) + vector90 sin(phi)` in the circle's plane.
///
/// Returns `(phi, theta)` pairs where `phi` is the ellipse angle and `theta`
/// the circle angle, both in `(-pi, pi]`. Coincident curves return nothing.
#[must_use]
pub fn unit_circle_ellipse_intersections(
    center: &Vector2,
    vector0: &Vector2,
    vector90: &Vector2,
) -> Vec<(f64, f64)> {
    // |X(phi)|^2 - 1 = A c^2 + B cs + C s^2 + D c + E s + F.
    let a = vector0.dot(vector0);
    let b = 2.0 * vector0.dot(vector90);
    let c = vector90.dot(vector90);
    let d = 2.0 * center.dot(vector0);
    let e = 2.0 * center.dot(vector90);
    let f = center.dot(center) - 1.0;

    // Tangent half-angle substitution t = tan(phi / 2).
    let t0 = a + d + f;
    let t1 = 2.0 * (b + e);
    let t2 = -2.0 * a + 4.0 * c + 2.0 * f;
    let t3 = 2.0 * (e - b);
    let t4 = a - d + f;

    let scale = coefficient_scale(&[a, b, c, d, e, f]).max(1.0);
    if coefficient_scale(&[t0, t1, t2, t3, t4]) <= DOUBLE_ROOT * scale {
        return Vec::new();
    }

    let mut angles: Vec<f64> = quartic_roots(t0, t1, t2, t3, t4)
        .into_iter()
        .map(|t| 2.0 * t.atan())
        .collect();
    // phi = pi corresponds to t = infinity and is invisible to the quartic.
    if t4.abs() <= DOUBLE_ROOT * scale {
        angles.push(PI);
    }

    let point_at = |phi: f64| center + vector0 * phi.cos() + vector90 * phi.sin();
    let mut out: Vec<(f64, f64)> = Vec::new();
    for phi in angles {
        let phi = polish_on_circle(phi, &point_at, vector0, vector90);
        let point = point_at(phi);
        if (point.norm() - 1.0).abs() > 1e-8 {
            continue;
        }
        let duplicate = out.iter().any(|(other, _)| {
            let gap = (phi - other).rem_euclid(TAU);
            gap.min(TAU - gap) < 1e-10
        });
        if !duplicate {
            out.push((phi, point.y.atan2(point.x)));
        }
    }
    out
}

fn polish_on_circle<F>(mut phi: f64, point_at: &F, vector0: &Vector2, vector90: &Vector2) -> f64
where
    F: Fn(f64) -> Vector2,
{
    for _ in 0..3 {
        let x = point_at(phi);
        let dx = vector90 * phi.cos() - vector0 * phi.sin();
        let value = x.norm_squared() - 1.0;
        let derivative = 2.0 * x.dot(&dx);
        if value == 0.0 || derivative.abs() < 1e-14 {
            break;
        }
        let candidate = phi - value / derivative;
        if (point_at(candidate).norm_squared() - 1.0).abs() <= value.abs() {
            phi = candidate;
        } else {
            break;
        }
    }
    phi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_roots(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "roots {actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "roots {actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn quadratic_two_roots() {
        // (x - 1)(x - 3) = x^2 - 4x + 3
        assert_roots(&quadratic_roots(3.0, -4.0, 1.0), &[1.0, 3.0]);
    }

    #[test]
    fn quadratic_double_root() {
        assert_roots(&quadratic_roots(1.0, -2.0, 1.0), &[1.0]);
    }

    #[test]
    fn quadratic_no_real_roots() {
        assert!(quadratic_roots(1.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn quadratic_degenerates_to_linear() {
        assert_roots(&quadratic_roots(2.0, -4.0, 0.0), &[0.5]);
    }

    #[test]
    fn cubic_three_roots() {
        // (x + 1)(x - 2)(x - 5) = x^3 - 6x^2 + 3x + 10
        assert_roots(&cubic_roots(10.0, 3.0, -6.0, 1.0), &[-1.0, 2.0, 5.0]);
    }

    #[test]
    fn cubic_single_real_root() {
        // (x - 2)(x^2 + 1) = x^3 - 2x^2 + x - 2
        assert_roots(&cubic_roots(-2.0, 1.0, -2.0, 1.0), &[2.0]);
    }

    #[test]
    fn quartic_four_roots() {
        // (x^2 - 1)(x^2 - 4) = x^4 - 5x^2 + 4
        assert_roots(&quartic_roots(4.0, 0.0, -5.0, 0.0, 1.0), &[-2.0, -1.0, 1.0, 2.0]);
    }

    #[test]
    fn quartic_with_odd_terms() {
        // (x - 1)(x - 2)(x + 3)(x - 0.5) = x^4 - 0.5x^3 - 7x^2 + 9.5x - 3
        assert_roots(
            &quartic_roots(-3.0, 9.5, -7.0, -0.5, 1.0),
            &[-3.0, 0.5, 1.0, 2.0],
        );
    }

    #[test]
    fn quartic_without_real_roots() {
        // (x^2 + 1)^2
        assert!(quartic_roots(1.0, 0.0, 2.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn offset_unit_circles_cross_twice() {
        let hits = unit_circle_ellipse_intersections(
            &Vector2::new(1.0, 0.0),
            &Vector2::new(1.0, 0.0),
            &Vector2::new(0.0, 1.0),
        );
        assert_eq!(hits.len(), 2);
        for (_, theta) in hits {
            assert!((theta.abs() - PI / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn concentric_circles_do_not_cross() {
        let hits = unit_circle_ellipse_intersections(
            &Vector2::zeros(),
            &Vector2::new(2.0, 0.0),
            &Vector2::new(0.0, 2.0),
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn touching_at_half_turn_is_found() {
        // Externally tangent circles meeting at (1, 0), where phi = pi.
        let hits = unit_circle_ellipse_intersections(
            &Vector2::new(2.0, 0.0),
            &Vector2::new(1.0, 0.0),
            &Vector2::new(0.0, 1.0),
        );
        assert_eq!(hits.len(), 1);
        let (phi, theta) = hits[0];
        assert!((phi.abs() - PI).abs() < 1e-6);
        assert!(theta.abs() < 1e-6);
    }

    #[test]
    fn ellipse_crosses_unit_circle_four_times() {
        let hits = unit_circle_ellipse_intersections(
            &Vector2::zeros(),
            &Vector2::new(2.0, 0.0),
            &Vector2::new(0.0, 0.5),
        );
        assert_eq!(hits.len(), 4);
    }
}
