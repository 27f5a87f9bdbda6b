use tracing::{debug, trace};

use crate::geometry::curve::{Curve, CurveLocationDetail, CurvePrimitive};
use crate::math::{
    is_almost_equal_fraction, is_almost_equal_point, newton::Newton2d, Matrix2, Point3, Vector2,
    TOLERANCE,
};
use crate::tessellation::{Polyline, StrokeOptions, TessellateCurve};

use super::IntersectionEngine;

/// Chord parameters this far outside `[0, 1]` still seed a search.
const SEED_MARGIN: f64 = 0.25;

/// Closest approach of the chords `p0 -> p1` and `q0 -> q1`, as chord
/// parameters and the gap between the two closest points.
fn chord_approach(p0: &Point3, p1: &Point3, q0: &Point3, q1: &Point3) -> Option<(f64, f64, f64)> {
    let u = p1 - p0;
    let v = q1 - q0;
    let w = q0 - p0;
    let uu = u.dot(&u);
    let uv = u.dot(&v);
    let vv = v.dot(&v);
    if u.cross(&v).norm_squared() <= TOLERANCE * TOLERANCE * uu * vv {
        return None;
    }
    let solution = Matrix2::new(uu, -uv, uv, -vv)
        .lu()
        .solve(&Vector2::new(u.dot(&w), v.dot(&w)))?;
    let (s, t) = (solution.x, solution.y);
    let gap = ((p0 + u * s) - (q0 + v * t)).norm();
    Some((s, t, gap))
}

/// Fraction seeds `(s, t)` from every pair of chords that pass close to
/// each other.
fn seeds(a: &Polyline, b: &Polyline) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    for i in 1..a.len() {
        let (p0, p1) = (&a.points[i - 1], &a.points[i]);
        for j in 1..b.len() {
            let (q0, q1) = (&b.points[j - 1], &b.points[j]);
            let Some((s, t, gap)) = chord_approach(p0, p1, q0, q1) else {
                continue;
            };
            let reach = 0.5 * (p1 - p0).norm().max((q1 - q0).norm());
            let inside = |x: f64| (-SEED_MARGIN..=1.0 + SEED_MARGIN).contains(&x);
            if inside(s) && inside(t) && gap <= reach {
                out.push((
                    a.fractions[i - 1] + s * (a.fractions[i] - a.fractions[i - 1]),
                    b.fractions[j - 1] + t * (b.fractions[j] - b.fractions[j - 1]),
                ));
            }
        }
    }
    out
}

/// Newton on the gradient of `|A(s) - B(t)|^2 / 2`.
fn refine(a: &dyn CurvePrimitive, b: &dyn CurvePrimitive, s0: f64, t0: f64) -> Option<(f64, f64)> {
    let result = Newton2d::new().solve(s0, t0, |s, t| {
        let da = a.fraction_to_point_and_2_derivatives(s);
        let db = b.fraction_to_point_and_2_derivatives(t);
        let gap = da.origin - db.origin;
        let residual = Vector2::new(da.vector_u.dot(&gap), -db.vector_u.dot(&gap));
        let cross = -da.vector_u.dot(&db.vector_u);
        let jacobian = Matrix2::new(
            da.vector_v.dot(&gap) + da.vector_u.dot(&da.vector_u),
            cross,
            cross,
            db.vector_u.dot(&db.vector_u) - db.vector_v.dot(&gap),
        );
        Some((residual, jacobian))
    });
    if !result.converged {
        trace!(s0, t0, "curve-curve refinement did not converge");
        return None;
    }
    let bounded = |x: f64| (-TOLERANCE..=1.0 + TOLERANCE).contains(&x);
    (bounded(result.u) && bounded(result.v)).then(|| (result.u.clamp(0.0, 1.0), result.v.clamp(0.0, 1.0)))
}

impl<'a> IntersectionEngine<'a> {
    /// Fallback for pairs without a closed form: stroke both curves, seed
    /// from chords that nearly cross, and keep the Newton solutions where the
    /// curves actually touch. Works on the bounded curves only.
    pub(super) fn numeric(&mut self, a: &'a Curve, b: &'a Curve) {
        let options = StrokeOptions::default();
        let (Ok(polyline_a), Ok(polyline_b)) = (
            TessellateCurve::new(a, options).execute(),
            TessellateCurve::new(b, options).execute(),
        ) else {
            return;
        };
        let candidates = seeds(&polyline_a, &polyline_b);
        debug!(
            kind_a = ?a.kind(),
            kind_b = ?b.kind(),
            seeds = candidates.len(),
            "numeric curve-curve intersection"
        );

        let mut hits: Vec<(f64, f64)> = Vec::new();
        for (s0, t0) in candidates {
            let Some((s, t)) = refine(a, b, s0, t0) else {
                continue;
            };
            if !is_almost_equal_point(&a.fraction_to_point(s), &b.fraction_to_point(t)) {
                continue;
            }
            hits.push((s, t));
        }
        hits.sort_by(|x, y| x.0.total_cmp(&y.0));
        hits.dedup_by(|x, y| is_almost_equal_fraction(x.0, y.0) && is_almost_equal_fraction(x.1, y.1));

        for (s, t) in hits {
            self.record(
                CurveLocationDetail::from_fraction(a, s),
                CurveLocationDetail::from_fraction(b, t),
            );
        }
    }
}
