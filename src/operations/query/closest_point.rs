use tracing::trace;

use crate::geometry::curve::{
    step_fraction, CurveExtend, CurveLocationDetail, CurvePrimitive, StrokeHandler,
};
use crate::math::{is_almost_equal_fraction, newton::Newton1d, Point3, TOLERANCE};

/// Finds the closest point on a curve to a given point.
pub struct ClosestPointOnCurve<'a> {
    curve: &'a dyn CurvePrimitive,
    point: Point3,
    extend: CurveExtend,
}

impl<'a> ClosestPointOnCurve<'a> {
    /// Creates a new `ClosestPointOnCurve` query that stays on the curve.
    #[must_use]
    pub fn new(curve: &'a dyn CurvePrimitive, point: Point3) -> Self {
        Self {
            curve,
            point,
            extend: CurveExtend::NONE,
        }
    }

    /// Allows the search to run past the curve's ends.
    #[must_use]
    pub fn with_extend(mut self, extend: impl Into<CurveExtend>) -> Self {
        self.extend = extend.into();
        self
    }

    /// Executes the query. The result's `a` is the distance to the point.
    ///
    /// Returns `None` for a degenerate curve.
    #[must_use]
    pub fn execute(&self) -> Option<CurveLocationDetail<'a>> {
        self.curve.closest_point(&self.point, self.extend)
    }
}

/// Stroke-driven closest point search, used by curves without a closed form.
#[must_use]
pub fn closest_point_by_strokes<'a>(
    curve: &'a dyn CurvePrimitive,
    space_point: &Point3,
    extend: CurveExtend,
) -> Option<CurveLocationDetail<'a>> {
    let mut context = ClosestPointContext::new(*space_point, extend);
    curve.emit_strokable_parts(&mut context, None);
    let best = context.best?;
    let distance = best.a;
    let fraction = best.fraction;
    let curve = best.curve?;
    Some(CurveLocationDetail::from_fraction_with_tangent(curve, fraction).with_a(distance))
}

/// Keeps the best candidate seen across all announced intervals.
struct ClosestPointContext<'a> {
    space_point: Point3,
    extend: CurveExtend,
    best: Option<CurveLocationDetail<'a>>,
}

impl<'a> ClosestPointContext<'a> {
    fn new(space_point: Point3, extend: CurveExtend) -> Self {
        Self {
            space_point,
            extend,
            best: None,
        }
    }

    /// Ties keep the earlier candidate.
    fn consider_point(&mut self, curve: &'a dyn CurvePrimitive, fraction: f64, point: Point3) {
        let distance = (point - self.space_point).norm();
        if self.best.as_ref().is_none_or(|b| distance < b.a) {
            self.best = Some(CurveLocationDetail::new(curve, fraction, point).with_a(distance));
        }
    }

    fn consider(&mut self, curve: &'a dyn CurvePrimitive, fraction: f64) {
        self.consider_point(curve, fraction, curve.fraction_to_point(fraction));
    }

    /// `g(f) = X'(f) . (X(f) - P)`, zero at a foot of the perpendicular.
    fn perpendicular_function(&self, curve: &dyn CurvePrimitive, fraction: f64) -> f64 {
        let ray = curve.fraction_to_point_and_derivative(fraction);
        ray.direction.dot(&(ray.origin - self.space_point))
    }

    /// Newton on `g` with `g' = X'' . (X - P) + X' . X'`.
    fn refine(&self, curve: &dyn CurvePrimitive, seed: f64) -> Option<f64> {
        let result = Newton1d::new().solve(seed, |f| {
            let d = curve.fraction_to_point_and_2_derivatives(f);
            let to_curve = d.origin - self.space_point;
            let g = d.vector_u.dot(&to_curve);
            let dg = d.vector_v.dot(&to_curve) + d.vector_u.dot(&d.vector_u);
            Some((g, dg))
        });
        if result.converged {
            Some(result.x)
        } else {
            trace!(seed, x = result.x, "closest point refinement did not converge");
            None
        }
    }
}

impl<'a> StrokeHandler<'a> for ClosestPointContext<'a> {
    /// Projection onto the chord; extension is honoured only where the chord
    /// touches a true end of the curve.
    fn announce_segment_interval(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        point0: Point3,
        point1: Point3,
        _num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        let chord = point1 - point0;
        let length_squared = chord.dot(&chord);
        if length_squared <= TOLERANCE * TOLERANCE {
            self.consider_point(curve, fraction0, point0);
            return;
        }
        let local = chord.dot(&(self.space_point - point0)) / length_squared;
        let extend = self.extend.restrict(
            is_almost_equal_fraction(fraction0, 0.0),
            is_almost_equal_fraction(fraction1, 1.0),
        );
        let local = extend.clamp_fraction(local);
        let fraction = fraction0 + local * (fraction1 - fraction0);
        self.consider_point(curve, fraction, point0 + chord * local);
    }

    fn announce_interval_for_uniform_stepping(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        let n = num_strokes.max(1);
        self.consider(curve, fraction0);
        self.consider(curve, fraction1);

        let mut previous_fraction = fraction0;
        let mut previous_g = self.perpendicular_function(curve, fraction0);
        for i in 1..=n {
            let fraction = step_fraction(fraction0, fraction1, i, n);
            let g = self.perpendicular_function(curve, fraction);
            if previous_g == 0.0 {
                self.consider(curve, previous_fraction);
            } else if previous_g * g < 0.0 {
                let seed = previous_fraction + (fraction - previous_fraction) * previous_g / (previous_g - g);
                let (low, high) = if previous_fraction < fraction {
                    (previous_fraction, fraction)
                } else {
                    (fraction, previous_fraction)
                };
                match self.refine(curve, seed) {
                    Some(root) if root >= low - TOLERANCE && root <= high + TOLERANCE => {
                        self.consider(curve, root);
                    }
                    _ => self.consider(curve, seed),
                }
            }
            previous_fraction = fraction;
            previous_g = g;
        }

        if !curve.is_extensible_fraction_space() {
            return;
        }
        // the distance keeps falling past a true end: follow it outward
        let g0 = self.perpendicular_function(curve, fraction0);
        if self.extend.at_start && is_almost_equal_fraction(fraction0, 0.0) && g0 > 0.0 {
            if let Some(root) = self.refine(curve, fraction0).filter(|&r| r < fraction0) {
                self.consider(curve, root);
            }
        }
        if self.extend.at_end && is_almost_equal_fraction(fraction1, 1.0) && previous_g < 0.0 {
            if let Some(root) = self.refine(curve, fraction1).filter(|&r| r > fraction1) {
                self.consider(curve, root);
            }
        }
    }
}
