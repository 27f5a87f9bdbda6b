use crate::geometry::curve::{
    step_fraction, CurveIntervalRole, CurveLocationDetail, CurvePrimitive, StrokeHandler,
};
use crate::geometry::Plane;
use crate::math::{
    is_almost_equal_fraction, is_almost_equal_point, newton::Newton1dApproximateDerivative,
    Point3, TOLERANCE,
};

/// Computes the points where a curve crosses a plane.
pub struct CurvePlaneIntersect<'a> {
    curve: &'a dyn CurvePrimitive,
    plane: Plane,
}

impl<'a> CurvePlaneIntersect<'a> {
    /// Creates a new intersection query.
    #[must_use]
    pub fn new(curve: &'a dyn CurvePrimitive, plane: Plane) -> Self {
        Self { curve, plane }
    }

    /// Executes the query, returning one `Isolated` detail per crossing in
    /// increasing fraction order for single primitives.
    #[must_use]
    pub fn execute(&self) -> Vec<CurveLocationDetail<'a>> {
        let mut out = Vec::new();
        self.curve.append_plane_intersections(&self.plane, &mut out);
        out
    }
}

/// Stroke-driven plane intersection, used by curves without a closed form.
pub fn plane_intersections_by_strokes<'a>(
    curve: &'a dyn CurvePrimitive,
    plane: &Plane,
    out: &mut Vec<CurveLocationDetail<'a>>,
) -> usize {
    let mut context = PlaneIntersectionContext {
        plane,
        roots: Vec::new(),
    };
    curve.emit_strokable_parts(&mut context, None);
    let added = context.roots.len();
    out.append(&mut context.roots);
    added
}

struct PlaneIntersectionContext<'a, 'p> {
    plane: &'p Plane,
    roots: Vec<CurveLocationDetail<'a>>,
}

impl<'a> PlaneIntersectionContext<'a, '_> {
    fn altitude(&self, curve: &dyn CurvePrimitive, fraction: f64) -> f64 {
        self.plane.altitude(&curve.fraction_to_point(fraction))
    }

    /// Records a root unless it repeats the previous one, or it is the end of
    /// a closed curve whose start already produced it.
    fn record(&mut self, curve: &'a dyn CurvePrimitive, fraction: f64) {
        if self
            .roots
            .last()
            .is_some_and(|last| is_almost_equal_fraction(last.fraction, fraction))
        {
            return;
        }
        if is_almost_equal_fraction(fraction, 1.0)
            && is_almost_equal_point(&curve.start_point(), &curve.end_point())
        {
            return;
        }
        self.roots.push(
            CurveLocationDetail::from_fraction(curve, fraction)
                .with_interval_role(CurveIntervalRole::Isolated),
        );
    }

    /// Polishes a bracketed root with approximate-derivative Newton on the
    /// altitude, falling back to the linear estimate.
    fn refine(&self, curve: &dyn CurvePrimitive, seed: f64, low: f64, high: f64) -> f64 {
        let result = Newton1dApproximateDerivative::new()
            .solve(seed, |f| Some(self.plane.altitude(&curve.fraction_to_point(f))));
        if result.converged && result.x >= low - TOLERANCE && result.x <= high + TOLERANCE {
            result.x.clamp(low, high)
        } else {
            seed
        }
    }

    fn bracket(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        fraction0: f64,
        h0: f64,
        fraction1: f64,
        h1: f64,
    ) {
        if h0.abs() <= TOLERANCE {
            self.record(curve, fraction0);
        } else if h1.abs() > TOLERANCE && h0 * h1 < 0.0 {
            let seed = fraction0 + (fraction1 - fraction0) * h0 / (h0 - h1);
            let (low, high) = if fraction0 < fraction1 {
                (fraction0, fraction1)
            } else {
                (fraction1, fraction0)
            };
            let root = self.refine(curve, seed, low, high);
            self.record(curve, root);
        }
    }
}

impl<'a> StrokeHandler<'a> for PlaneIntersectionContext<'a, '_> {
    fn announce_segment_interval(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        point0: Point3,
        point1: Point3,
        _num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        let h0 = self.plane.altitude(&point0);
        let h1 = self.plane.altitude(&point1);
        self.bracket(curve, fraction0, h0, fraction1, h1);
        if h1.abs() <= TOLERANCE && is_almost_equal_fraction(fraction1, 1.0) {
            self.record(curve, fraction1);
        }
    }

    fn announce_interval_for_uniform_stepping(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        let n = num_strokes.max(1);
        let mut previous_fraction = fraction0;
        let mut previous_h = self.altitude(curve, fraction0);
        for i in 1..=n {
            let fraction = step_fraction(fraction0, fraction1, i, n);
            let h = self.altitude(curve, fraction);
            self.bracket(curve, previous_fraction, previous_h, fraction, h);
            previous_fraction = fraction;
            previous_h = h;
        }
        if previous_h.abs() <= TOLERANCE && is_almost_equal_fraction(fraction1, 1.0) {
            self.record(curve, fraction1);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::curve::{Arc3d, BezierCurve3d, TransitionSpiral3d};
    use crate::math::{AngleSweep, Vector3};

    #[test]
    fn ellipse_crossings_by_strokes_match_closed_form() {
        let arc = Arc3d::new(
            Point3::origin(),
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            AngleSweep::full_circle(),
        )
        .unwrap();
        let plane = Plane::from_normal(Point3::new(1.5, 0.0, 0.0), Vector3::x()).unwrap();
        let mut by_strokes = Vec::new();
        plane_intersections_by_strokes(&arc, &plane, &mut by_strokes);
        let closed_form = CurvePlaneIntersect::new(&arc, plane).execute();
        assert_eq!(by_strokes.len(), 2);
        assert_eq!(closed_form.len(), 2);
        for (a, b) in by_strokes.iter().zip(&closed_form) {
            assert_relative_eq!(a.fraction, b.fraction, epsilon = 1e-9);
        }
    }

    #[test]
    fn closed_curve_reports_start_root_once() {
        let circle = Arc3d::circle(Point3::origin(), 1.0, Vector3::z()).unwrap();
        // plane through the start point (1, 0, 0)
        let plane = Plane::from_normal(Point3::new(1.0, 0.0, 0.0), Vector3::y()).unwrap();
        let mut out = Vec::new();
        assert_eq!(plane_intersections_by_strokes(&circle, &plane, &mut out), 2);
        assert_relative_eq!(out[0].fraction, 0.0);
        assert_relative_eq!(out[1].fraction, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn open_curve_keeps_end_root() {
        let b = BezierCurve3d::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ])
        .unwrap();
        let plane = Plane::from_normal(Point3::origin(), Vector3::y()).unwrap();
        let out = CurvePlaneIntersect::new(&b, plane).execute();
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out[0].fraction, 0.0);
        assert_relative_eq!(out[1].fraction, 1.0);
        assert!(out.iter().all(|d| d.interval_role == Some(CurveIntervalRole::Isolated)));
    }

    #[test]
    fn spiral_crossing_is_on_plane() {
        let s = TransitionSpiral3d::new(Point3::origin(), Vector3::z(), 0.0, 0.0, 0.02, 50.0).unwrap();
        let plane = Plane::from_normal(Point3::new(20.0, 0.0, 0.0), Vector3::x()).unwrap();
        let out = CurvePlaneIntersect::new(&s, plane.clone()).execute();
        assert_eq!(out.len(), 1);
        assert!(plane.altitude(&out[0].point).abs() < 1e-9);
    }
}
