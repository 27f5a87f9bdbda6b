use crate::geometry::curve::{CurvePrimitive, StrokeHandler};
use crate::math::{quadrature, Point3};
use crate::tessellation::StrokeOptions;

/// Computes the length of a curve.
pub struct Length<'a> {
    curve: &'a dyn CurvePrimitive,
}

impl<'a> Length<'a> {
    /// Creates a new `Length` query.
    #[must_use]
    pub fn new(curve: &'a dyn CurvePrimitive) -> Self {
        Self { curve }
    }

    /// Executes the query, returning the curve length.
    ///
    /// Segments, linestrings and circular arcs are exact; other curves are
    /// integrated numerically.
    #[must_use]
    pub fn execute(&self) -> f64 {
        self.curve.curve_length()
    }
}

/// Length accumulated over the curve's stroke announcements: chords for
/// segment intervals, Gauss quadrature of the speed for uniform ones.
#[must_use]
pub fn curve_length_by_strokes(curve: &dyn CurvePrimitive, options: Option<&StrokeOptions>) -> f64 {
    let mut context = CurveLengthContext { sum: 0.0 };
    curve.emit_strokable_parts(&mut context, options);
    context.sum
}

struct CurveLengthContext {
    sum: f64,
}

impl<'a> StrokeHandler<'a> for CurveLengthContext {
    fn announce_segment_interval(
        &mut self,
        _curve: &'a dyn CurvePrimitive,
        point0: Point3,
        point1: Point3,
        _num_strokes: usize,
        _fraction0: f64,
        _fraction1: f64,
    ) {
        self.sum += (point1 - point0).norm();
    }

    fn announce_interval_for_uniform_stepping(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        let speed = |f: f64| curve.fraction_to_point_and_derivative(f).direction.norm();
        self.sum += quadrature::integrate(fraction0, fraction1, num_strokes, speed).abs();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::curve::{Arc3d, BezierCurve3d, LineSegment3d, LineString3d};
    use crate::math::Vector3;

    #[test]
    fn segment_length_3_4_5() {
        let s = LineSegment3d::new(Point3::origin(), Point3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(Length::new(&s).execute(), 5.0);
        assert_relative_eq!(curve_length_by_strokes(&s, None), 5.0);
    }

    #[test]
    fn linestring_strokes_sum_edges() {
        let ls = LineString3d::new(vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
        ])
        .unwrap();
        assert_relative_eq!(curve_length_by_strokes(&ls, None), 3.0);
    }

    #[test]
    fn circle_by_strokes_matches_closed_form() {
        let c = Arc3d::circle(Point3::origin(), 2.0, Vector3::z()).unwrap();
        assert_relative_eq!(
            curve_length_by_strokes(&c, None),
            Length::new(&c).execute(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn straight_bezier_is_chord_length() {
        let b = BezierCurve3d::new(vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ])
        .unwrap();
        assert_relative_eq!(Length::new(&b).execute(), 3.0, epsilon = 1e-10);
    }

    #[test]
    fn quick_length_bounds_true_length() {
        let b = BezierCurve3d::new(vec![
            Point3::origin(),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(3.0, -1.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ])
        .unwrap();
        let length = Length::new(&b).execute();
        assert!(b.quick_length() >= length - 1e-9);
        assert!(length >= (b.end_point() - b.start_point()).norm());
    }
}
