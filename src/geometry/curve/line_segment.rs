use crate::geometry::{Plane, PointAnd2Derivatives, Ray3};
use crate::math::{interpolate_point, Point3, Vector3, TOLERANCE};
use crate::tessellation::{resolve, StrokeOptions};

use super::{
    move_at_constant_speed, CurveExtend, CurveIntervalRole, CurveLocationDetail, CurvePrimitive,
    StrokeHandler,
};

/// A straight segment between two points.
///
/// The parametric form is `P(f) = point0 + f * (point1 - point0)`, and it
/// extrapolates for fractions outside `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegment3d {
    point0: Point3,
    point1: Point3,
}

impl LineSegment3d {
    /// Creates a segment. A zero-length segment is allowed; searches on it
    /// return no result.
    #[must_use]
    pub fn new(point0: Point3, point1: Point3) -> Self {
        Self { point0, point1 }
    }

    #[must_use]
    pub fn point0(&self) -> &Point3 {
        &self.point0
    }

    #[must_use]
    pub fn point1(&self) -> &Point3 {
        &self.point1
    }

    /// Vector from start to end.
    #[must_use]
    pub fn vector(&self) -> Vector3 {
        self.point1 - self.point0
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.vector().norm()
    }

    /// Fraction of the unbounded projection of `point` onto the segment's
    /// line, or `None` for a zero-length segment.
    #[must_use]
    pub fn project_fraction(&self, point: &Point3) -> Option<f64> {
        let v = self.vector();
        let vv = v.dot(&v);
        if vv <= TOLERANCE * TOLERANCE {
            return None;
        }
        Some(v.dot(&(point - self.point0)) / vv)
    }
}

impl CurvePrimitive for LineSegment3d {
    fn as_curve(&self) -> &dyn CurvePrimitive {
        self
    }

    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        interpolate_point(&self.point0, fraction, &self.point1)
    }

    fn fraction_to_point_and_derivative(&self, fraction: f64) -> Ray3 {
        Ray3::new(self.fraction_to_point(fraction), self.vector())
    }

    fn fraction_to_point_and_2_derivatives(&self, fraction: f64) -> PointAnd2Derivatives {
        PointAnd2Derivatives::new(self.fraction_to_point(fraction), self.vector(), Vector3::zeros())
    }

    fn start_point(&self) -> Point3 {
        self.point0
    }

    fn end_point(&self) -> Point3 {
        self.point1
    }

    fn is_extensible_fraction_space(&self) -> bool {
        true
    }

    fn compute_stroke_count_for_options(&self, options: Option<&StrokeOptions>) -> usize {
        resolve(options).stroke_count(self.length(), 0.0, None)
    }

    fn emit_strokable_parts<'a>(
        &'a self,
        handler: &mut dyn StrokeHandler<'a>,
        options: Option<&StrokeOptions>,
    ) {
        handler.start_curve_primitive(self);
        let n = self.compute_stroke_count_for_options(options);
        handler.announce_segment_interval(self, self.point0, self.point1, n, 0.0, 1.0);
        handler.end_curve_primitive(self);
    }

    fn curve_length(&self) -> f64 {
        self.length()
    }

    fn quick_length(&self) -> f64 {
        self.length()
    }

    fn curve_length_between_fractions(&self, fraction0: f64, fraction1: f64) -> f64 {
        (fraction1 - fraction0).abs() * self.length()
    }

    fn closest_point(&self, space_point: &Point3, extend: CurveExtend) -> Option<CurveLocationDetail<'_>> {
        let fraction = extend.clamp_fraction(self.project_fraction(space_point)?);
        let detail = CurveLocationDetail::from_fraction_with_tangent(self, fraction);
        let distance = (detail.point - space_point).norm();
        Some(detail.with_a(distance))
    }

    fn append_plane_intersections<'a>(
        &'a self,
        plane: &Plane,
        out: &mut Vec<CurveLocationDetail<'a>>,
    ) -> usize {
        let h0 = plane.altitude(&self.point0);
        let h1 = plane.altitude(&self.point1);
        if (h1 - h0).abs() <= TOLERANCE {
            return 0;
        }
        let fraction = h0 / (h0 - h1);
        if !CurveExtend::NONE.accepts_fraction(fraction) {
            return 0;
        }
        out.push(
            CurveLocationDetail::from_fraction(self, fraction.clamp(0.0, 1.0))
                .with_interval_role(CurveIntervalRole::Isolated),
        );
        1
    }

    fn move_signed_distance_from_fraction(
        &self,
        start_fraction: f64,
        signed_distance: f64,
        allow_extension: bool,
    ) -> CurveLocationDetail<'_> {
        move_at_constant_speed(self, self.length(), start_fraction, signed_distance, allow_extension)
    }

    fn reverse_in_place(&mut self) {
        std::mem::swap(&mut self.point0, &mut self.point1);
    }
}
