use crate::error::{GeometryError, Result};
use crate::geometry::{Plane, PointAnd2Derivatives, Ray3};
use crate::math::{quadrature, Point3, Vector3, TOLERANCE};
use crate::tessellation::{resolve, StrokeOptions};

use super::{move_at_constant_speed, CurveLocationDetail, CurvePrimitive, StrokeHandler};

/// Heading change allowed across one quadrature interval when integrating
/// the position.
const INTEGRATION_STEP_RADIANS: f64 = std::f64::consts::PI / 16.0;

/// A clothoid transition spiral: curvature varies linearly with arc length
/// from `curvature0` at the start to `curvature1` at the end.
///
/// The spiral lies in the plane through `origin` with the given normal and
/// starts at `origin` heading `start_bearing` radians from the plane's U
/// direction, turning counter-clockwise around the normal for positive
/// curvature. Positions come from quadrature of the heading, so there is no
/// closed form for anything beyond evaluation; searches use the stroke-driven
/// defaults. Fractions outside `[0, 1]` clamp to the ends.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSpiral3d {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    start_bearing: f64,
    curvature0: f64,
    curvature1: f64,
    length: f64,
    reversed: bool,
    integration_intervals: usize,
}

impl TransitionSpiral3d {
    /// Creates a spiral.
    ///
    /// # Errors
    ///
    /// Returns an error if `length` is not positive, a curvature is not
    /// finite, or `normal` is zero-length.
    pub fn new(
        origin: Point3,
        normal: Vector3,
        start_bearing: f64,
        curvature0: f64,
        curvature1: f64,
        length: f64,
    ) -> Result<Self> {
        if !(length.is_finite() && length > TOLERANCE) {
            return Err(GeometryError::Degenerate("spiral length must be positive".into()).into());
        }
        if !(curvature0.is_finite() && curvature1.is_finite() && start_bearing.is_finite()) {
            return Err(GeometryError::Degenerate("spiral parameters must be finite".into()).into());
        }
        let plane = Plane::from_normal(origin, normal)?;
        let turn = total_turn(curvature0, curvature1, length);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let integration_intervals = ((turn / INTEGRATION_STEP_RADIANS).ceil() as usize).max(4);
        Ok(Self {
            origin,
            u_dir: *plane.u_dir(),
            v_dir: *plane.v_dir(),
            start_bearing,
            curvature0,
            curvature1,
            length,
            reversed: false,
            integration_intervals,
        })
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub fn start_bearing(&self) -> f64 {
        self.start_bearing
    }

    /// Curvature at the start and end of the defining (unreversed) spiral.
    #[must_use]
    pub fn curvatures(&self) -> (f64, f64) {
        (self.curvature0, self.curvature1)
    }

    /// Signed curvature at `fraction` of the current direction.
    #[must_use]
    pub fn curvature_at_fraction(&self, fraction: f64) -> f64 {
        let k = self.curvature_at_distance(self.defining_fraction(fraction) * self.length);
        if self.reversed {
            -k
        } else {
            k
        }
    }

    fn defining_fraction(&self, fraction: f64) -> f64 {
        let f = fraction.clamp(0.0, 1.0);
        if self.reversed {
            1.0 - f
        } else {
            f
        }
    }

    fn curvature_at_distance(&self, s: f64) -> f64 {
        self.curvature0 + (self.curvature1 - self.curvature0) * s / self.length
    }

    fn heading_at_distance(&self, s: f64) -> f64 {
        self.start_bearing
            + self.curvature0 * s
            + (self.curvature1 - self.curvature0) * s * s / (2.0 * self.length)
    }

    fn direction(&self, heading: f64) -> Vector3 {
        let (s, c) = heading.sin_cos();
        self.u_dir * c + self.v_dir * s
    }

    fn point_at_distance(&self, s: f64) -> Point3 {
        if s <= 0.0 {
            return self.origin;
        }
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let intervals = ((self.integration_intervals as f64) * s / self.length).ceil().max(1.0) as usize;
        let x = quadrature::integrate(0.0, s, intervals, |t| self.heading_at_distance(t).cos());
        let y = quadrature::integrate(0.0, s, intervals, |t| self.heading_at_distance(t).sin());
        self.origin + self.u_dir * x + self.v_dir * y
    }
}

/// Integral of `|k(s)|` over the spiral.
fn total_turn(curvature0: f64, curvature1: f64, length: f64) -> f64 {
    if curvature0 * curvature1 >= 0.0 {
        0.5 * (curvature0 + curvature1).abs() * length
    } else {
        0.5 * (curvature0 * curvature0 + curvature1 * curvature1) / (curvature1 - curvature0).abs()
            * length
    }
}

impl CurvePrimitive for TransitionSpiral3d {
    fn as_curve(&self) -> &dyn CurvePrimitive {
        self
    }

    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        self.point_at_distance(self.defining_fraction(fraction) * self.length)
    }

    fn fraction_to_point_and_derivative(&self, fraction: f64) -> Ray3 {
        let s = self.defining_fraction(fraction) * self.length;
        let mut tangent = self.direction(self.heading_at_distance(s)) * self.length;
        if self.reversed {
            tangent = -tangent;
        }
        Ray3::new(self.point_at_distance(s), tangent)
    }

    fn fraction_to_point_and_2_derivatives(&self, fraction: f64) -> PointAnd2Derivatives {
        let s = self.defining_fraction(fraction) * self.length;
        let heading = self.heading_at_distance(s);
        let mut tangent = self.direction(heading) * self.length;
        if self.reversed {
            tangent = -tangent;
        }
        let normal = self.direction(heading + std::f64::consts::FRAC_PI_2);
        let second = normal * (self.curvature_at_distance(s) * self.length * self.length);
        PointAnd2Derivatives::new(self.point_at_distance(s), tangent, second)
    }

    fn compute_stroke_count_for_options(&self, options: Option<&StrokeOptions>) -> usize {
        let max_curvature = self.curvature0.abs().max(self.curvature1.abs());
        let radius = (max_curvature > TOLERANCE).then(|| 1.0 / max_curvature);
        resolve(options).stroke_count(
            self.length,
            total_turn(self.curvature0, self.curvature1, self.length),
            radius,
        )
    }

    fn emit_strokable_parts<'a>(
        &'a self,
        handler: &mut dyn StrokeHandler<'a>,
        options: Option<&StrokeOptions>,
    ) {
        handler.start_curve_primitive(self);
        let n = self.compute_stroke_count_for_options(options);
        handler.announce_interval_for_uniform_stepping(self, n, 0.0, 1.0);
        handler.end_curve_primitive(self);
    }

    fn curve_length(&self) -> f64 {
        self.length
    }

    fn quick_length(&self) -> f64 {
        self.length
    }

    fn curve_length_between_fractions(&self, fraction0: f64, fraction1: f64) -> f64 {
        (fraction1.clamp(0.0, 1.0) - fraction0.clamp(0.0, 1.0)).abs() * self.length
    }

    /// Arc-length parameterized, so the walk is exact; the spiral never
    /// extrapolates.
    fn move_signed_distance_from_fraction(
        &self,
        start_fraction: f64,
        signed_distance: f64,
        _allow_extension: bool,
    ) -> CurveLocationDetail<'_> {
        move_at_constant_speed(self, self.length, start_fraction, signed_distance, false)
    }

    fn reverse_in_place(&mut self) {
        self.reversed = !self.reversed;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::curve::{CurveExtend, CurveSearchStatus};

    fn clothoid() -> TransitionSpiral3d {
        TransitionSpiral3d::new(Point3::origin(), Vector3::z(), 0.0, 0.0, 0.01, 100.0).unwrap()
    }

    #[test]
    fn invalid_parameters_fail() {
        assert!(TransitionSpiral3d::new(Point3::origin(), Vector3::z(), 0.0, 0.0, 0.01, 0.0).is_err());
        assert!(TransitionSpiral3d::new(Point3::origin(), Vector3::zeros(), 0.0, 0.0, 0.01, 1.0).is_err());
        assert!(TransitionSpiral3d::new(Point3::origin(), Vector3::z(), 0.0, f64::NAN, 0.01, 1.0).is_err());
    }

    #[test]
    fn zero_curvature_is_straight() {
        let s = TransitionSpiral3d::new(Point3::origin(), Vector3::z(), 0.0, 0.0, 0.0, 10.0).unwrap();
        assert_relative_eq!(s.fraction_to_point(0.5), Point3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn constant_curvature_is_circular() {
        let radius = 2.0;
        let length = PI * radius / 2.0;
        let s = TransitionSpiral3d::new(Point3::origin(), Vector3::z(), 0.0, 0.5, 0.5, length).unwrap();
        assert_relative_eq!(s.end_point(), Point3::new(2.0, 2.0, 0.0), epsilon = 1e-10);
    }

    #[test]
    fn clothoid_heading_and_curvature() {
        let s = clothoid();
        // heading at the end is k1 * L / 2 = 0.5 rad
        let ray = s.fraction_to_point_and_derivative(1.0);
        assert_relative_eq!(ray.direction.norm(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(ray.direction.y.atan2(ray.direction.x), 0.5, epsilon = 1e-12);
        let d2 = s.fraction_to_point_and_2_derivatives(0.5);
        assert_relative_eq!(d2.vector_v.norm(), 0.005 * 100.0 * 100.0, epsilon = 1e-9);
        // endpoint against the Fresnel series x = L(1 - t^2/10), y = L t / 3 (1 - t^2/14) with t = 0.5
        let end = s.end_point();
        assert_relative_eq!(end.x, 100.0 * (1.0 - 0.025 + 0.25 * 0.25 / 216.0), epsilon = 1e-3);
        assert_relative_eq!(end.y, 100.0 * 0.5 / 3.0 * (1.0 - 0.25 / 14.0), epsilon = 1e-2);
    }

    #[test]
    fn fractions_clamp() {
        let s = clothoid();
        assert!(!s.is_extensible_fraction_space());
        assert_relative_eq!(s.fraction_to_point(1.5), s.end_point());
        assert_relative_eq!(s.fraction_to_point(-0.5), s.start_point());
    }

    #[test]
    fn reversal_swaps_ends_and_negates_curvature() {
        let mut s = clothoid();
        let (p0, p1) = (s.start_point(), s.end_point());
        s.reverse_in_place();
        assert_relative_eq!(s.start_point(), p1);
        assert_relative_eq!(s.end_point(), p0);
        assert_relative_eq!(s.curvature_at_fraction(0.0), -0.01);
        s.reverse_in_place();
        assert_relative_eq!(s.start_point(), p0);
    }

    #[test]
    fn move_never_extends() {
        let s = clothoid();
        let d = s.move_signed_distance_from_fraction(0.5, 80.0, true);
        assert_eq!(d.status, Some(CurveSearchStatus::StoppedAtBoundary));
        assert_relative_eq!(d.a, 50.0);
    }

    #[test]
    fn closest_point_round_trip() {
        let s = clothoid();
        let target = s.fraction_to_point(0.37);
        let d = s.closest_point(&target, CurveExtend::NONE).unwrap();
        assert_relative_eq!(d.fraction, 0.37, epsilon = 1e-8);
        assert!(d.a < 1e-8);
    }

    #[test]
    fn length_matches_quadrature() {
        let s = clothoid();
        assert_relative_eq!(s.curve_length(), 100.0);
        let by_strokes = crate::operations::query::curve_length_by_strokes(&s, None);
        assert_relative_eq!(by_strokes, 100.0, epsilon = 1e-9);
    }
}
