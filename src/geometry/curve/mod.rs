mod arc;
mod bezier;
mod line_segment;
mod line_string;
mod location;
mod spiral;
mod stroke;
mod variant;

pub use arc::Arc3d;
pub use bezier::BezierCurve3d;
pub use line_segment::LineSegment3d;
pub use line_string::LineString3d;
pub use location::{
    same_curve, CurveIntervalRole, CurveLocationDetail, CurveLocationDetailPair,
    CurveSearchStatus,
};
pub use spiral::TransitionSpiral3d;
pub use stroke::StrokeHandler;
pub use variant::{Curve, CurveKind};

pub(crate) use stroke::step_fraction;

use std::fmt;

use crate::geometry::{Plane, PointAnd2Derivatives, Ray3};
use crate::math::{newton::Newton1d, quadrature, Point3, TOLERANCE};
use crate::operations::query::{
    closest_point_by_strokes, curve_length_by_strokes, plane_intersections_by_strokes,
};
use crate::tessellation::StrokeOptions;

/// Per-end permission for a search to run past a curve's nominal `[0, 1]`
/// fraction range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CurveExtend {
    pub at_start: bool,
    pub at_end: bool,
}

impl CurveExtend {
    /// No extension at either end.
    pub const NONE: Self = Self::new(false, false);
    /// Extension at both ends.
    pub const BOTH: Self = Self::new(true, true);

    #[must_use]
    pub const fn new(at_start: bool, at_end: bool) -> Self {
        Self { at_start, at_end }
    }

    /// Keeps only the permissions of the ends that are true curve ends.
    #[must_use]
    pub fn restrict(self, is_first: bool, is_last: bool) -> Self {
        Self::new(self.at_start && is_first, self.at_end && is_last)
    }

    /// Whether `fraction` is acceptable under these permissions.
    #[must_use]
    pub fn accepts_fraction(self, fraction: f64) -> bool {
        (self.at_start || fraction >= -TOLERANCE) && (self.at_end || fraction <= 1.0 + TOLERANCE)
    }

    /// Clamps `fraction` at the ends where extension is not allowed.
    #[must_use]
    pub fn clamp_fraction(self, fraction: f64) -> f64 {
        let low = if self.at_start { fraction } else { fraction.max(0.0) };
        if self.at_end {
            low
        } else {
            low.min(1.0)
        }
    }
}

impl From<bool> for CurveExtend {
    fn from(extend: bool) -> Self {
        Self::new(extend, extend)
    }
}

/// The evaluation contract every curve kind implements.
///
/// Fractions run from 0 at the start point to 1 at the end point.
/// Derivatives are taken with respect to fraction, so their magnitude scales
/// with the curve's size. Searches that have no closed form for a kind fall
/// back on the stroke-driven defaults, which only need
/// [`emit_strokable_parts`](Self::emit_strokable_parts) and the evaluators.
pub trait CurvePrimitive: fmt::Debug + Send + Sync {
    /// This curve as a trait object.
    fn as_curve(&self) -> &dyn CurvePrimitive;

    /// Evaluates the point at `fraction`.
    fn fraction_to_point(&self, fraction: f64) -> Point3;

    /// Evaluates the point and the first derivative at `fraction`.
    fn fraction_to_point_and_derivative(&self, fraction: f64) -> Ray3;

    /// Evaluates the point and the first two derivatives at `fraction`.
    fn fraction_to_point_and_2_derivatives(&self, fraction: f64) -> PointAnd2Derivatives;

    fn start_point(&self) -> Point3 {
        self.fraction_to_point(0.0)
    }

    fn end_point(&self) -> Point3 {
        self.fraction_to_point(1.0)
    }

    /// Whether evaluation extrapolates (rather than clamps) outside `[0, 1]`.
    fn is_extensible_fraction_space(&self) -> bool {
        false
    }

    /// Number of strokes `options` asks for on this curve (at least 1).
    fn compute_stroke_count_for_options(&self, options: Option<&StrokeOptions>) -> usize;

    /// Announces this curve's geometry to `handler`.
    fn emit_strokable_parts<'a>(
        &'a self,
        handler: &mut dyn StrokeHandler<'a>,
        options: Option<&StrokeOptions>,
    );

    /// Arc length of the whole curve.
    fn curve_length(&self) -> f64 {
        curve_length_by_strokes(self.as_curve(), None)
    }

    /// Fast estimate for tolerancing: never below the true length and at
    /// most `pi / 2` times it.
    fn quick_length(&self) -> f64;

    /// Non-negative arc length between two fractions.
    fn curve_length_between_fractions(&self, fraction0: f64, fraction1: f64) -> f64 {
        let strokes = self.compute_stroke_count_for_options(None);
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let intervals = ((fraction1 - fraction0).abs() * strokes as f64).ceil().max(1.0) as usize;
        quadrature::integrate(fraction0, fraction1, intervals, |f| {
            self.fraction_to_point_and_derivative(f).direction.norm()
        })
        .abs()
    }

    /// Closest point to `space_point`; `a` on the result is the distance.
    fn closest_point(&self, space_point: &Point3, extend: CurveExtend) -> Option<CurveLocationDetail<'_>> {
        closest_point_by_strokes(self.as_curve(), space_point, extend)
    }

    /// Appends intersections with `plane` and returns how many were added.
    fn append_plane_intersections<'a>(
        &'a self,
        plane: &Plane,
        out: &mut Vec<CurveLocationDetail<'a>>,
    ) -> usize {
        plane_intersections_by_strokes(self.as_curve(), plane, out)
    }

    /// Walks `signed_distance` along the curve from `start_fraction`.
    ///
    /// When the walk would leave `[0, 1]` and extension is not allowed (or the
    /// curve cannot extrapolate), the result stops at the end with status
    /// [`CurveSearchStatus::StoppedAtBoundary`]; `a` holds the distance
    /// actually travelled.
    fn move_signed_distance_from_fraction(
        &self,
        start_fraction: f64,
        signed_distance: f64,
        allow_extension: bool,
    ) -> CurveLocationDetail<'_> {
        move_signed_distance_generic(self.as_curve(), start_fraction, signed_distance, allow_extension)
    }

    /// Reverses the direction of the curve.
    fn reverse_in_place(&mut self);
}

/// Distance walk for curves whose speed `|X'(f)|` is the constant `length`.
pub(crate) fn move_at_constant_speed(
    curve: &dyn CurvePrimitive,
    length: f64,
    start_fraction: f64,
    signed_distance: f64,
    allow_extension: bool,
) -> CurveLocationDetail<'_> {
    if length <= TOLERANCE {
        return CurveLocationDetail::from_fraction(curve, start_fraction)
            .with_status(CurveSearchStatus::Error);
    }
    let fraction = start_fraction + signed_distance / length;
    if allow_extension || (0.0..=1.0).contains(&fraction) {
        return CurveLocationDetail::from_fraction(curve, fraction)
            .with_a(signed_distance)
            .with_status(CurveSearchStatus::Success);
    }
    let clamped = fraction.clamp(0.0, 1.0);
    CurveLocationDetail::from_fraction(curve, clamped)
        .with_a((clamped - start_fraction) * length)
        .with_status(CurveSearchStatus::StoppedAtBoundary)
}

/// Distance walk for curves without a closed form: bounded Newton on
/// `length(start, f) - distance`, whose derivative is the speed `|X'(f)|`.
pub(crate) fn move_signed_distance_generic(
    curve: &dyn CurvePrimitive,
    start_fraction: f64,
    signed_distance: f64,
    allow_extension: bool,
) -> CurveLocationDetail<'_> {
    let forward = signed_distance >= 0.0;
    let end_fraction = if forward { 1.0 } else { 0.0 };
    let available = curve.curve_length_between_fractions(start_fraction, end_fraction);
    let wanted = signed_distance.abs();

    if wanted <= TOLERANCE {
        return CurveLocationDetail::from_fraction(curve, start_fraction)
            .with_a(0.0)
            .with_status(CurveSearchStatus::Success);
    }
    let extend = allow_extension && curve.is_extensible_fraction_space();
    if wanted > available && !extend {
        let sign = if forward { 1.0 } else { -1.0 };
        return CurveLocationDetail::from_fraction(curve, end_fraction)
            .with_a(sign * available)
            .with_status(CurveSearchStatus::StoppedAtBoundary);
    }

    let speed = curve.fraction_to_point_and_derivative(start_fraction).direction.norm();
    let seed = if available > TOLERANCE && wanted <= available {
        start_fraction + (end_fraction - start_fraction) * wanted / available
    } else if speed > TOLERANCE {
        start_fraction + signed_distance / speed
    } else {
        return CurveLocationDetail::from_fraction(curve, start_fraction)
            .with_status(CurveSearchStatus::Error);
    };

    let result = Newton1d::new().solve(seed, |f| {
        let mut travelled = curve.curve_length_between_fractions(start_fraction, f);
        if f < start_fraction {
            travelled = -travelled;
        }
        let speed = curve.fraction_to_point_and_derivative(f).direction.norm();
        Some((travelled - signed_distance, speed))
    });
    CurveLocationDetail::from_fraction(curve, result.x)
        .with_a(signed_distance)
        .with_status(CurveSearchStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_from_bool_sets_both_ends() {
        assert_eq!(CurveExtend::from(true), CurveExtend::BOTH);
        assert_eq!(CurveExtend::from(false), CurveExtend::NONE);
    }

    #[test]
    fn restrict_keeps_only_true_ends() {
        let e = CurveExtend::BOTH.restrict(true, false);
        assert!(e.at_start);
        assert!(!e.at_end);
    }

    #[test]
    fn accepts_fraction_per_end() {
        let start_only = CurveExtend::new(true, false);
        assert!(start_only.accepts_fraction(-0.5));
        assert!(!start_only.accepts_fraction(1.5));
        assert!(CurveExtend::NONE.accepts_fraction(1.0 + 0.5 * TOLERANCE));
    }

    #[test]
    fn clamp_fraction_per_end() {
        assert!((CurveExtend::NONE.clamp_fraction(-0.2)).abs() < f64::EPSILON);
        assert!((CurveExtend::new(false, true).clamp_fraction(1.7) - 1.7).abs() < f64::EPSILON);
    }
}
