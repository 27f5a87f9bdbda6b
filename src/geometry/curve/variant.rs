use crate::geometry::chain::CurveChainWithDistanceIndex;
use crate::geometry::{Plane, PointAnd2Derivatives, Ray3};
use crate::math::Point3;
use crate::tessellation::StrokeOptions;

use super::{
    Arc3d, BezierCurve3d, CurveExtend, CurveLocationDetail, CurvePrimitive, LineSegment3d,
    LineString3d, StrokeHandler, TransitionSpiral3d,
};

/// Discriminant of a [`Curve`], used for pairwise dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveKind {
    LineSegment,
    LineString,
    Arc,
    Spiral,
    Bezier,
    Chain,
}

/// Any curve the crate knows about.
///
/// Details returned through the enum refer to the enum value itself, so
/// identity checks against the `Curve` a caller holds succeed.
#[derive(Debug, Clone)]
pub enum Curve {
    LineSegment(LineSegment3d),
    LineString(LineString3d),
    Arc(Arc3d),
    Spiral(TransitionSpiral3d),
    Bezier(BezierCurve3d),
    Chain(Box<CurveChainWithDistanceIndex>),
}

impl Curve {
    #[must_use]
    pub fn kind(&self) -> CurveKind {
        match self {
            Self::LineSegment(_) => CurveKind::LineSegment,
            Self::LineString(_) => CurveKind::LineString,
            Self::Arc(_) => CurveKind::Arc,
            Self::Spiral(_) => CurveKind::Spiral,
            Self::Bezier(_) => CurveKind::Bezier,
            Self::Chain(_) => CurveKind::Chain,
        }
    }

    /// The wrapped curve as a trait object.
    #[must_use]
    pub fn inner(&self) -> &dyn CurvePrimitive {
        match self {
            Self::LineSegment(c) => c,
            Self::LineString(c) => c,
            Self::Arc(c) => c,
            Self::Spiral(c) => c,
            Self::Bezier(c) => c,
            Self::Chain(c) => c.as_ref(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn CurvePrimitive {
        match self {
            Self::LineSegment(c) => c,
            Self::LineString(c) => c,
            Self::Arc(c) => c,
            Self::Spiral(c) => c,
            Self::Bezier(c) => c,
            Self::Chain(c) => c.as_mut(),
        }
    }

    /// Re-targets a detail produced by the wrapped curve at `self`.
    fn rebase<'a>(&'a self, detail: CurveLocationDetail<'a>) -> CurveLocationDetail<'a> {
        CurveLocationDetail {
            curve: Some(self),
            ..detail
        }
    }
}

impl CurvePrimitive for Curve {
    fn as_curve(&self) -> &dyn CurvePrimitive {
        self
    }

    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        self.inner().fraction_to_point(fraction)
    }

    fn fraction_to_point_and_derivative(&self, fraction: f64) -> Ray3 {
        self.inner().fraction_to_point_and_derivative(fraction)
    }

    fn fraction_to_point_and_2_derivatives(&self, fraction: f64) -> PointAnd2Derivatives {
        self.inner().fraction_to_point_and_2_derivatives(fraction)
    }

    fn start_point(&self) -> Point3 {
        self.inner().start_point()
    }

    fn end_point(&self) -> Point3 {
        self.inner().end_point()
    }

    fn is_extensible_fraction_space(&self) -> bool {
        self.inner().is_extensible_fraction_space()
    }

    fn compute_stroke_count_for_options(&self, options: Option<&StrokeOptions>) -> usize {
        self.inner().compute_stroke_count_for_options(options)
    }

    fn emit_strokable_parts<'a>(
        &'a self,
        handler: &mut dyn StrokeHandler<'a>,
        options: Option<&StrokeOptions>,
    ) {
        self.inner().emit_strokable_parts(handler, options);
    }

    fn curve_length(&self) -> f64 {
        self.inner().curve_length()
    }

    fn quick_length(&self) -> f64 {
        self.inner().quick_length()
    }

    fn curve_length_between_fractions(&self, fraction0: f64, fraction1: f64) -> f64 {
        self.inner().curve_length_between_fractions(fraction0, fraction1)
    }

    fn closest_point(&self, space_point: &Point3, extend: CurveExtend) -> Option<CurveLocationDetail<'_>> {
        self.inner()
            .closest_point(space_point, extend)
            .map(|detail| self.rebase(detail))
    }

    fn append_plane_intersections<'a>(
        &'a self,
        plane: &Plane,
        out: &mut Vec<CurveLocationDetail<'a>>,
    ) -> usize {
        let before = out.len();
        let added = self.inner().append_plane_intersections(plane, out);
        for detail in &mut out[before..] {
            detail.curve = Some(self);
        }
        added
    }

    fn move_signed_distance_from_fraction(
        &self,
        start_fraction: f64,
        signed_distance: f64,
        allow_extension: bool,
    ) -> CurveLocationDetail<'_> {
        let detail = self
            .inner()
            .move_signed_distance_from_fraction(start_fraction, signed_distance, allow_extension);
        self.rebase(detail)
    }

    fn reverse_in_place(&mut self) {
        self.inner_mut().reverse_in_place();
    }
}

impl From<LineSegment3d> for Curve {
    fn from(curve: LineSegment3d) -> Self {
        Self::LineSegment(curve)
    }
}

impl From<LineString3d> for Curve {
    fn from(curve: LineString3d) -> Self {
        Self::LineString(curve)
    }
}

impl From<Arc3d> for Curve {
    fn from(curve: Arc3d) -> Self {
        Self::Arc(curve)
    }
}

impl From<TransitionSpiral3d> for Curve {
    fn from(curve: TransitionSpiral3d) -> Self {
        Self::Spiral(curve)
    }
}

impl From<BezierCurve3d> for Curve {
    fn from(curve: BezierCurve3d) -> Self {
        Self::Bezier(curve)
    }
}

impl From<CurveChainWithDistanceIndex> for Curve {
    fn from(chain: CurveChainWithDistanceIndex) -> Self {
        Self::Chain(Box::new(chain))
    }
}
