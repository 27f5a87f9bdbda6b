use crate::error::{GeometryError, Result};
use crate::geometry::{Plane, PointAnd2Derivatives, Ray3};
use crate::math::{interpolate_point, is_almost_equal_point, Point3, Vector3, TOLERANCE};
use crate::tessellation::{resolve, StrokeOptions};

use super::{
    step_fraction, CurveExtend, CurveIntervalRole, CurveLocationDetail, CurvePrimitive,
    CurveSearchStatus, LineSegment3d, StrokeHandler,
};

/// A polyline through two or more points.
///
/// Fraction is distributed by edge index, not by length: edge `i` of `n`
/// covers `[i/n, (i+1)/n]`. Fractions outside `[0, 1]` extrapolate the first
/// and last edges.
#[derive(Debug, Clone, PartialEq)]
pub struct LineString3d {
    points: Vec<Point3>,
}

impl LineString3d {
    /// Creates a linestring.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two points are given.
    pub fn new(points: Vec<Point3>) -> Result<Self> {
        if points.len() < 2 {
            return Err(
                GeometryError::Degenerate("linestring needs at least two points".into()).into(),
            );
        }
        Ok(Self { points })
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.points.len() - 1
    }

    /// Edge `index` as a segment, if it exists.
    #[must_use]
    pub fn edge(&self, index: usize) -> Option<LineSegment3d> {
        let p0 = self.points.get(index)?;
        let p1 = self.points.get(index + 1)?;
        Some(LineSegment3d::new(*p0, *p1))
    }

    /// Whether the last point coincides with the first.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.points.len() > 2
            && is_almost_equal_point(&self.points[0], &self.points[self.points.len() - 1])
    }

    /// Maps a fraction on edge `index` to the linestring's fraction.
    #[must_use]
    pub fn edge_fraction_to_global(&self, index: usize, edge_fraction: f64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = self.num_edges() as f64;
        #[allow(clippy::cast_precision_loss)]
        let i = index as f64;
        (i + edge_fraction) / n
    }

    /// Edge index and local fraction for a global fraction.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn locate(&self, fraction: f64) -> (usize, f64) {
        let n = self.num_edges();
        let scaled = fraction * n as f64;
        let index = if scaled <= 0.0 {
            0
        } else {
            (scaled.floor() as usize).min(n - 1)
        };
        (index, scaled - index as f64)
    }

    fn edge_vector(&self, index: usize) -> Vector3 {
        self.points[index + 1] - self.points[index]
    }

    fn edge_length(&self, index: usize) -> f64 {
        self.edge_vector(index).norm()
    }

    /// Signed arc length from the start to `fraction`.
    fn length_at(&self, fraction: f64) -> f64 {
        let (index, local) = self.locate(fraction);
        let before: f64 = (0..index).map(|i| self.edge_length(i)).sum();
        before + local * self.edge_length(index)
    }
}

impl CurvePrimitive for LineString3d {
    fn as_curve(&self) -> &dyn CurvePrimitive {
        self
    }

    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        let (index, local) = self.locate(fraction);
        interpolate_point(&self.points[index], local, &self.points[index + 1])
    }

    fn fraction_to_point_and_derivative(&self, fraction: f64) -> Ray3 {
        let (index, local) = self.locate(fraction);
        #[allow(clippy::cast_precision_loss)]
        let n = self.num_edges() as f64;
        Ray3::new(
            interpolate_point(&self.points[index], local, &self.points[index + 1]),
            self.edge_vector(index) * n,
        )
    }

    fn fraction_to_point_and_2_derivatives(&self, fraction: f64) -> PointAnd2Derivatives {
        let ray = self.fraction_to_point_and_derivative(fraction);
        PointAnd2Derivatives::new(ray.origin, ray.direction, Vector3::zeros())
    }

    fn start_point(&self) -> Point3 {
        self.points[0]
    }

    fn end_point(&self) -> Point3 {
        self.points[self.points.len() - 1]
    }

    fn is_extensible_fraction_space(&self) -> bool {
        true
    }

    fn compute_stroke_count_for_options(&self, options: Option<&StrokeOptions>) -> usize {
        let options = resolve(options);
        (0..self.num_edges())
            .map(|i| options.stroke_count(self.edge_length(i), 0.0, None))
            .sum()
    }

    fn emit_strokable_parts<'a>(
        &'a self,
        handler: &mut dyn StrokeHandler<'a>,
        options: Option<&StrokeOptions>,
    ) {
        let resolved = resolve(options);
        let n = self.num_edges();
        handler.start_curve_primitive(self);
        for i in 0..n {
            let strokes = resolved.stroke_count(self.edge_length(i), 0.0, None);
            handler.announce_segment_interval(
                self,
                self.points[i],
                self.points[i + 1],
                strokes,
                step_fraction(0.0, 1.0, i, n),
                step_fraction(0.0, 1.0, i + 1, n),
            );
        }
        handler.end_curve_primitive(self);
    }

    fn curve_length(&self) -> f64 {
        (0..self.num_edges()).map(|i| self.edge_length(i)).sum()
    }

    fn quick_length(&self) -> f64 {
        self.curve_length()
    }

    fn curve_length_between_fractions(&self, fraction0: f64, fraction1: f64) -> f64 {
        (self.length_at(fraction1) - self.length_at(fraction0)).abs()
    }

    fn closest_point(&self, space_point: &Point3, extend: CurveExtend) -> Option<CurveLocationDetail<'_>> {
        let n = self.num_edges();
        let mut best: Option<(f64, f64)> = None;
        for i in 0..n {
            let Some(edge) = self.edge(i) else { continue };
            let Some(local) = edge.project_fraction(space_point) else {
                continue;
            };
            let local = extend.restrict(i == 0, i + 1 == n).clamp_fraction(local);
            let distance = (edge.fraction_to_point(local) - space_point).norm();
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((self.edge_fraction_to_global(i, local), distance));
            }
        }
        let (fraction, distance) = best?;
        Some(CurveLocationDetail::from_fraction_with_tangent(self, fraction).with_a(distance))
    }

    fn append_plane_intersections<'a>(
        &'a self,
        plane: &Plane,
        out: &mut Vec<CurveLocationDetail<'a>>,
    ) -> usize {
        let n = self.num_edges();
        let closed = self.is_closed();
        let before = out.len();
        for i in 0..n {
            let h0 = plane.altitude(&self.points[i]);
            let h1 = plane.altitude(&self.points[i + 1]);
            if h0.abs() <= TOLERANCE {
                let role = if i == 0 {
                    CurveIntervalRole::Isolated
                } else {
                    CurveIntervalRole::IsolatedAtVertex
                };
                out.push(
                    CurveLocationDetail::from_fraction(self, self.edge_fraction_to_global(i, 0.0))
                        .with_interval_role(role),
                );
            } else if h1.abs() > TOLERANCE && h0 * h1 < 0.0 {
                let local = h0 / (h0 - h1);
                out.push(
                    CurveLocationDetail::from_fraction(self, self.edge_fraction_to_global(i, local))
                        .with_interval_role(CurveIntervalRole::Isolated),
                );
            }
        }
        if !closed && plane.altitude(&self.end_point()).abs() <= TOLERANCE {
            out.push(
                CurveLocationDetail::from_fraction(self, 1.0)
                    .with_interval_role(CurveIntervalRole::Isolated),
            );
        }
        out.len() - before
    }

    fn move_signed_distance_from_fraction(
        &self,
        start_fraction: f64,
        signed_distance: f64,
        allow_extension: bool,
    ) -> CurveLocationDetail<'_> {
        let total = self.curve_length();
        if total <= TOLERANCE {
            return CurveLocationDetail::from_fraction(self, start_fraction)
                .with_status(CurveSearchStatus::Error);
        }
        let start = self.length_at(start_fraction);
        let mut target = start + signed_distance;
        let mut status = CurveSearchStatus::Success;
        if !allow_extension && !(0.0..=total).contains(&target) {
            target = target.clamp(0.0, total);
            status = CurveSearchStatus::StoppedAtBoundary;
        }

        let n = self.num_edges();
        let mut edge_start = 0.0;
        let mut fraction = 1.0;
        for i in 0..n {
            let len = self.edge_length(i);
            let last = i + 1 == n;
            if target <= edge_start + len || last {
                // extrapolating before the start uses the first edge
                let local = if len > TOLERANCE { (target - edge_start) / len } else { 0.0 };
                fraction = self.edge_fraction_to_global(i, local);
                break;
            }
            edge_start += len;
        }
        CurveLocationDetail::from_fraction(self, fraction)
            .with_a(target - start)
            .with_status(status)
    }

    fn reverse_in_place(&mut self) {
        self.points.reverse();
    }
}
