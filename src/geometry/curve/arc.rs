use std::f64::consts::{FRAC_PI_4, TAU};

use crate::error::{GeometryError, Result};
use crate::geometry::{Plane, PointAnd2Derivatives, Ray3};
use crate::math::{
    normalize, quadrature, AngleSweep, Matrix2, Point3, Vector2, Vector3, SMALL_ANGLE, TOLERANCE,
};
use crate::operations::query::closest_point_by_strokes;
use crate::tessellation::{resolve, StrokeOptions};

use super::{
    move_at_constant_speed, move_signed_distance_generic, CurveExtend, CurveIntervalRole,
    CurveLocationDetail, CurvePrimitive, StrokeHandler,
};

/// Stop refining the elliptic quick length once the tangent polygon is
/// within this factor of the chord sum.
const QUICK_LENGTH_RATIO: f64 = 1.25;

const MAX_QUICK_LENGTH_PIECES: usize = 1024;

/// A circular or elliptic arc in 3D space.
///
/// The parametric form is `P(theta) = center + vector0 cos(theta) + vector90 sin(theta)`
/// with `theta = sweep.start + f * sweep.sweep`. The two vectors need not be
/// perpendicular or of equal length; when they are, the arc is circular.
/// Fractions outside `[0, 1]` continue around the full ellipse.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc3d {
    center: Point3,
    vector0: Vector3,
    vector90: Vector3,
    sweep: AngleSweep,
}

impl Arc3d {
    /// Creates an arc from its center, the two axis vectors and the sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if either vector is zero-length, the vectors are
    /// parallel, or the sweep is zero.
    pub fn new(center: Point3, vector0: Vector3, vector90: Vector3, sweep: AngleSweep) -> Result<Self> {
        if vector0.norm() < TOLERANCE || vector90.norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        if vector0.cross(&vector90).norm() <= TOLERANCE * vector0.norm() * vector90.norm() {
            return Err(GeometryError::Degenerate("arc axis vectors are parallel".into()).into());
        }
        if sweep.sweep().abs() <= SMALL_ANGLE {
            return Err(GeometryError::Degenerate("arc sweep must be non-zero".into()).into());
        }
        Ok(Self {
            center,
            vector0,
            vector90,
            sweep,
        })
    }

    /// Creates a circular arc.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the arc circle
    /// * `radius` - Radius (must be positive)
    /// * `normal` - Normal vector defining the arc plane; the arc runs
    ///   counter-clockwise around it for a positive sweep
    /// * `ref_dir` - Direction of angle zero (must be perpendicular to normal)
    /// * `sweep` - Start angle and signed sweep in radians
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, a vector is zero-length,
    /// or the reference direction is not perpendicular to the normal.
    pub fn circular_arc(
        center: Point3,
        radius: f64,
        normal: Vector3,
        ref_dir: Vector3,
        sweep: AngleSweep,
    ) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(GeometryError::Degenerate("arc radius must be positive".into()).into());
        }
        let normal = normalize(&normal).ok_or(GeometryError::ZeroVector)?;
        let ref_dir = normalize(&ref_dir).ok_or(GeometryError::ZeroVector)?;
        if normal.dot(&ref_dir).abs() > TOLERANCE {
            return Err(GeometryError::Degenerate(
                "reference direction must be perpendicular to normal".into(),
            )
            .into());
        }
        Self::new(center, ref_dir * radius, normal.cross(&ref_dir) * radius, sweep)
    }

    /// Creates a full circle in the plane with the given normal.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive or the normal is zero.
    pub fn circle(center: Point3, radius: f64, normal: Vector3) -> Result<Self> {
        let plane = Plane::from_normal(center, normal)?;
        Self::circular_arc(center, radius, *plane.normal(), *plane.u_dir(), AngleSweep::full_circle())
    }

    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    #[must_use]
    pub fn vector0(&self) -> &Vector3 {
        &self.vector0
    }

    #[must_use]
    pub fn vector90(&self) -> &Vector3 {
        &self.vector90
    }

    #[must_use]
    pub fn sweep(&self) -> &AngleSweep {
        &self.sweep
    }

    /// `vector0 x vector90`, the (unnormalized) normal of the arc plane.
    #[must_use]
    pub fn perpendicular(&self) -> Vector3 {
        self.vector0.cross(&self.vector90)
    }

    /// Plane containing the arc.
    ///
    /// # Errors
    ///
    /// Cannot fail for an arc built by the constructors.
    pub fn plane(&self) -> Result<Plane> {
        Plane::from_normal(self.center, self.perpendicular())
    }

    /// Whether the axis vectors are perpendicular and of equal length.
    #[must_use]
    pub fn is_circular(&self) -> bool {
        self.circular_radius().is_some()
    }

    /// The radius if the arc is circular.
    #[must_use]
    pub fn circular_radius(&self) -> Option<f64> {
        let r0 = self.vector0.norm();
        let r90 = self.vector90.norm();
        let scale = r0.max(r90);
        let equal = (r0 - r90).abs() <= TOLERANCE * scale;
        let perpendicular = self.vector0.dot(&self.vector90).abs() <= TOLERANCE * scale * scale;
        (equal && perpendicular).then_some(r0)
    }

    #[must_use]
    pub fn is_full_circle(&self) -> bool {
        self.sweep.is_full_circle()
    }

    /// Larger of the two axis lengths.
    #[must_use]
    pub fn max_axis_length(&self) -> f64 {
        self.vector0.norm().max(self.vector90.norm())
    }

    /// Evaluates the ellipse at an angle (not a fraction).
    #[must_use]
    pub fn radians_to_point(&self, radians: f64) -> Point3 {
        let (s, c) = radians.sin_cos();
        self.center + self.vector0 * c + self.vector90 * s
    }

    /// Maps an angle to a fraction, preferring the representative in `[0, 1]`.
    #[must_use]
    pub fn radians_to_fraction(&self, radians: f64) -> f64 {
        self.sweep.radians_to_signed_periodic_fraction(radians)
    }

    /// Coordinates of `point` in the `(vector0, vector90)` frame after
    /// subtracting the center; the out-of-plane part is dropped.
    #[must_use]
    pub fn world_to_local(&self, point: &Point3) -> Option<Vector2> {
        self.world_vector_to_local(&(point - self.center))
    }

    /// Coordinates of a vector in the `(vector0, vector90)` frame.
    #[must_use]
    pub fn world_vector_to_local(&self, vector: &Vector3) -> Option<Vector2> {
        let gram = Matrix2::new(
            self.vector0.dot(&self.vector0),
            self.vector0.dot(&self.vector90),
            self.vector90.dot(&self.vector0),
            self.vector90.dot(&self.vector90),
        );
        let rhs = Vector2::new(self.vector0.dot(vector), self.vector90.dot(vector));
        gram.lu().solve(&rhs)
    }

    /// Angles (over the whole ellipse) where the arc meets `plane`, from
    /// `h0 + hu cos(theta) + hv sin(theta) = 0`. Empty when the ellipse lies
    /// in a plane parallel to `plane`.
    #[must_use]
    pub fn plane_intersection_angles(&self, plane: &Plane) -> Vec<f64> {
        let h0 = plane.altitude(&self.center);
        let hu = plane.velocity(&self.vector0);
        let hv = plane.velocity(&self.vector90);
        let amplitude = hu.hypot(hv);
        if amplitude <= TOLERANCE * self.max_axis_length() {
            return Vec::new();
        }
        let cosine = -h0 / amplitude;
        if cosine.abs() > 1.0 + TOLERANCE {
            return Vec::new();
        }
        let alpha = hv.atan2(hu);
        let offset = cosine.clamp(-1.0, 1.0).acos();
        if offset <= SMALL_ANGLE {
            vec![alpha]
        } else {
            vec![alpha - offset, alpha + offset]
        }
    }

    /// Maps a fraction in `(1, 1 + tol]` on a full circle back to 0.
    pub(crate) fn wrap_full_circle_fraction(&self, fraction: f64) -> f64 {
        if self.is_full_circle() && fraction > 1.0 - TOLERANCE {
            0.0
        } else {
            fraction
        }
    }

    /// Tangent polygon length and chord sum over `pieces` equal angular
    /// steps. Each step is under a half turn, so its arc lies inside the
    /// triangle of its chord and end tangents: the chord sum bounds the
    /// length from below and the tangent polygon from above.
    fn tangent_and_chord_sums(&self, pieces: usize) -> (f64, f64) {
        #[allow(clippy::cast_precision_loss)]
        let count = pieces as f64;
        let step = self.sweep.sweep() / count;
        // tangents at both ends of a step meet at the mid-angle point pushed out by 1 / cos(step / 2)
        let stretch = 1.0 / (0.5 * step).cos();
        let mut tangent = 0.0;
        let mut chord = 0.0;
        let mut previous = self.start_point();
        for i in 0..pieces {
            #[allow(clippy::cast_precision_loss)]
            let theta0 = self.sweep.fraction_to_radians(i as f64 / count);
            let (s, c) = (theta0 + 0.5 * step).sin_cos();
            let corner = self.center + (self.vector0 * c + self.vector90 * s) * stretch;
            let next = self.radians_to_point(theta0 + step);
            tangent += (corner - previous).norm() + (next - corner).norm();
            chord += (next - previous).norm();
            previous = next;
        }
        (tangent, chord)
    }

    /// Circular closest point: the projection's angle and both ends compete.
    fn circular_closest_point(
        &self,
        space_point: &Point3,
        extend: CurveExtend,
    ) -> CurveLocationDetail<'_> {
        let mut candidates = vec![0.0, 1.0];
        if let Some(local) = self.world_to_local(space_point) {
            if local.norm() > TOLERANCE {
                let fraction = self.radians_to_fraction(local.y.atan2(local.x));
                if self.is_full_circle() {
                    candidates.push(self.wrap_full_circle_fraction(fraction));
                } else {
                    // an out-of-sweep angle may still be reachable by extending the other end
                    let period = TAU / self.sweep.sweep().abs();
                    if let Some(reachable) = [fraction, fraction - period, fraction + period]
                        .into_iter()
                        .find(|&f| extend.accepts_fraction(f))
                    {
                        candidates.push(reachable);
                    }
                }
            }
        }
        let mut best = CurveLocationDetail::from_fraction_with_tangent(self, 0.0);
        let mut best_distance = f64::INFINITY;
        for fraction in candidates {
            let detail = CurveLocationDetail::from_fraction_with_tangent(self, fraction);
            let distance = (detail.point - space_point).norm();
            if distance < best_distance {
                best_distance = distance;
                best = detail;
            }
        }
        best.with_a(best_distance)
    }
}

impl CurvePrimitive for Arc3d {
    fn as_curve(&self) -> &dyn CurvePrimitive {
        self
    }

    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        self.radians_to_point(self.sweep.fraction_to_radians(fraction))
    }

    fn fraction_to_point_and_derivative(&self, fraction: f64) -> Ray3 {
        let (s, c) = self.sweep.fraction_to_radians(fraction).sin_cos();
        let point = self.center + self.vector0 * c + self.vector90 * s;
        let derivative = (self.vector90 * c - self.vector0 * s) * self.sweep.sweep();
        Ray3::new(point, derivative)
    }

    fn fraction_to_point_and_2_derivatives(&self, fraction: f64) -> PointAnd2Derivatives {
        let (s, c) = self.sweep.fraction_to_radians(fraction).sin_cos();
        let w = self.sweep.sweep();
        let radial = self.vector0 * c + self.vector90 * s;
        PointAnd2Derivatives::new(
            self.center + radial,
            (self.vector90 * c - self.vector0 * s) * w,
            -radial * (w * w),
        )
    }

    fn is_extensible_fraction_space(&self) -> bool {
        true
    }

    fn compute_stroke_count_for_options(&self, options: Option<&StrokeOptions>) -> usize {
        let r0 = self.vector0.norm();
        let r90 = self.vector90.norm();
        let (small, large) = if r0 < r90 { (r0, r90) } else { (r90, r0) };
        // tightest radius of curvature of the ellipse is at the end of the major axis
        let radius = small * small / large;
        resolve(options).stroke_count(self.quick_length(), self.sweep.sweep(), Some(radius))
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
        self.curve_length_between_fractions(0.0, 1.0)
    }

    fn quick_length(&self) -> f64 {
        let sweep = self.sweep.sweep().abs();
        if let Some(radius) = self.circular_radius() {
            return radius * sweep;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut pieces = ((sweep / FRAC_PI_4).ceil() as usize).max(2);
        loop {
            let (tangent, chord) = self.tangent_and_chord_sums(pieces);
            if tangent <= QUICK_LENGTH_RATIO * chord || pieces >= MAX_QUICK_LENGTH_PIECES {
                return tangent;
            }
            pieces *= 2;
        }
    }

    fn curve_length_between_fractions(&self, fraction0: f64, fraction1: f64) -> f64 {
        if let Some(radius) = self.circular_radius() {
            return (fraction1 - fraction0).abs() * radius * self.sweep.sweep().abs();
        }
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

    fn closest_point(&self, space_point: &Point3, extend: CurveExtend) -> Option<CurveLocationDetail<'_>> {
        if self.is_circular() {
            Some(self.circular_closest_point(space_point, extend))
        } else {
            closest_point_by_strokes(self, space_point, extend)
        }
    }

    fn append_plane_intersections<'a>(
        &'a self,
        plane: &Plane,
        out: &mut Vec<CurveLocationDetail<'a>>,
    ) -> usize {
        let angles = self.plane_intersection_angles(plane);
        let mut fractions: Vec<f64> = angles
            .iter()
            .map(|&theta| self.wrap_full_circle_fraction(self.radians_to_fraction(theta)))
            .filter(|&f| CurveExtend::NONE.accepts_fraction(f))
            .map(|f| f.clamp(0.0, 1.0))
            .collect();
        fractions.sort_by(f64::total_cmp);
        fractions.dedup_by(|a, b| (*a - *b).abs() <= TOLERANCE);

        for &fraction in &fractions {
            out.push(
                CurveLocationDetail::from_fraction(self, fraction)
                    .with_interval_role(CurveIntervalRole::Isolated),
            );
        }
        fractions.len()
    }

    fn move_signed_distance_from_fraction(
        &self,
        start_fraction: f64,
        signed_distance: f64,
        allow_extension: bool,
    ) -> CurveLocationDetail<'_> {
        match self.circular_radius() {
            Some(radius) => move_at_constant_speed(
                self,
                radius * self.sweep.sweep().abs(),
                start_fraction,
                signed_distance,
                allow_extension,
            ),
            None => move_signed_distance_generic(self, start_fraction, signed_distance, allow_extension),
        }
    }

    fn reverse_in_place(&mut self) {
        self.sweep.reverse_in_place();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI, TAU};

    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::curve::CurveSearchStatus;

    fn unit_circle() -> Arc3d {
        Arc3d::new(Point3::origin(), Vector3::x(), Vector3::y(), AngleSweep::full_circle()).unwrap()
    }

    fn quarter() -> Arc3d {
        Arc3d::circular_arc(
            Point3::origin(),
            2.0,
            Vector3::z(),
            Vector3::x(),
            AngleSweep::new(0.0, FRAC_PI_2),
        )
        .unwrap()
    }

    #[test]
    fn constructors_reject_degenerate_input() {
        assert!(Arc3d::new(Point3::origin(), Vector3::x(), Vector3::x(), AngleSweep::full_circle()).is_err());
        assert!(Arc3d::new(Point3::origin(), Vector3::x(), Vector3::y(), AngleSweep::new(0.0, 0.0)).is_err());
        assert!(Arc3d::circle(Point3::origin(), 0.0, Vector3::z()).is_err());
        assert!(Arc3d::circular_arc(
            Point3::origin(),
            1.0,
            Vector3::z(),
            Vector3::new(1.0, 0.0, 1.0),
            AngleSweep::full_circle()
        )
        .is_err());
    }

    #[test]
    fn evaluation_and_derivatives() {
        let arc = quarter();
        assert_relative_eq!(arc.start_point(), Point3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(arc.end_point(), Point3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
        let d = arc.fraction_to_point_and_2_derivatives(0.0);
        assert_relative_eq!(d.vector_u, Vector3::new(0.0, PI, 0.0), epsilon = 1e-12);
        assert_relative_eq!(d.vector_v, Vector3::new(-2.0 * FRAC_PI_2 * FRAC_PI_2, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn circular_length_is_exact() {
        let arc = quarter();
        assert!(arc.is_circular());
        assert_relative_eq!(arc.curve_length(), PI);
        assert_relative_eq!(arc.quick_length(), PI);
    }

    #[test]
    fn elliptic_length_by_quadrature() {
        let arc = Arc3d::new(
            Point3::origin(),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            AngleSweep::full_circle(),
        )
        .unwrap();
        assert!(!arc.is_circular());
        // perimeter of the ellipse with semi-axes 2 and 1
        assert_relative_eq!(arc.curve_length(), 9.688_448_220_547_675, epsilon = 1e-6);
        assert!(arc.quick_length() >= arc.curve_length());
        assert!(arc.quick_length() <= FRAC_PI_2 * arc.curve_length());
    }

    #[test]
    fn quick_length_of_flat_partial_ellipse() {
        // short sweep across the minor-axis end of a 10:1 ellipse
        let arc = Arc3d::new(
            Point3::origin(),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            AngleSweep::new(-0.1, 0.3),
        )
        .unwrap();
        let length = arc.curve_length();
        assert!(arc.quick_length() >= length);
        assert!(arc.quick_length() <= FRAC_PI_2 * length);
    }

    #[test]
    fn circle_plane_intersections_at_sixty_degrees() {
        let circle = unit_circle();
        let plane = Plane::from_normal(Point3::new(0.5, 0.0, 0.0), Vector3::x()).unwrap();
        let mut out = Vec::new();
        assert_eq!(circle.append_plane_intersections(&plane, &mut out), 2);
        assert_relative_eq!(out[0].fraction, 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(out[1].fraction, 5.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(out[0].point, Point3::new(0.5, FRAC_PI_3.sin(), 0.0), epsilon = 1e-12);
        assert!(out.iter().all(|d| d.interval_role == Some(CurveIntervalRole::Isolated)));
    }

    #[test]
    fn parallel_plane_misses() {
        let plane = Plane::from_normal(Point3::new(0.0, 0.0, 1.0), Vector3::z()).unwrap();
        let mut out = Vec::new();
        assert_eq!(unit_circle().append_plane_intersections(&plane, &mut out), 0);
    }

    #[test]
    fn closest_point_on_circle() {
        let circle = unit_circle();
        let d = circle.closest_point(&Point3::new(0.0, -3.0, 0.0), CurveExtend::NONE).unwrap();
        assert_relative_eq!(d.fraction, 0.75);
        assert_relative_eq!(d.a, 2.0);
    }

    #[test]
    fn closest_point_outside_arc_picks_end() {
        let arc = quarter();
        let d = arc.closest_point(&Point3::new(-1.0, -0.1, 0.0), CurveExtend::NONE).unwrap();
        assert_relative_eq!(d.fraction, 1.0);
    }

    #[test]
    fn closest_point_reached_by_extending_the_end() {
        let arc = quarter();
        // just before the start angle, but only the end may extend
        let point = Point3::new(3.0 * 0.3_f64.cos(), -3.0 * 0.3_f64.sin(), 0.0);
        let d = arc.closest_point(&point, CurveExtend::new(false, true)).unwrap();
        assert_relative_eq!(d.fraction, (TAU - 0.3) / FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(d.a, 1.0, epsilon = 1e-12);
        let d = arc.closest_point(&point, CurveExtend::new(true, false)).unwrap();
        assert_relative_eq!(d.fraction, -0.3 / FRAC_PI_2, epsilon = 1e-12);
        let d = arc.closest_point(&point, CurveExtend::NONE).unwrap();
        assert_relative_eq!(d.fraction, 0.0);
    }

    #[test]
    fn move_on_circular_arc() {
        let arc = quarter();
        let d = arc.move_signed_distance_from_fraction(0.0, FRAC_PI_2, false);
        assert_eq!(d.status, Some(CurveSearchStatus::Success));
        assert_relative_eq!(d.fraction, 0.5);
        let d = arc.move_signed_distance_from_fraction(0.5, -TAU, false);
        assert_eq!(d.status, Some(CurveSearchStatus::StoppedAtBoundary));
        assert_relative_eq!(d.fraction, 0.0);
    }

    #[test]
    fn reverse_swaps_ends() {
        let mut arc = quarter();
        let (p0, p1) = (arc.start_point(), arc.end_point());
        arc.reverse_in_place();
        assert_relative_eq!(arc.start_point(), p1, epsilon = 1e-12);
        assert_relative_eq!(arc.end_point(), p0, epsilon = 1e-12);
    }

    #[test]
    fn local_frame_round_trip() {
        let arc = quarter();
        let local = arc.world_to_local(&Point3::new(1.0, 1.0, 5.0)).unwrap();
        assert_relative_eq!(local, Vector2::new(0.5, 0.5));
    }
}
