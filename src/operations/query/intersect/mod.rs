//! Pairwise curve-curve intersection.
//!
//! Pairs with a closed form (segments, linestrings and arcs) are solved
//! analytically; chains recurse into their children; every other pair goes
//! through a stroke-seeded Newton search.

mod analytic;
mod numeric;

use tracing::{debug, instrument, trace};

use crate::geometry::chain::CurveChainWithDistanceIndex;
use crate::geometry::curve::{
    Curve, CurveExtend, CurveIntervalRole, CurveLocationDetail, CurveLocationDetailPair,
};

/// Computes intersections between two curves.
pub struct CurveCurveIntersect<'a> {
    curve_a: &'a Curve,
    curve_b: &'a Curve,
    extend_a: CurveExtend,
    extend_b: CurveExtend,
}

impl<'a> CurveCurveIntersect<'a> {
    /// Creates a new `CurveCurveIntersect` query bounded to both curves.
    #[must_use]
    pub fn new(curve_a: &'a Curve, curve_b: &'a Curve) -> Self {
        Self {
            curve_a,
            curve_b,
            extend_a: CurveExtend::NONE,
            extend_b: CurveExtend::NONE,
        }
    }

    /// Allows intersections past the ends of either curve. Only extensible
    /// kinds (segments, linestring end edges, arcs) honour this.
    #[must_use]
    pub fn with_extend(mut self, extend_a: impl Into<CurveExtend>, extend_b: impl Into<CurveExtend>) -> Self {
        self.extend_a = extend_a.into();
        self.extend_b = extend_b.into();
        self
    }

    /// Executes the query.
    ///
    /// `data_a[i]` and `data_b[i]` of the result describe the same point on
    /// curve A and curve B; every record is tagged
    /// [`CurveIntervalRole::Isolated`]. Pairs without a supported solver
    /// yield an empty result.
    #[instrument(skip_all, fields(kind_a = ?self.curve_a.kind(), kind_b = ?self.curve_b.kind()))]
    #[must_use]
    pub fn execute(&self) -> CurveLocationDetailPair<'a> {
        let mut engine = IntersectionEngine::new();
        engine.dispatch(self.curve_a, self.extend_a, self.curve_b, self.extend_b);
        debug!(count = engine.results.len(), "curve-curve intersection");
        engine.results
    }
}

/// Collects intersection pairs in A/B order while handlers work on a
/// canonically ordered pair.
struct IntersectionEngine<'a> {
    results: CurveLocationDetailPair<'a>,
    /// Set while the handler's first operand is the caller's curve B.
    reversed: bool,
}

impl<'a> IntersectionEngine<'a> {
    fn new() -> Self {
        Self {
            results: CurveLocationDetailPair::new(),
            reversed: false,
        }
    }

    /// Records one pair given in handler order. A pair matching the most
    /// recently recorded one is dropped.
    fn record(&mut self, first: CurveLocationDetail<'a>, second: CurveLocationDetail<'a>) {
        let (detail_a, detail_b) = if self.reversed {
            (second, first)
        } else {
            (first, second)
        };
        if let (Some(last_a), Some(last_b)) = (self.results.data_a.last(), self.results.data_b.last()) {
            if last_a.is_same_curve_and_fraction(&detail_a) && last_b.is_same_curve_and_fraction(&detail_b) {
                trace!(fraction_a = detail_a.fraction, "dropping repeated intersection");
                return;
            }
        }
        self.results.push(
            detail_a.with_interval_role(CurveIntervalRole::Isolated),
            detail_b.with_interval_role(CurveIntervalRole::Isolated),
        );
    }

    fn dispatch(&mut self, a: &'a Curve, extend_a: CurveExtend, b: &'a Curve, extend_b: CurveExtend) {
        match (a, b) {
            (Curve::Chain(chain), _) => self.chain_with(a, chain, extend_a, b, extend_b),
            (_, Curve::Chain(_)) => self.swapped(a, extend_a, b, extend_b),
            (
                Curve::LineSegment(_) | Curve::LineString(_),
                Curve::LineSegment(_) | Curve::LineString(_),
            ) => self.linear_linear(a, extend_a, b, extend_b),
            (Curve::LineSegment(_) | Curve::LineString(_), Curve::Arc(arc)) => {
                self.linear_arc(a, extend_a, b, arc, extend_b);
            }
            (Curve::Arc(_), Curve::LineSegment(_) | Curve::LineString(_)) => {
                self.swapped(a, extend_a, b, extend_b);
            }
            (Curve::Arc(arc_a), Curve::Arc(arc_b)) => self.arc_arc(a, arc_a, extend_a, b, arc_b, extend_b),
            _ => self.numeric(a, b),
        }
    }

    fn swapped(&mut self, a: &'a Curve, extend_a: CurveExtend, b: &'a Curve, extend_b: CurveExtend) {
        self.reversed = !self.reversed;
        self.dispatch(b, extend_b, a, extend_a);
        self.reversed = !self.reversed;
    }

    /// Intersects each child with `other` and maps the child locations onto
    /// the chain, nesting the child detail. Extension reaches only the first
    /// and last child.
    fn chain_with(
        &mut self,
        curve: &'a Curve,
        chain: &'a CurveChainWithDistanceIndex,
        extend: CurveExtend,
        other: &'a Curve,
        other_extend: CurveExtend,
    ) {
        let ids = chain.child_ids();
        let last = ids.len().saturating_sub(1);
        for (i, &id) in ids.iter().enumerate() {
            let Some(child) = chain.child(id) else {
                continue;
            };
            let mut child_engine = IntersectionEngine::new();
            child_engine.dispatch(child, extend.restrict(i == 0, i == last), other, other_extend);
            let pairs = child_engine.results;
            for (child_detail, other_detail) in pairs.data_a.into_iter().zip(pairs.data_b) {
                let Some(detail) = chain.child_detail_to_chain_detail(id, child_detail) else {
                    continue;
                };
                self.record(
                    CurveLocationDetail {
                        curve: Some(curve),
                        ..detail
                    },
                    other_detail,
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::curve::{
        Arc3d, BezierCurve3d, CurvePrimitive, LineSegment3d, LineString3d, TransitionSpiral3d,
    };
    use crate::math::{AngleSweep, Point3, Vector3};

    fn segment(x0: f64, y0: f64, x1: f64, y1: f64) -> Curve {
        LineSegment3d::new(Point3::new(x0, y0, 0.0), Point3::new(x1, y1, 0.0)).into()
    }

    fn circle(x: f64, y: f64, radius: f64) -> Curve {
        Arc3d::circle(Point3::new(x, y, 0.0), radius, Vector3::z()).unwrap().into()
    }

    fn assert_aligned(result: &CurveLocationDetailPair<'_>) {
        for (a, b) in result.iter() {
            assert!((a.point - b.point).norm() < 1e-6);
            assert_eq!(a.interval_role, Some(CurveIntervalRole::Isolated));
            assert_eq!(b.interval_role, Some(CurveIntervalRole::Isolated));
        }
    }

    #[test]
    fn crossing_segments_meet_at_midpoints() {
        let a = segment(0.0, 0.0, 2.0, 0.0);
        let b = segment(1.0, -1.0, 1.0, 1.0);
        let result = CurveCurveIntersect::new(&a, &b).execute();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.data_a[0].fraction, 0.5);
        assert_relative_eq!(result.data_b[0].fraction, 0.5);
        assert_relative_eq!(result.data_a[0].point, Point3::new(1.0, 0.0, 0.0));
        assert!(result.data_a[0].is_on_curve(&a));
        assert!(result.data_b[0].is_on_curve(&b));
    }

    #[test]
    fn segment_extension_is_per_curve() {
        let a = segment(0.0, 0.0, 1.0, 0.0);
        let b = segment(2.0, -1.0, 2.0, 1.0);
        assert!(CurveCurveIntersect::new(&a, &b).execute().is_empty());
        let result = CurveCurveIntersect::new(&a, &b).with_extend(true, false).execute();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.data_a[0].fraction, 2.0);
        assert!(CurveCurveIntersect::new(&a, &b).with_extend(false, true).execute().is_empty());
    }

    #[test]
    fn parallel_and_skew_segments_do_not_meet() {
        let a = segment(0.0, 0.0, 1.0, 0.0);
        let b = segment(0.0, 1.0, 1.0, 1.0);
        assert!(CurveCurveIntersect::new(&a, &b).execute().is_empty());
        let c: Curve = LineSegment3d::new(Point3::new(0.5, -1.0, 1.0), Point3::new(0.5, 1.0, 1.0)).into();
        assert!(CurveCurveIntersect::new(&a, &c).execute().is_empty());
    }

    #[test]
    fn linestring_vertex_hit_is_reported_once() {
        let zigzag: Curve = LineString3d::new(vec![
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, -1.0, 0.0),
        ])
        .unwrap()
        .into();
        let line = segment(0.0, 0.0, 2.0, 0.0);
        let result = CurveCurveIntersect::new(&zigzag, &line).execute();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.data_a[0].fraction, 0.5);
        assert_relative_eq!(result.data_b[0].fraction, 0.5);
    }

    #[test]
    fn linestring_pair_uses_global_fractions() {
        let a: Curve = LineString3d::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
        ])
        .unwrap()
        .into();
        let b: Curve = LineString3d::new(vec![Point3::new(1.0, 1.0, 0.0), Point3::new(3.0, 1.0, 0.0)])
            .unwrap()
            .into();
        let result = CurveCurveIntersect::new(&a, &b).execute();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.data_a[0].fraction, 0.75);
        assert_relative_eq!(result.data_b[0].fraction, 0.5);
    }

    #[test]
    fn segment_through_circle() {
        let c = circle(0.0, 0.0, 1.0);
        let s = segment(-2.0, 0.0, 2.0, 0.0);
        let result = CurveCurveIntersect::new(&s, &c).execute();
        assert_eq!(result.len(), 2);
        assert_aligned(&result);
        assert_relative_eq!(result.data_a[0].fraction, 0.25, epsilon = 1e-12);
        assert_relative_eq!(result.data_a[1].fraction, 0.75, epsilon = 1e-12);
        assert_relative_eq!(result.data_b[0].fraction, 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.data_b[1].fraction, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn segment_piercing_arc_plane() {
        let c = circle(0.0, 0.0, 1.0);
        let s: Curve = LineSegment3d::new(Point3::new(0.0, 1.0, -1.0), Point3::new(0.0, 1.0, 1.0)).into();
        let result = CurveCurveIntersect::new(&c, &s).execute();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.data_a[0].fraction, 0.25, epsilon = 1e-12);
        assert_relative_eq!(result.data_b[0].fraction, 0.5, epsilon = 1e-12);
        assert!(result.data_a[0].is_on_curve(&c));
    }

    #[test]
    fn overlapping_circles_meet_twice() {
        let a = circle(0.0, 0.0, 1.0);
        let b = circle(1.0, 0.0, 1.0);
        let result = CurveCurveIntersect::new(&a, &b).execute();
        assert_eq!(result.len(), 2);
        assert_aligned(&result);
        for d in &result.data_a {
            assert_relative_eq!(d.point.x, 0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn concentric_circles_do_not_meet() {
        let a = circle(0.0, 0.0, 1.0);
        let b = circle(0.0, 0.0, 2.0);
        assert!(CurveCurveIntersect::new(&a, &b).execute().is_empty());
    }

    #[test]
    fn circles_in_parallel_planes_do_not_meet() {
        let a = circle(0.0, 0.0, 1.0);
        let b: Curve = Arc3d::circle(Point3::new(0.0, 0.0, 1.0), 1.0, Vector3::z()).unwrap().into();
        assert!(CurveCurveIntersect::new(&a, &b).execute().is_empty());
    }

    #[test]
    fn perpendicular_circles_share_two_points() {
        let a = circle(0.0, 0.0, 1.0);
        let b: Curve = Arc3d::circle(Point3::origin(), 1.0, Vector3::y()).unwrap().into();
        let result = CurveCurveIntersect::new(&a, &b).execute();
        assert_eq!(result.len(), 2);
        assert_aligned(&result);
        for d in &result.data_a {
            assert_relative_eq!(d.point.y, 0.0, epsilon = 1e-12);
            assert_relative_eq!(d.point.x.abs(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn partial_arcs_filter_by_sweep() {
        let upper: Curve = Arc3d::circular_arc(
            Point3::origin(),
            1.0,
            Vector3::z(),
            Vector3::x(),
            AngleSweep::new(0.0, PI),
        )
        .unwrap()
        .into();
        let other = circle(1.0, 0.0, 1.0);
        let result = CurveCurveIntersect::new(&upper, &other).execute();
        assert_eq!(result.len(), 1);
        assert!(result.data_a[0].point.y > 0.0);
        let extended = CurveCurveIntersect::new(&upper, &other).with_extend(true, false).execute();
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn swapped_order_swaps_records() {
        let c = circle(0.0, 0.0, 1.0);
        let s = segment(-2.0, 0.5, 2.0, 0.5);
        let forward = CurveCurveIntersect::new(&s, &c).execute();
        let backward = CurveCurveIntersect::new(&c, &s).execute();
        assert_eq!(forward.len(), 2);
        assert_eq!(backward.len(), 2);
        for (on_segment, on_circle) in forward.iter() {
            assert!(backward.iter().any(|(c2, s2)| {
                (c2.fraction - on_circle.fraction).abs() < 1e-10
                    && (s2.fraction - on_segment.fraction).abs() < 1e-10
            }));
        }
        assert!(backward.data_a.iter().all(|d| d.is_on_curve(&c)));
        assert!(backward.data_b.iter().all(|d| d.is_on_curve(&s)));
    }

    #[test]
    fn chain_results_nest_child_details() {
        let chain = CurveChainWithDistanceIndex::create(
            vec![
                LineSegment3d::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0)).into(),
                Arc3d::circular_arc(
                    Point3::new(1.0, 1.0, 0.0),
                    1.0,
                    Vector3::z(),
                    Vector3::new(0.0, -1.0, 0.0),
                    AngleSweep::new(0.0, FRAC_PI_2),
                )
                .unwrap()
                .into(),
            ],
            None,
        )
        .unwrap();
        let total = chain.total_length();
        let chain: Curve = chain.into();
        let cut = segment(0.5, -1.0, 0.5, 1.0);
        let result = CurveCurveIntersect::new(&cut, &chain).execute();
        assert_eq!(result.len(), 1);
        assert!(result.data_b[0].is_on_curve(&chain));
        assert_relative_eq!(result.data_b[0].fraction, 0.5 / total, epsilon = 1e-9);
        let child = result.data_b[0].child_detail.as_ref().unwrap();
        assert_relative_eq!(child.fraction, 0.5, epsilon = 1e-9);

        // a cut through the arc child lands past the first child's share
        let arc_cut = segment(1.0, 1.0, 3.0, 1.0);
        let result = CurveCurveIntersect::new(&chain, &arc_cut).execute();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.data_a[0].point, Point3::new(2.0, 1.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(result.data_a[0].fraction, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn bezier_and_segment_use_numeric_search() {
        let hump: Curve = BezierCurve3d::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ])
        .unwrap()
        .into();
        let s = segment(0.0, 0.5, 2.0, 0.5);
        let result = CurveCurveIntersect::new(&hump, &s).execute();
        assert_eq!(result.len(), 2);
        assert_aligned(&result);
        // y(f) = 4f(1 - f) = 0.5 at f = 0.5 -+ sqrt(0.125)
        let offset = 0.125_f64.sqrt();
        assert_relative_eq!(result.data_a[0].fraction, 0.5 - offset, epsilon = 1e-9);
        assert_relative_eq!(result.data_a[1].fraction, 0.5 + offset, epsilon = 1e-9);
        assert_relative_eq!(result.data_b[0].fraction, 0.5 - offset, epsilon = 1e-9);
    }

    #[test]
    fn spiral_meets_crossing_segment() {
        let spiral: Curve = TransitionSpiral3d::new(Point3::origin(), Vector3::z(), 0.0, 0.0, 0.02, 50.0)
            .unwrap()
            .into();
        let probe = spiral.fraction_to_point(0.6);
        let s: Curve = LineSegment3d::new(probe - Vector3::new(0.0, 5.0, 0.0), probe + Vector3::new(0.0, 5.0, 0.0)).into();
        let result = CurveCurveIntersect::new(&s, &spiral).execute();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.data_b[0].fraction, 0.6, epsilon = 1e-8);
        assert_relative_eq!(result.data_a[0].fraction, 0.5, epsilon = 1e-8);
    }
}
