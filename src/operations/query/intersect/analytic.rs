use crate::geometry::curve::{Arc3d, Curve, CurveExtend, CurveLocationDetail};
use crate::geometry::Plane;
use crate::math::{
    is_almost_equal_point, normalize, polynomial::unit_circle_ellipse_intersections, Matrix2,
    Point3, Vector2, METRIC_TOLERANCE, TOLERANCE,
};

use super::IntersectionEngine;

/// Above this |cos| between a segment and an arc's normal, the cutting plane
/// is built from the arc's `vector0` instead of its normal.
const NEAR_NORMAL_COSINE: f64 = 0.94;

/// One straight edge of a segment or linestring operand.
struct Edge {
    point0: Point3,
    point1: Point3,
    index: usize,
    /// Extension allowed on this edge; only the outer ends of a linestring
    /// inherit the curve's permissions.
    extend: CurveExtend,
}

impl Edge {
    fn point_at(&self, fraction: f64) -> Point3 {
        self.point0 + (self.point1 - self.point0) * fraction
    }
}

fn edges(curve: &Curve, extend: CurveExtend) -> Vec<Edge> {
    match curve {
        Curve::LineSegment(segment) => vec![Edge {
            point0: *segment.point0(),
            point1: *segment.point1(),
            index: 0,
            extend,
        }],
        Curve::LineString(linestring) => {
            let count = linestring.num_edges();
            linestring
                .points()
                .windows(2)
                .enumerate()
                .map(|(index, pair)| Edge {
                    point0: pair[0],
                    point1: pair[1],
                    index,
                    extend: extend.restrict(index == 0, index + 1 == count),
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Fraction on the whole curve for a fraction on one of its edges.
fn edge_to_curve_fraction(curve: &Curve, edge: &Edge, fraction: f64) -> f64 {
    match curve {
        Curve::LineString(linestring) => linestring.edge_fraction_to_global(edge.index, fraction),
        _ => fraction,
    }
}

/// Parameters of closest approach of the two (unbounded) edge lines, from
/// the 2x2 normal equations. `None` for parallel lines.
fn closest_approach(a: &Edge, b: &Edge) -> Option<(f64, f64)> {
    let u = a.point1 - a.point0;
    let v = b.point1 - b.point0;
    let w = b.point0 - a.point0;
    let uu = u.dot(&u);
    let uv = u.dot(&v);
    let vv = v.dot(&v);
    if u.cross(&v).norm_squared() <= TOLERANCE * TOLERANCE * uu * vv {
        return None;
    }
    let normal = Matrix2::new(uu, -uv, uv, -vv);
    let solution = normal.lu().solve(&Vector2::new(u.dot(&w), v.dot(&w)))?;
    Some((solution.x, solution.y))
}

/// Arc fraction of an angle, mapping the end of a full circle to its start.
fn arc_fraction(arc: &Arc3d, radians: f64) -> f64 {
    arc.wrap_full_circle_fraction(arc.radians_to_fraction(radians))
}

impl<'a> IntersectionEngine<'a> {
    /// Segments and linestrings: every edge of A against every edge of B.
    /// Collinear overlaps are not reported.
    pub(super) fn linear_linear(
        &mut self,
        a: &'a Curve,
        extend_a: CurveExtend,
        b: &'a Curve,
        extend_b: CurveExtend,
    ) {
        let edges_b = edges(b, extend_b);
        for edge_a in edges(a, extend_a) {
            for edge_b in &edges_b {
                let Some((s, t)) = closest_approach(&edge_a, edge_b) else {
                    continue;
                };
                if !edge_a.extend.accepts_fraction(s) || !edge_b.extend.accepts_fraction(t) {
                    continue;
                }
                let point_a = edge_a.point_at(s);
                let point_b = edge_b.point_at(t);
                if !is_almost_equal_point(&point_a, &point_b) {
                    continue;
                }
                self.record(
                    CurveLocationDetail::new(a, edge_to_curve_fraction(a, &edge_a, s), point_a),
                    CurveLocationDetail::new(b, edge_to_curve_fraction(b, edge_b, t), point_b),
                );
            }
        }
    }

    /// Each edge is cut against the arc through a plane containing the edge;
    /// the arc's roots on that plane are kept when they project back onto
    /// the edge line.
    pub(super) fn linear_arc(
        &mut self,
        a: &'a Curve,
        extend_a: CurveExtend,
        b: &'a Curve,
        arc: &Arc3d,
        extend_b: CurveExtend,
    ) {
        let Some(arc_normal) = normalize(&arc.perpendicular()) else {
            return;
        };
        for edge in edges(a, extend_a) {
            let direction = edge.point1 - edge.point0;
            let Some(unit) = normalize(&direction) else {
                continue;
            };
            let cutting_normal = if unit.dot(&arc_normal).abs() >= NEAR_NORMAL_COSINE {
                direction.cross(arc.vector0())
            } else {
                direction.cross(&arc.perpendicular())
            };
            let Ok(plane) = Plane::from_normal(edge.point0, cutting_normal) else {
                continue;
            };

            let length_squared = direction.norm_squared();
            let mut hits: Vec<(f64, Point3, f64, Point3)> = Vec::new();
            for theta in arc.plane_intersection_angles(&plane) {
                let arc_point = arc.radians_to_point(theta);
                let s = direction.dot(&(arc_point - edge.point0)) / length_squared;
                let edge_point = edge.point_at(s);
                if !is_almost_equal_point(&edge_point, &arc_point) {
                    continue;
                }
                let arc_f = arc_fraction(arc, theta);
                if edge.extend.accepts_fraction(s) && extend_b.accepts_fraction(arc_f) {
                    hits.push((edge_to_curve_fraction(a, &edge, s), edge_point, arc_f, arc_point));
                }
            }
            hits.sort_by(|x, y| x.0.total_cmp(&y.0));
            for (fraction_a, point_a, fraction_b, point_b) in hits {
                self.record(
                    CurveLocationDetail::new(a, fraction_a, point_a),
                    CurveLocationDetail::new(b, fraction_b, point_b),
                );
            }
        }
    }

    /// Coplanar arcs are solved in A's unit-circle frame; arcs in distinct
    /// parallel planes never meet; otherwise each arc is cut by the other's
    /// plane and coincident roots are paired.
    pub(super) fn arc_arc(
        &mut self,
        a: &'a Curve,
        arc_a: &Arc3d,
        extend_a: CurveExtend,
        b: &'a Curve,
        arc_b: &Arc3d,
        extend_b: CurveExtend,
    ) {
        let (Ok(plane_a), Ok(plane_b)) = (arc_a.plane(), arc_b.plane()) else {
            return;
        };
        if plane_a.normal().cross(plane_b.normal()).norm() <= TOLERANCE {
            if plane_a.is_point_in_plane(arc_b.center(), METRIC_TOLERANCE) {
                self.coplanar_arcs(a, arc_a, extend_a, b, arc_b, extend_b);
            }
            return;
        }

        let roots_on = |arc: &Arc3d, plane: &Plane, extend: CurveExtend| -> Vec<(f64, Point3)> {
            let mut roots: Vec<(f64, Point3)> = arc
                .plane_intersection_angles(plane)
                .into_iter()
                .map(|theta| (arc_fraction(arc, theta), arc.radians_to_point(theta)))
                .filter(|(fraction, _)| extend.accepts_fraction(*fraction))
                .collect();
            roots.sort_by(|x, y| x.0.total_cmp(&y.0));
            roots
        };
        let roots_a = roots_on(arc_a, &plane_b, extend_a);
        let roots_b = roots_on(arc_b, &plane_a, extend_b);
        for (fraction_a, point_a) in &roots_a {
            for (fraction_b, point_b) in &roots_b {
                if is_almost_equal_point(point_a, point_b) {
                    self.record(
                        CurveLocationDetail::new(a, *fraction_a, *point_a),
                        CurveLocationDetail::new(b, *fraction_b, *point_b),
                    );
                }
            }
        }
    }

    /// In A's `(vector0, vector90)` coordinates arc A is the unit circle and
    /// arc B an ellipse, which reduces to a quartic in the half-angle tangent.
    fn coplanar_arcs(
        &mut self,
        a: &'a Curve,
        arc_a: &Arc3d,
        extend_a: CurveExtend,
        b: &'a Curve,
        arc_b: &Arc3d,
        extend_b: CurveExtend,
    ) {
        let (Some(center), Some(vector0), Some(vector90)) = (
            arc_a.world_to_local(arc_b.center()),
            arc_a.world_vector_to_local(arc_b.vector0()),
            arc_a.world_vector_to_local(arc_b.vector90()),
        ) else {
            return;
        };
        let mut hits: Vec<(f64, f64, f64)> = unit_circle_ellipse_intersections(&center, &vector0, &vector90)
            .into_iter()
            .map(|(phi, theta)| (arc_fraction(arc_a, theta), theta, phi))
            .filter(|&(fraction_a, _, phi)| {
                extend_a.accepts_fraction(fraction_a) && extend_b.accepts_fraction(arc_fraction(arc_b, phi))
            })
            .collect();
        hits.sort_by(|x, y| x.0.total_cmp(&y.0));
        for (fraction_a, theta, phi) in hits {
            self.record(
                CurveLocationDetail::new(a, fraction_a, arc_a.radians_to_point(theta)),
                CurveLocationDetail::new(b, arc_fraction(arc_b, phi), arc_b.radians_to_point(phi)),
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::curve::LineString3d;

    fn edge(p0: Point3, p1: Point3) -> Edge {
        Edge {
            point0: p0,
            point1: p1,
            index: 0,
            extend: CurveExtend::NONE,
        }
    }

    #[test]
    fn closest_approach_of_skew_lines() {
        let a = edge(Point3::origin(), Point3::new(2.0, 0.0, 0.0));
        let b = edge(Point3::new(1.0, -1.0, 3.0), Point3::new(1.0, 1.0, 3.0));
        let (s, t) = closest_approach(&a, &b).unwrap();
        assert_relative_eq!(s, 0.5);
        assert_relative_eq!(t, 0.5);
        let c = edge(Point3::new(0.0, 1.0, 0.0), Point3::new(4.0, 1.0, 0.0));
        assert!(closest_approach(&a, &c).is_none());
    }

    #[test]
    fn linestring_edges_extend_only_at_outer_ends() {
        let curve: Curve = LineString3d::new(vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ])
        .unwrap()
        .into();
        let edges = edges(&curve, CurveExtend::BOTH);
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].extend, CurveExtend::new(true, false));
        assert_eq!(edges[1].extend, CurveExtend::NONE);
        assert_eq!(edges[2].extend, CurveExtend::new(false, true));
        assert_relative_eq!(edge_to_curve_fraction(&curve, &edges[2], 0.5), 2.5 / 3.0);
    }
}
