mod closest_point;
mod intersect;
mod length;
mod plane_intersect;

pub use closest_point::{closest_point_by_strokes, ClosestPointOnCurve};
pub use intersect::CurveCurveIntersect;
pub use length::{curve_length_by_strokes, Length};
pub use plane_intersect::{plane_intersections_by_strokes, CurvePlaneIntersect};
