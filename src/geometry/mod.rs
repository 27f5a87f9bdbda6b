pub mod chain;
pub mod curve;
mod plane;
mod ray;

pub use chain::{ChildId, CurveChainWithDistanceIndex, PathFragment};
pub use curve::{
    Arc3d, BezierCurve3d, Curve, CurveExtend, CurveKind, CurveLocationDetail,
    CurveLocationDetailPair, CurvePrimitive, LineSegment3d, LineString3d, TransitionSpiral3d,
};
pub use plane::Plane;
pub use ray::{PointAnd2Derivatives, Ray3};
