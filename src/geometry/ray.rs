use crate::math::{Point3, Vector3};

/// A point with a (not necessarily unit) direction, as returned by
/// first-derivative curve evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray3 {
    #[must_use]
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the (unnormalized) direction.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

/// A curve point with its first (`vector_u`) and second (`vector_v`)
/// derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointAnd2Derivatives {
    pub origin: Point3,
    pub vector_u: Vector3,
    pub vector_v: Vector3,
}

impl PointAnd2Derivatives {
    #[must_use]
    pub fn new(origin: Point3, vector_u: Vector3, vector_v: Vector3) -> Self {
        Self {
            origin,
            vector_u,
            vector_v,
        }
    }
}
