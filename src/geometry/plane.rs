use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

/// An infinite plane in 3D space, stored as an origin and a unit normal.
///
/// The in-plane directions `u_dir` and `v_dir` complete a right-handed frame
/// with `u_dir x v_dir = normal`.
#[derive(Debug, Clone)]
pub struct Plane {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl Plane {
    /// Creates a plane from an origin and a normal vector.
    ///
    /// The U and V directions are computed automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn from_normal(origin: Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;

        // Choose a reference vector not parallel to the normal
        let reference = if normal.x.abs() < 0.9 {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };

        let v_dir = normal.cross(&reference).normalize();
        let u_dir = v_dir.cross(&normal);

        Ok(Self {
            origin,
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Returns the origin point of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the U direction vector.
    #[must_use]
    pub fn u_dir(&self) -> &Vector3 {
        &self.u_dir
    }

    /// Returns the V direction vector.
    #[must_use]
    pub fn v_dir(&self) -> &Vector3 {
        &self.v_dir
    }

    /// Returns the unit normal of the plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Signed distance from the plane to `point`; positive on the normal side.
    #[must_use]
    pub fn altitude(&self, point: &Point3) -> f64 {
        self.normal.dot(&(point - self.origin))
    }

    /// Rate of altitude change along `vector`.
    #[must_use]
    pub fn velocity(&self, vector: &Vector3) -> f64 {
        self.normal.dot(vector)
    }

    /// Whether `point` lies on the plane within `tolerance`.
    #[must_use]
    pub fn is_point_in_plane(&self, point: &Point3, tolerance: f64) -> bool {
        self.altitude(point).abs() <= tolerance
    }
}
