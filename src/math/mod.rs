pub mod angle_sweep;
pub mod newton;
pub mod polynomial;
pub mod quadrature;

pub use angle_sweep::AngleSweep;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 2x2 matrix, used for the small linear systems of curve intersection.
pub type Matrix2 = nalgebra::Matrix2<f64>;

/// Tolerance for fractions, roots and other dimensionless comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Tolerance for deciding two points coincide.
pub const METRIC_TOLERANCE: f64 = 1e-6;

/// Angles below this are treated as zero.
pub const SMALL_ANGLE: f64 = 1e-12;

/// Returns whether two fractions are equal within [`TOLERANCE`].
#[must_use]
pub fn is_almost_equal_fraction(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOLERANCE
}

/// Returns whether two points coincide within [`METRIC_TOLERANCE`].
#[must_use]
pub fn is_almost_equal_point(a: &Point3, b: &Point3) -> bool {
    (a - b).norm() <= METRIC_TOLERANCE
}

/// Point interpolation `p0 + f * (p1 - p0)`.
#[must_use]
pub fn interpolate_point(p0: &Point3, f: f64, p1: &Point3) -> Point3 {
    p0 + (p1 - p0) * f
}

/// Returns `numerator / denominator`, or `None` when the quotient would blow up.
#[must_use]
pub fn conditional_divide(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator.abs() <= f64::EPSILON * numerator.abs().max(1.0) {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Unit vector, or `None` for a (near) zero vector.
#[must_use]
pub fn normalize(v: &Vector3) -> Option<Vector3> {
    let len = v.norm();
    if len < TOLERANCE {
        None
    } else {
        Some(v / len)
    }
}
