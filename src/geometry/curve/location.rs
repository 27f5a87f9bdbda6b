use crate::math::{is_almost_equal_fraction, Point3, Vector3};

use super::CurvePrimitive;

/// Role of a location within an interval-valued result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveIntervalRole {
    /// A single isolated point.
    Isolated,
    /// An isolated point that coincides with a vertex of the curve.
    IsolatedAtVertex,
    /// Start of an interval.
    IntervalStart,
    /// Interior of an interval.
    IntervalInterior,
    /// End of an interval.
    IntervalEnd,
}

/// Outcome of a distance walk along a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveSearchStatus {
    /// The full requested distance was travelled.
    Success,
    /// The walk stopped at an end of the curve because extension was not allowed.
    StoppedAtBoundary,
    /// The walk could not be performed (degenerate curve).
    Error,
}

/// Result of a search on a curve.
///
/// `curve` is a borrowed back-reference to the curve that produced the
/// result; it never owns the curve. For composite curves `child_detail`
/// carries the same location expressed on the child primitive.
#[derive(Debug, Clone)]
pub struct CurveLocationDetail<'a> {
    pub curve: Option<&'a dyn CurvePrimitive>,
    pub fraction: f64,
    pub point: Point3,
    /// Tangent or other context vector.
    pub vector: Option<Vector3>,
    /// Context-specific scalar, commonly a distance.
    pub a: f64,
    pub interval_role: Option<CurveIntervalRole>,
    pub status: Option<CurveSearchStatus>,
    pub child_detail: Option<Box<CurveLocationDetail<'a>>>,
}

impl<'a> CurveLocationDetail<'a> {
    /// Creates a detail for `curve` at `fraction` with the evaluated `point`.
    #[must_use]
    pub fn new(curve: &'a dyn CurvePrimitive, fraction: f64, point: Point3) -> Self {
        Self {
            curve: Some(curve),
            fraction,
            point,
            vector: None,
            a: 0.0,
            interval_role: None,
            status: None,
            child_detail: None,
        }
    }

    /// Creates a detail by evaluating `curve` at `fraction`.
    #[must_use]
    pub fn from_fraction(curve: &'a dyn CurvePrimitive, fraction: f64) -> Self {
        Self::new(curve, fraction, curve.fraction_to_point(fraction))
    }

    /// Creates a detail by evaluating `curve` at `fraction`, storing the
    /// derivative as the context vector.
    #[must_use]
    pub fn from_fraction_with_tangent(curve: &'a dyn CurvePrimitive, fraction: f64) -> Self {
        let ray = curve.fraction_to_point_and_derivative(fraction);
        Self::new(curve, fraction, ray.origin).with_vector(ray.direction)
    }

    #[must_use]
    pub fn with_a(mut self, a: f64) -> Self {
        self.a = a;
        self
    }

    #[must_use]
    pub fn with_vector(mut self, vector: Vector3) -> Self {
        self.vector = Some(vector);
        self
    }

    #[must_use]
    pub fn with_interval_role(mut self, role: CurveIntervalRole) -> Self {
        self.interval_role = Some(role);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: CurveSearchStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_child_detail(mut self, child: CurveLocationDetail<'a>) -> Self {
        self.child_detail = Some(Box::new(child));
        self
    }

    /// Whether this detail was produced by `curve` (pointer identity).
    #[must_use]
    pub fn is_on_curve(&self, curve: &dyn CurvePrimitive) -> bool {
        self.curve.is_some_and(|own| same_curve(own, curve))
    }

    /// Whether `other` has the same curve and an equal fraction.
    #[must_use]
    pub fn is_same_curve_and_fraction(&self, other: &CurveLocationDetail<'_>) -> bool {
        let same = match (self.curve, other.curve) {
            (Some(a), Some(b)) => same_curve(a, b),
            (None, None) => true,
            _ => false,
        };
        same && is_almost_equal_fraction(self.fraction, other.fraction)
    }
}

/// Pointer identity of two curve references.
#[must_use]
pub fn same_curve(a: &dyn CurvePrimitive, b: &dyn CurvePrimitive) -> bool {
    std::ptr::addr_eq(a as *const dyn CurvePrimitive, b as *const dyn CurvePrimitive)
}

/// Index-aligned intersection results: `data_a[i]` and `data_b[i]` describe
/// the same physical point on curve A and curve B.
#[derive(Debug, Clone, Default)]
pub struct CurveLocationDetailPair<'a> {
    pub data_a: Vec<CurveLocationDetail<'a>>,
    pub data_b: Vec<CurveLocationDetail<'a>>,
}

impl<'a> CurveLocationDetailPair<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_a: Vec::new(),
            data_b: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data_a.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_a.is_empty()
    }

    /// Appends one aligned pair.
    pub fn push(&mut self, a: CurveLocationDetail<'a>, b: CurveLocationDetail<'a>) {
        self.data_a.push(a);
        self.data_b.push(b);
    }

    /// Iterates the aligned pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&CurveLocationDetail<'a>, &CurveLocationDetail<'a>)> {
        self.data_a.iter().zip(self.data_b.iter())
    }

    /// Swaps the roles of A and B.
    #[must_use]
    pub fn swapped(self) -> Self {
        Self {
            data_a: self.data_b,
            data_b: self.data_a,
        }
    }
}
