mod stroke_options;
mod tessellate_curve;

pub use stroke_options::{StrokeOptions, MAX_STROKES_PER_PRIMITIVE};
pub use tessellate_curve::TessellateCurve;

pub(crate) use stroke_options::resolve;

use crate::math::Point3;

/// A polyline approximation of a curve.
#[derive(Debug, Clone, Default)]
pub struct Polyline {
    /// The ordered vertices of the polyline.
    pub points: Vec<Point3>,
    /// Curve fraction of each vertex, index-aligned with `points`.
    pub fractions: Vec<f64>,
}

impl Polyline {
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of the edge lengths.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
    }
}
