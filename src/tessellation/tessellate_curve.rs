use tracing::debug;

use crate::error::{Result, TessellationError};
use crate::geometry::curve::{same_curve, step_fraction, CurvePrimitive, StrokeHandler};
use crate::math::{is_almost_equal_point, Point3};

use super::{Polyline, StrokeOptions};

/// Strokes a curve into a polyline.
pub struct TessellateCurve<'a> {
    curve: &'a dyn CurvePrimitive,
    options: StrokeOptions,
}

impl<'a> TessellateCurve<'a> {
    /// Creates a new `TessellateCurve` operation.
    #[must_use]
    pub fn new(curve: &'a dyn CurvePrimitive, options: StrokeOptions) -> Self {
        Self { curve, options }
    }

    /// Executes the tessellation, returning a polyline.
    ///
    /// Fractions on the polyline are those of the tessellated curve; for a
    /// chain they are the chain's own distance fractions.
    ///
    /// # Errors
    ///
    /// Returns [`TessellationError::Failed`] if the curve produced fewer than
    /// two points or a non-finite coordinate.
    pub fn execute(&self) -> Result<Polyline> {
        let mut collector = PolylineCollector::default();
        self.curve.emit_strokable_parts(&mut collector, Some(&self.options));
        let mut polyline = collector.polyline;

        if polyline.len() < 2 {
            return Err(TessellationError::Failed("curve produced fewer than two points".to_owned()).into());
        }
        if polyline.points.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(TessellationError::Failed("non-finite stroke point".to_owned()).into());
        }
        if collector.child_fractions {
            remap_to_curve_fractions(self.curve, &mut polyline);
        }
        debug!(points = polyline.len(), "tessellated curve");
        Ok(polyline)
    }
}

/// Chains announce their children's intervals; the child fractions are
/// replaced by the closest-point fractions on the outer curve.
fn remap_to_curve_fractions(curve: &dyn CurvePrimitive, polyline: &mut Polyline) {
    let total = polyline.length();
    if total <= 0.0 {
        return;
    }
    let mut travelled = 0.0;
    for i in 0..polyline.len() {
        if i > 0 {
            travelled += (polyline.points[i] - polyline.points[i - 1]).norm();
        }
        let guess = travelled / total;
        polyline.fractions[i] = curve
            .closest_point(&polyline.points[i], false.into())
            .map_or(guess, |detail| detail.fraction);
    }
}

#[derive(Default)]
struct PolylineCollector<'a> {
    polyline: Polyline,
    root: Option<&'a dyn CurvePrimitive>,
    child_fractions: bool,
}

impl PolylineCollector<'_> {
    fn push(&mut self, point: Point3, fraction: f64) {
        if let Some(last) = self.polyline.points.last() {
            if is_almost_equal_point(last, &point) {
                return;
            }
        }
        self.polyline.points.push(point);
        self.polyline.fractions.push(fraction);
    }
}

impl<'a> StrokeHandler<'a> for PolylineCollector<'a> {
    fn start_curve_primitive(&mut self, curve: &'a dyn CurvePrimitive) {
        self.note_curve(curve);
    }

    fn announce_segment_interval(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        point0: Point3,
        point1: Point3,
        num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        self.note_curve(curve);
        let n = num_strokes.max(1);
        for i in 0..=n {
            let f = step_fraction(0.0, 1.0, i, n);
            let point = point0 + (point1 - point0) * f;
            self.push(point, step_fraction(fraction0, fraction1, i, n));
        }
    }

    fn announce_interval_for_uniform_stepping(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        self.note_curve(curve);
        let n = num_strokes.max(1);
        for i in 0..=n {
            let f = step_fraction(fraction0, fraction1, i, n);
            self.push(curve.fraction_to_point(f), f);
        }
    }
}

impl<'a> PolylineCollector<'a> {
    fn note_curve(&mut self, curve: &'a dyn CurvePrimitive) {
        match self.root {
            None => self.root = Some(curve),
            Some(root) => {
                if !same_curve(root, curve) {
                    self.child_fractions = true;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::TAU;

    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::curve::{Arc3d, LineString3d};

    #[test]
    fn circle_strokes_with_default_options() {
        let circle = Arc3d::circle(Point3::origin(), 1.0, crate::math::Vector3::z()).unwrap();
        let polyline = TessellateCurve::new(&circle, StrokeOptions::default()).execute().unwrap();
        assert_eq!(polyline.len(), 17);
        assert_relative_eq!(polyline.fractions[16], 1.0);
        assert!(polyline.length() < TAU);
        assert!(polyline.length() > 0.98 * TAU);
    }

    #[test]
    fn linestring_keeps_its_vertices() {
        let ls = LineString3d::new(vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
        .unwrap();
        let polyline = TessellateCurve::new(&ls, StrokeOptions::default()).execute().unwrap();
        assert_eq!(polyline.len(), 3);
        assert_relative_eq!(polyline.fractions[1], 0.5);
    }

    #[test]
    fn max_edge_length_subdivides_lines() {
        let ls = LineString3d::new(vec![Point3::origin(), Point3::new(4.0, 0.0, 0.0)]).unwrap();
        let options = StrokeOptions::new(None, None, Some(1.0), None).unwrap();
        let polyline = TessellateCurve::new(&ls, options).execute().unwrap();
        assert_eq!(polyline.len(), 5);
        assert_relative_eq!(polyline.fractions[2], 0.5);
    }
}
