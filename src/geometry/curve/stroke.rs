use crate::math::Point3;

use super::CurvePrimitive;

/// Receiver of a curve's stroke emission.
///
/// A curve announces its geometry as a sequence of intervals: straight pieces
/// through [`announce_segment_interval`](Self::announce_segment_interval), and
/// curved pieces through
/// [`announce_interval_for_uniform_stepping`](Self::announce_interval_for_uniform_stepping),
/// where the handler evaluates the curve itself at `num_strokes + 1`
/// equally spaced fractions. Fractions are always those of `curve`.
pub trait StrokeHandler<'a> {
    /// Called once before a primitive's intervals.
    fn start_curve_primitive(&mut self, _curve: &'a dyn CurvePrimitive) {}

    /// A straight piece from `point0` (at `fraction0`) to `point1` (at `fraction1`).
    fn announce_segment_interval(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        point0: Point3,
        point1: Point3,
        num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    );

    /// A curved piece over `[fraction0, fraction1]` split into `num_strokes`
    /// equal-fraction steps.
    fn announce_interval_for_uniform_stepping(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    );

    /// Called once after a primitive's intervals.
    fn end_curve_primitive(&mut self, _curve: &'a dyn CurvePrimitive) {}
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn step_fraction(fraction0: f64, fraction1: f64, i: usize, n: usize) -> f64 {
    if i == n {
        fraction1
    } else {
        fraction0 + (fraction1 - fraction0) * (i as f64) / (n as f64)
    }
}
