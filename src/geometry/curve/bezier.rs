use crate::error::{GeometryError, Result};
use crate::geometry::{PointAnd2Derivatives, Ray3};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::tessellation::{resolve, StrokeOptions};

use super::{CurvePrimitive, StrokeHandler};

/// A single-span polynomial Bezier curve of any degree.
///
/// Evaluation is by de Casteljau on the poles; derivatives evaluate the
/// hodograph the same way. Fractions outside `[0, 1]` clamp to the ends.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierCurve3d {
    poles: Vec<Point3>,
}

impl BezierCurve3d {
    /// Creates a Bezier curve from its control poles.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two poles are given.
    pub fn new(poles: Vec<Point3>) -> Result<Self> {
        if poles.len() < 2 {
            return Err(GeometryError::Degenerate("bezier curve needs at least two poles".into()).into());
        }
        Ok(Self { poles })
    }

    #[must_use]
    pub fn poles(&self) -> &[Point3] {
        &self.poles
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.poles.len() - 1
    }

    /// Length of the control polygon.
    #[must_use]
    pub fn polygon_length(&self) -> f64 {
        polygon_length(&self.poles)
    }

    /// Control polygon and chord lengths summed over `pieces` equal
    /// subdivisions. Each piece's polygon is at least its arc length and its
    /// chord at most.
    fn subdivided_polygon_and_chord(&self, pieces: usize) -> (f64, f64) {
        let mut rest = self.poles.clone();
        let mut polygon = 0.0;
        let mut chord = 0.0;
        for i in 0..pieces {
            #[allow(clippy::cast_precision_loss)]
            let (piece, tail) = split_poles(&rest, 1.0 / (pieces - i) as f64);
            polygon += polygon_length(&piece);
            chord += (piece[piece.len() - 1] - piece[0]).norm();
            rest = tail;
        }
        (polygon, chord)
    }

    /// First differences of the poles scaled by the degree.
    fn first_hodograph(&self) -> Vec<Vector3> {
        #[allow(clippy::cast_precision_loss)]
        let n = self.degree() as f64;
        self.poles.windows(2).map(|w| (w[1] - w[0]) * n).collect()
    }

    /// Second differences of the poles scaled by `n (n - 1)`.
    fn second_hodograph(&self) -> Vec<Vector3> {
        let first = self.first_hodograph();
        #[allow(clippy::cast_precision_loss)]
        let m = (self.degree() - 1) as f64;
        first.windows(2).map(|w| (w[1] - w[0]) * m).collect()
    }

    /// Total turning of the control polygon.
    fn polygon_turn(&self) -> f64 {
        self.poles
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|v| v.norm() > TOLERANCE)
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| w[0].angle(&w[1]))
            .sum()
    }
}

/// Stop subdividing for the quick length once the polygon is within this
/// factor of the chords.
const QUICK_LENGTH_RATIO: f64 = 1.25;

const MAX_QUICK_LENGTH_PIECES: usize = 64;

fn polygon_length(poles: &[Point3]) -> f64 {
    poles.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// De Casteljau subdivision at `t` into the poles of `[0, t]` and `[t, 1]`.
fn split_poles(poles: &[Point3], t: f64) -> (Vec<Point3>, Vec<Point3>) {
    let mut work = poles.to_vec();
    let mut left = Vec::with_capacity(work.len());
    let mut right = Vec::with_capacity(work.len());
    for last in (0..work.len()).rev() {
        left.push(work[0]);
        right.push(work[last]);
        for i in 0..last {
            work[i] = work[i] + (work[i + 1] - work[i]) * t;
        }
    }
    right.reverse();
    (left, right)
}

fn de_casteljau(values: &[Vector3], t: f64) -> Vector3 {
    let mut work = values.to_vec();
    for level in (1..work.len()).rev() {
        for i in 0..level {
            work[i] = work[i] * (1.0 - t) + work[i + 1] * t;
        }
    }
    work.first().copied().unwrap_or_else(Vector3::zeros)
}

impl CurvePrimitive for BezierCurve3d {
    fn as_curve(&self) -> &dyn CurvePrimitive {
        self
    }

    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        let coords: Vec<Vector3> = self.poles.iter().map(|p| p.coords).collect();
        Point3::from(de_casteljau(&coords, fraction.clamp(0.0, 1.0)))
    }

    fn fraction_to_point_and_derivative(&self, fraction: f64) -> Ray3 {
        let t = fraction.clamp(0.0, 1.0);
        Ray3::new(self.fraction_to_point(t), de_casteljau(&self.first_hodograph(), t))
    }

    fn fraction_to_point_and_2_derivatives(&self, fraction: f64) -> PointAnd2Derivatives {
        let t = fraction.clamp(0.0, 1.0);
        PointAnd2Derivatives::new(
            self.fraction_to_point(t),
            de_casteljau(&self.first_hodograph(), t),
            de_casteljau(&self.second_hodograph(), t),
        )
    }

    fn start_point(&self) -> Point3 {
        self.poles[0]
    }

    fn end_point(&self) -> Point3 {
        self.poles[self.poles.len() - 1]
    }

    fn compute_stroke_count_for_options(&self, options: Option<&StrokeOptions>) -> usize {
        let options = resolve(options);
        let max_second = self
            .second_hodograph()
            .iter()
            .map(Vector3::norm)
            .fold(0.0, f64::max);
        let length = self.polygon_length();
        // chord deviation with m strokes is at most |X''|max / (8 m^2)
        let by_deviation = options.stroke_count_for_deviation(length, max_second / 8.0);
        let by_turn = options.stroke_count(length, self.polygon_turn(), None);
        by_deviation.max(by_turn)
    }

    fn emit_strokable_parts<'a>(
        &'a self,
        handler: &mut dyn StrokeHandler<'a>,
        options: Option<&StrokeOptions>,
    ) {
        handler.start_curve_primitive(self);
        let n = self.compute_stroke_count_for_options(options);
        handler.announce_interval_for_uniform_stepping(self, n, 0.0, 1.0);
        handler.end_curve_primitive(self);
    }

    fn quick_length(&self) -> f64 {
        let mut pieces = 1;
        loop {
            let (polygon, chord) = self.subdivided_polygon_and_chord(pieces);
            if polygon <= QUICK_LENGTH_RATIO * chord || pieces >= MAX_QUICK_LENGTH_PIECES {
                return polygon;
            }
            pieces *= 2;
        }
    }

    fn reverse_in_place(&mut self) {
        self.poles.reverse();
    }
}
