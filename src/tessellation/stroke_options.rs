use std::f64::consts::FRAC_PI_8;

use crate::error::{Result, TessellationError};

/// Upper bound on the strokes requested for a single primitive.
pub const MAX_STROKES_PER_PRIMITIVE: usize = 4096;

/// Tolerances controlling how finely curves are stroked.
///
/// Each axis is optional; an absent axis places no constraint. When several
/// axes are set, the one asking for the most strokes governs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeOptions {
    chord_tolerance: Option<f64>,
    angle_tolerance: Option<f64>,
    max_edge_length: Option<f64>,
    min_strokes_per_primitive: Option<usize>,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            chord_tolerance: None,
            angle_tolerance: Some(FRAC_PI_8),
            max_edge_length: None,
            min_strokes_per_primitive: None,
        }
    }
}

fn check_positive(value: Option<f64>, name: &str) -> Result<()> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(TessellationError::InvalidParameters(
            format!("{name} must be positive"),
        )
        .into()),
        _ => Ok(()),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn count_for_ratio(ratio: f64) -> usize {
    if ratio.is_finite() && ratio > 0.0 {
        (ratio.ceil() as usize).min(MAX_STROKES_PER_PRIMITIVE)
    } else if ratio.is_infinite() {
        MAX_STROKES_PER_PRIMITIVE
    } else {
        1
    }
}

impl StrokeOptions {
    /// Creates stroke options.
    ///
    /// # Errors
    ///
    /// Returns an error if any given tolerance is not a positive finite
    /// number, or if `min_strokes_per_primitive` is zero.
    pub fn new(
        chord_tolerance: Option<f64>,
        angle_tolerance: Option<f64>,
        max_edge_length: Option<f64>,
        min_strokes_per_primitive: Option<usize>,
    ) -> Result<Self> {
        check_positive(chord_tolerance, "chord tolerance")?;
        check_positive(angle_tolerance, "angle tolerance")?;
        check_positive(max_edge_length, "max edge length")?;
        if min_strokes_per_primitive == Some(0) {
            return Err(TessellationError::InvalidParameters(
                "min strokes per primitive must be at least 1".to_owned(),
            )
            .into());
        }
        Ok(Self {
            chord_tolerance,
            angle_tolerance,
            max_edge_length,
            min_strokes_per_primitive,
        })
    }

    #[must_use]
    pub fn chord_tolerance(&self) -> Option<f64> {
        self.chord_tolerance
    }

    #[must_use]
    pub fn angle_tolerance(&self) -> Option<f64> {
        self.angle_tolerance
    }

    #[must_use]
    pub fn max_edge_length(&self) -> Option<f64> {
        self.max_edge_length
    }

    #[must_use]
    pub fn min_strokes_per_primitive(&self) -> Option<usize> {
        self.min_strokes_per_primitive
    }

    /// Stroke count for a piece of curve of the given `length` that turns
    /// through `turn_radians`, with `radius` the tightest radius of curvature
    /// (`None` for straight pieces).
    #[must_use]
    pub fn stroke_count(&self, length: f64, turn_radians: f64, radius: Option<f64>) -> usize {
        let turn = turn_radians.abs();
        let mut count = 1;
        if let Some(angle) = self.angle_tolerance {
            count = count.max(count_for_ratio(turn / angle));
        }
        if let (Some(tol), Some(r)) = (self.chord_tolerance, radius) {
            if r > tol {
                // chord sag r(1 - cos(a/2)) stays within tol for steps a below:
                let step = 2.0 * (1.0 - tol / r).acos();
                count = count.max(count_for_ratio(turn / step));
            }
        }
        count = count.max(self.edge_length_count(length));
        self.apply_min_strokes(count)
    }

    /// Stroke count for a polynomial piece whose chord deviation with `m`
    /// strokes is bounded by `deviation_bound / m²`.
    #[must_use]
    pub fn stroke_count_for_deviation(&self, length: f64, deviation_bound: f64) -> usize {
        let mut count = 1;
        if let Some(tol) = self.chord_tolerance {
            count = count.max(count_for_ratio((deviation_bound.abs() / tol).sqrt()));
        }
        count = count.max(self.edge_length_count(length));
        self.apply_min_strokes(count)
    }

    fn edge_length_count(&self, length: f64) -> usize {
        self.max_edge_length
            .map_or(1, |edge| count_for_ratio(length.abs() / edge))
    }

    /// Raises `count` to the per-primitive minimum.
    #[must_use]
    pub fn apply_min_strokes(&self, count: usize) -> usize {
        count.max(self.min_strokes_per_primitive.unwrap_or(1)).max(1)
    }
}

/// Options to use when none were given.
#[must_use]
pub fn resolve(options: Option<&StrokeOptions>) -> StrokeOptions {
    options.copied().unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::{PI, TAU};

    use super::*;

    #[test]
    fn default_uses_angle_tolerance_only() {
        let options = StrokeOptions::default();
        assert_eq!(options.stroke_count(100.0, TAU, Some(1.0)), 16);
        assert_eq!(options.stroke_count(100.0, 0.0, None), 1);
    }

    #[test]
    fn new_rejects_non_positive_tolerances() {
        assert!(StrokeOptions::new(Some(0.0), None, None, None).is_err());
        assert!(StrokeOptions::new(None, Some(-1.0), None, None).is_err());
        assert!(StrokeOptions::new(None, None, Some(f64::NAN), None).is_err());
        assert!(StrokeOptions::new(None, None, None, Some(0)).is_err());
    }

    #[test]
    fn most_demanding_axis_governs() {
        let options = StrokeOptions::new(None, Some(PI / 2.0), Some(1.0), None).unwrap();
        // angle asks for 4 strokes, edge length for 7
        assert_eq!(options.stroke_count(6.5, TAU, Some(1.0)), 7);
    }

    #[test]
    fn chord_tolerance_on_circle() {
        let sag = 1.0 - (PI / 8.0).cos();
        let options = StrokeOptions::new(Some(sag * 1.001), None, None, None).unwrap();
        // a sag of 1 - cos(pi/8) on a unit circle allows steps of pi/4
        assert_eq!(options.stroke_count(TAU, TAU, Some(1.0)), 8);
    }

    #[test]
    fn minimum_strokes_applies() {
        let options = StrokeOptions::new(None, None, None, Some(5)).unwrap();
        assert_eq!(options.stroke_count(1.0, 0.0, None), 5);
    }

    #[test]
    fn deviation_bound_count() {
        let options = StrokeOptions::new(Some(0.25), None, None, None).unwrap();
        assert_eq!(options.stroke_count_for_deviation(1.0, 4.0), 4);
    }

    #[test]
    fn counts_are_capped() {
        let options = StrokeOptions::new(None, None, Some(1e-12), None).unwrap();
        assert_eq!(options.stroke_count(1.0, 0.0, None), MAX_STROKES_PER_PRIMITIVE);
    }
}
