use std::f64::consts::TAU;

use super::{SMALL_ANGLE, TOLERANCE};

/// An angular interval: `start` plus a signed `sweep`, in radians.
///
/// Fraction `f` maps to `start + f * sweep`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSweep {
    start: f64,
    sweep: f64,
}

impl AngleSweep {
    /// Creates a sweep from a start angle and a signed sweep.
    #[must_use]
    pub fn new(start: f64, sweep: f64) -> Self {
        Self { start, sweep }
    }

    /// The full counter-clockwise circle starting at angle zero.
    #[must_use]
    pub fn full_circle() -> Self {
        Self::new(0.0, TAU)
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.start + self.sweep
    }

    #[must_use]
    pub fn sweep(&self) -> f64 {
        self.sweep
    }

    /// Whether the sweep covers a whole turn (or more).
    #[must_use]
    pub fn is_full_circle(&self) -> bool {
        self.sweep.abs() >= TAU - TOLERANCE
    }

    #[must_use]
    pub fn fraction_to_radians(&self, fraction: f64) -> f64 {
        self.start + fraction * self.sweep
    }

    /// Reverses direction: the old end becomes the start.
    pub fn reverse_in_place(&mut self) {
        self.start += self.sweep;
        self.sweep = -self.sweep;
    }

    /// Maps an angle to a fraction of this sweep, choosing the periodic
    /// representative that is inside `[0, 1]` when there is one, and
    /// otherwise whichever of the over-end or before-start representatives
    /// is closer to the sweep.
    ///
    /// A zero sweep maps every angle to fraction zero.
    #[must_use]
    pub fn radians_to_signed_periodic_fraction(&self, radians: f64) -> f64 {
        if self.sweep.abs() <= SMALL_ANGLE {
            return 0.0;
        }
        let direction = self.sweep.signum();
        let delta = ((radians - self.start) * direction).rem_euclid(TAU);
        let magnitude = self.sweep.abs();
        let fraction = delta / magnitude;
        if fraction <= 1.0 + TOLERANCE {
            return fraction;
        }
        let before_start = (delta - TAU) / magnitude;
        if fraction - 1.0 <= -before_start {
            fraction
        } else {
            before_start
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn fraction_round_trip_counter_clockwise() {
        let sweep = AngleSweep::new(0.5, 2.0);
        let f = sweep.radians_to_signed_periodic_fraction(sweep.fraction_to_radians(0.3));
        assert!((f - 0.3).abs() < 1e-12);
    }

    #[test]
    fn fraction_round_trip_clockwise() {
        let sweep = AngleSweep::new(PI, -FRAC_PI_2);
        let f = sweep.radians_to_signed_periodic_fraction(sweep.fraction_to_radians(0.75));
        assert!((f - 0.75).abs() < 1e-12);
    }

    #[test]
    fn angle_just_before_start_is_negative() {
        let sweep = AngleSweep::new(0.0, FRAC_PI_2);
        let f = sweep.radians_to_signed_periodic_fraction(-0.1);
        assert!(f < 0.0);
        assert!((f + 0.1 / FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn angle_just_past_end_is_above_one() {
        let sweep = AngleSweep::new(0.0, FRAC_PI_2);
        let f = sweep.radians_to_signed_periodic_fraction(FRAC_PI_2 + 0.1);
        assert!((f - (1.0 + 0.1 / FRAC_PI_2)).abs() < 1e-12);
    }

    #[test]
    fn negative_angle_wraps_into_full_circle() {
        let sweep = AngleSweep::full_circle();
        let f = sweep.radians_to_signed_periodic_fraction(-FRAC_PI_2);
        assert!((f - 0.75).abs() < 1e-12);
    }

    #[test]
    fn reverse_swaps_ends() {
        let mut sweep = AngleSweep::new(0.25, 1.0);
        sweep.reverse_in_place();
        assert!((sweep.start() - 1.25).abs() < 1e-12);
        assert!((sweep.end() - 0.25).abs() < 1e-12);
    }
}
