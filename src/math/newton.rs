//! Bounded Newton iterations used to refine curve search seeds.
//!
//! Every solver stops after a hard iteration cap. A run that does not
//! converge still reports the best iterate it saw (smallest residual), so
//! callers lose accuracy rather than results.

use tracing::trace;

use super::{Matrix2, Vector2};

/// Iteration cap for the 1-D solvers.
pub const MAX_ITERATIONS_1D: usize = 15;

/// Iteration cap for the 2-D solver.
pub const MAX_ITERATIONS_2D: usize = 20;

/// Outcome of a 1-D Newton run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonResult {
    /// Final (or best-so-far) iterate.
    pub x: f64,
    /// Whether the step size fell below tolerance before the cap.
    pub converged: bool,
    /// Number of iterations performed.
    pub iterations: usize,
}

/// Outcome of a 2-D Newton run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonResult2 {
    pub u: f64,
    pub v: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Newton iteration with a caller-supplied analytic derivative.
#[derive(Debug, Clone, Copy)]
pub struct Newton1d {
    max_iterations: usize,
    step_tolerance: f64,
}

impl Default for Newton1d {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS_1D,
            step_tolerance: 1e-12,
        }
    }
}

impl Newton1d {
    /// Creates a solver with the default cap and step tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the iteration cap (clamped to at least one iteration).
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Runs Newton from `x0`. `f` returns `(value, derivative)` or `None`
    /// when the function cannot be evaluated, which ends the run.
    pub fn solve<F>(&self, x0: f64, mut f: F) -> NewtonResult
    where
        F: FnMut(f64) -> Option<(f64, f64)>,
    {
        let mut x = x0;
        let mut best = (x0, f64::INFINITY);
        for iteration in 1..=self.max_iterations {
            let Some((value, derivative)) = f(x) else {
                break;
            };
            if value.abs() < best.1 {
                best = (x, value.abs());
            }
            if value == 0.0 {
                return NewtonResult { x, converged: true, iterations: iteration };
            }
            let Some(step) = super::conditional_divide(value, derivative) else {
                break;
            };
            x -= step;
            if step.abs() <= self.step_tolerance * x.abs().max(1.0) {
                return NewtonResult { x, converged: true, iterations: iteration };
            }
        }
        trace!(x0, best = best.0, "newton did not converge");
        NewtonResult {
            x: best.0,
            converged: false,
            iterations: self.max_iterations,
        }
    }
}

/// Newton iteration whose derivative is estimated by a forward difference.
#[derive(Debug, Clone, Copy)]
pub struct Newton1dApproximateDerivative {
    inner: Newton1d,
    delta: f64,
}

impl Default for Newton1dApproximateDerivative {
    fn default() -> Self {
        Self {
            inner: Newton1d::default(),
            delta: 1e-8,
        }
    }
}

impl Newton1dApproximateDerivative {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the iteration from `x0`; `f` returns the residual only.
    pub fn solve<F>(&self, x0: f64, mut f: F) -> NewtonResult
    where
        F: FnMut(f64) -> Option<f64>,
    {
        let delta = self.delta;
        self.inner.solve(x0, |x| {
            let value = f(x)?;
            let h = delta * x.abs().max(1.0);
            let shifted = f(x + h)?;
            Some((value, (shifted - value) / h))
        })
    }
}

/// Newton iteration for two unknowns with a caller-supplied 2x2 Jacobian.
#[derive(Debug, Clone, Copy)]
pub struct Newton2d {
    max_iterations: usize,
    step_tolerance: f64,
}

impl Default for Newton2d {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS_2D,
            step_tolerance: 1e-12,
        }
    }
}

impl Newton2d {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the iteration from `(u0, v0)`. `f` returns the residual vector and
    /// its Jacobian with respect to `(u, v)`.
    pub fn solve<F>(&self, u0: f64, v0: f64, mut f: F) -> NewtonResult2
    where
        F: FnMut(f64, f64) -> Option<(Vector2, Matrix2)>,
    {
        let mut u = u0;
        let mut v = v0;
        let mut best = (u0, v0, f64::INFINITY);
        for iteration in 1..=self.max_iterations {
            let Some((residual, jacobian)) = f(u, v) else {
                break;
            };
            let size = residual.norm();
            if size < best.2 {
                best = (u, v, size);
            }
            let Some(step) = jacobian.lu().solve(&residual) else {
                break;
            };
            u -= step.x;
            v -= step.y;
            if step.x.abs() <= self.step_tolerance * u.abs().max(1.0)
                && step.y.abs() <= self.step_tolerance * v.abs().max(1.0)
            {
                return NewtonResult2 { u, v, converged: true, iterations: iteration };
            }
        }
        trace!(u0, v0, "2d newton did not converge");
        NewtonResult2 {
            u: best.0,
            v: best.1,
            converged: false,
            iterations: self.max_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_root_of_two() {
        let result = Newton1d::new().solve(1.0, |x| Some((x * x - 2.0, 2.0 * x)));
        assert!(result.converged);
        assert!((result.x - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn approximate_derivative_finds_cosine_root() {
        let result = Newton1dApproximateDerivative::new().solve(1.0, |x| Some(x.cos()));
        assert!(result.converged);
        assert!((result.x - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn non_convergence_keeps_best_iterate() {
        // x^2 + 1 has no real root; the best residual is found near x = 0.
        let result = Newton1d::new()
            .with_max_iterations(5)
            .solve(0.5, |x| Some((x * x + 1.0, 2.0 * x)));
        assert!(!result.converged);
        assert!(result.x.is_finite());
    }

    #[test]
    fn evaluation_failure_stops_early() {
        let result = Newton1d::new().solve(3.0, |_| None);
        assert!(!result.converged);
        assert!((result.x - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn two_dimensional_linear_system() {
        // u + v = 3, u - v = 1  =>  u = 2, v = 1
        let result = Newton2d::new().solve(0.0, 0.0, |u, v| {
            Some((
                Vector2::new(u + v - 3.0, u - v - 1.0),
                Matrix2::new(1.0, 1.0, 1.0, -1.0),
            ))
        });
        assert!(result.converged);
        assert!((result.u - 2.0).abs() < 1e-12);
        assert!((result.v - 1.0).abs() < 1e-12);
    }
}
