//! Bracketed root finding shared by every inversion in the crate.
use crate::error::{ParcelError, Result};

/// Brent's method for finding the root of an equation given values bracketing a root.
///
/// The target function is fallible so errors from nested calculations (a failed LCL, a bad
/// dew point) stop the search and are passed up unchanged. A bracket without a sign change, a
/// non-finite function value, or exceeding the iteration cap all fail with
/// `ParcelError::Convergence`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSolver {
    max_iterations: usize,
    abs_tolerance: f64,
    rel_tolerance: f64,
}

impl Default for RootSolver {
    fn default() -> Self {
        RootSolver {
            max_iterations: 100,
            abs_tolerance: 1.0e-10,
            rel_tolerance: 4.0 * std::f64::EPSILON,
        }
    }
}

impl RootSolver {
    /// Create a solver with the default iteration cap and tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the iteration cap.
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        RootSolver {
            max_iterations,
            ..self
        }
    }

    /// Builder method to set the absolute and relative tolerance on the root.
    pub fn with_tolerance(self, abs_tolerance: f64, rel_tolerance: f64) -> Self {
        RootSolver {
            abs_tolerance,
            rel_tolerance,
            ..self
        }
    }

    /// Find the root of `f` between `low_val` and `high_val`.
    pub fn solve<F>(&self, mut f: F, low_val: f64, high_val: f64) -> Result<f64>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        let (mut a, mut b) = (low_val, high_val);
        let (mut fa, mut fb) = (f(a)?, f(b)?);

        if !fa.is_finite() || !fb.is_finite() {
            return Err(ParcelError::Convergence);
        }
        if fa == 0.0 {
            return Ok(a);
        }
        if fb == 0.0 {
            return Ok(b);
        }
        if fa.signum() == fb.signum() {
            tracing::trace!(low_val, high_val, fa, fb, "no sign change in root bracket");
            return Err(ParcelError::Convergence);
        }

        let (mut c, mut fc) = (b, fb);
        let mut d = b - a;
        let mut e = d;

        for _ in 0..self.max_iterations {
            if fb.signum() == fc.signum() {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }

            // Keep b as the best estimate.
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol = 2.0 * self.rel_tolerance * b.abs() + 0.5 * self.abs_tolerance;
            let m = 0.5 * (c - b);
            if m.abs() <= tol || fb == 0.0 {
                return Ok(b);
            }

            if e.abs() >= tol && fa.abs() > fb.abs() {
                // Try inverse quadratic interpolation, or the secant method if only two
                // distinct points are available.
                let s = fb / fa;
                let (mut p, mut q) = if a == c {
                    (2.0 * m * s, 1.0 - s)
                } else {
                    let q = fa / fc;
                    let r = fb / fc;
                    (
                        s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0)),
                        (q - 1.0) * (r - 1.0) * (s - 1.0),
                    )
                };

                if p > 0.0 {
                    q = -q;
                } else {
                    p = -p;
                }

                let min1 = 3.0 * m * q - (tol * q).abs();
                let min2 = (e * q).abs();
                if 2.0 * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    // Interpolation failed, fall back to bisection.
                    d = m;
                    e = d;
                }
            } else {
                d = m;
                e = d;
            }

            a = b;
            fa = fb;
            b += if d.abs() > tol { d } else { tol.copysign(m) };
            fb = f(b)?;

            if !fb.is_finite() {
                return Err(ParcelError::Convergence);
            }
        }

        tracing::trace!(
            low_val,
            high_val,
            max_iterations = self.max_iterations,
            "root finder hit the iteration cap"
        );
        Err(ParcelError::Convergence)
    }
}
