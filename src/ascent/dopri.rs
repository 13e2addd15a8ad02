//! Adaptive Dormand-Prince 5(4) integration of an autonomous system.
//!
//! The solver keeps its state between calls so an ascent can be advanced one report interval at a
//! time. The last stage of an accepted step is the first stage of the next one (FSAL), and the
//! step size carries over between calls.
use crate::error::{ParcelError, Result};

// Butcher tableau. The system is autonomous, so the nodes are not needed. The last row gives the
// fifth order solution.
const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

// Difference between the fifth and fourth order weights.
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
const ERROR_EXPONENT: f64 = -0.2;

/// Default relative tolerance.
pub const DEFAULT_RTOL: f64 = 1.0e-6;
/// Default absolute tolerance.
pub const DEFAULT_ATOL: f64 = 1.0e-12;
/// Default cap on the number of steps taken in one call to `integrate_to`.
pub const DEFAULT_MAX_SUBSTEPS: usize = 10_000;

#[derive(Debug, Clone)]
pub(crate) struct DormandPrince<const N: usize> {
    t: f64,
    y: [f64; N],
    // Derivative at (t, y), reused as the first stage.
    k1: Option<[f64; N]>,
    // Next step size to try, zero until the first step is chosen.
    h: f64,
    rtol: f64,
    atol: f64,
    max_substeps: usize,
}

impl<const N: usize> DormandPrince<N> {
    pub(crate) fn new(y0: [f64; N], rtol: f64, atol: f64, max_substeps: usize) -> Self {
        DormandPrince {
            t: 0.0,
            y: y0,
            k1: None,
            h: 0.0,
            rtol,
            atol,
            max_substeps,
        }
    }

    #[inline]
    pub(crate) fn time(&self) -> f64 {
        self.t
    }

    #[inline]
    pub(crate) fn state(&self) -> [f64; N] {
        self.y
    }

    /// Advance the solution to exactly `t_end`.
    ///
    /// If an evaluation of `f` fails the error is returned and the solver is left at the last
    /// accepted step.
    pub(crate) fn integrate_to<F>(&mut self, f: &mut F, t_end: f64) -> Result<()>
    where
        F: FnMut(&[f64; N]) -> Result<[f64; N]>,
    {
        if !(t_end > self.t) {
            return Ok(());
        }

        let mut k1 = match self.k1 {
            Some(k1) => k1,
            None => {
                let k1 = f(&self.y)?;
                self.k1 = Some(k1);
                k1
            }
        };

        if self.h <= 0.0 {
            self.h = self.initial_step(f, &k1, t_end)?;
        }

        let mut rejected = false;
        let mut substeps = 0;
        while self.t < t_end {
            substeps += 1;
            if substeps > self.max_substeps {
                tracing::debug!(t = self.t, t_end, "integrator hit the substep cap");
                return Err(ParcelError::Convergence);
            }

            let remaining = t_end - self.t;
            let last = self.h >= remaining;
            let h = if last { remaining } else { self.h };

            let (y_new, k7, err) = self.step(f, &k1, h)?;

            if err <= 1.0 {
                self.t = if last { t_end } else { self.t + h };
                self.y = y_new;
                k1 = k7;
                self.k1 = Some(k7);

                let mut factor = if err == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * err.powf(ERROR_EXPONENT))
                        .max(MIN_FACTOR)
                        .min(MAX_FACTOR)
                };
                if rejected {
                    factor = factor.min(1.0);
                }

                self.h = h * factor;
                rejected = false;
            } else {
                self.h = h * (SAFETY * err.powf(ERROR_EXPONENT)).max(MIN_FACTOR);
                rejected = true;
            }

            if !(self.h >= 1.0e-12 * self.t.abs().max(1.0)) {
                tracing::debug!(t = self.t, h = self.h, "integrator step size underflow");
                return Err(ParcelError::Convergence);
            }
        }

        Ok(())
    }

    // Take a single step of size h. Returns the fifth order solution, the derivative there, and
    // the scaled error norm.
    fn step<F>(&self, f: &mut F, k1: &[f64; N], h: f64) -> Result<([f64; N], [f64; N], f64)>
    where
        F: FnMut(&[f64; N]) -> Result<[f64; N]>,
    {
        let mut k = [[0.0; N]; 7];
        k[0] = *k1;

        let mut y5 = self.y;
        for s in 1..7 {
            let mut y_stage = self.y;
            for (j, y_j) in y_stage.iter_mut().enumerate() {
                let acc: f64 = (0..s).map(|m| A[s][m] * k[m][j]).sum();
                *y_j += h * acc;
            }

            if s == 6 {
                y5 = y_stage;
            }
            k[s] = f(&y_stage)?;
        }

        let mut sum_sq = 0.0;
        for j in 0..N {
            let err_j: f64 = h * (0..7).map(|m| E[m] * k[m][j]).sum::<f64>();
            let scale = self.atol + self.rtol * self.y[j].abs().max(y5[j].abs());
            sum_sq += (err_j / scale).powi(2);
        }

        Ok((y5, k[6], (sum_sq / N as f64).sqrt()))
    }

    // Hairer's starting step heuristic.
    fn initial_step<F>(&self, f: &mut F, k1: &[f64; N], t_end: f64) -> Result<f64>
    where
        F: FnMut(&[f64; N]) -> Result<[f64; N]>,
    {
        let norm = |v: &[f64; N]| -> f64 {
            let sum_sq: f64 = v
                .iter()
                .zip(self.y.iter())
                .map(|(v, y)| (v / (self.atol + self.rtol * y.abs())).powi(2))
                .sum();
            (sum_sq / N as f64).sqrt()
        };

        let d0 = norm(&self.y);
        let d1 = norm(k1);
        let h0 = if d0 < 1.0e-5 || d1 < 1.0e-5 {
            1.0e-6
        } else {
            0.01 * d0 / d1
        };

        let mut y1 = self.y;
        for (y, k) in y1.iter_mut().zip(k1.iter()) {
            *y += h0 * k;
        }
        let f1 = f(&y1)?;

        let mut diff = f1;
        for (d, k) in diff.iter_mut().zip(k1.iter()) {
            *d -= k;
        }
        let d2 = norm(&diff) / h0;

        let max_d = d1.max(d2);
        let h1 = if max_d <= 1.0e-15 {
            (h0 * 1.0e-3).max(1.0e-6)
        } else {
            (0.01 / max_d).powf(0.2)
        };

        Ok((100.0 * h0).min(h1).min(t_end - self.t))
    }
}
