//! Bracketing root finder used by the MLE and MAP estimators.

use crate::error::{CatError, Result};

pub const THETA_BRACKET: (f64, f64) = (-5.0, 5.0);
pub const MAX_ITERATIONS: usize = 100;
pub const RELATIVE_TOLERANCE: f64 = 1e-7;

/// Result of a root search. `converged == false` means the iteration cap was
/// hit and `root` is the last iterate; callers that need a hard guarantee
/// must check this themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootEstimate {
    pub root: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Brent's method (inverse quadratic interpolation with bisection
/// fallback). Convergence is declared when the bracket `[lo, hi]` satisfies
/// `|hi - lo| < abs_tol + rel_tol * min(|lo|, |hi|)` (the minimum is taken
/// as zero when the bracket straddles zero), or when the function vanishes
/// exactly at the current iterate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brent {
    pub max_iterations: usize,
    pub rel_tol: f64,
    pub abs_tol: f64,
}

impl Default for Brent {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            rel_tol: RELATIVE_TOLERANCE,
            abs_tol: 0.0,
        }
    }
}

impl Brent {
    pub fn find_root<F>(&self, mut f: F, lower: f64, upper: f64) -> Result<RootEstimate>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        let mut a = lower;
        let mut b = upper;
        let mut fa = f(a)?;
        let mut fb = f(b)?;

        if fa == 0.0 {
            return Ok(RootEstimate {
                root: a,
                iterations: 0,
                converged: true,
            });
        }
        if fb == 0.0 {
            return Ok(RootEstimate {
                root: b,
                iterations: 0,
                converged: true,
            });
        }
        if fa.is_nan() || fb.is_nan() || (fa > 0.0) == (fb > 0.0) {
            return Err(CatError::NumericDomain(format!(
                "function does not change sign over [{lower}, {upper}] (f = {fa}, {fb})"
            )));
        }

        let mut c = a;
        let mut fc = fa;
        let mut d = b - a;
        let mut e = d;

        for iteration in 1..=self.max_iterations {
            if (fb > 0.0) == (fc > 0.0) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol = 2.0 * f64::EPSILON * b.abs();
            let m = 0.5 * (c - b);

            if fb == 0.0 {
                return Ok(RootEstimate {
                    root: b,
                    iterations: iteration,
                    converged: true,
                });
            }

            if e.abs() >= tol && fa.abs() > fb.abs() {
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
                if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                    e = d;
                    d = p / q;
                } else {
                    d = m;
                    e = m;
                }
            } else {
                d = m;
                e = m;
            }

            a = b;
            fa = fb;
            b += if d.abs() > tol { d } else { tol.copysign(m) };
            fb = f(b)?;

            if (fb > 0.0) == (fc > 0.0) {
                // the new bracket is [a, b]
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }

            if self.bracket_converged(b, c) {
                return Ok(RootEstimate {
                    root: b,
                    iterations: iteration,
                    converged: true,
                });
            }
        }

        tracing::debug!(
            root = b,
            bracket_lo = b.min(c),
            bracket_hi = b.max(c),
            max_iterations = self.max_iterations,
            "root finder hit iteration cap; returning last iterate"
        );
        Ok(RootEstimate {
            root: b,
            iterations: self.max_iterations,
            converged: false,
        })
    }

    fn bracket_converged(&self, x: f64, y: f64) -> bool {
        let (lo, hi) = (x.min(y), x.max(y));
        let min_abs = if (lo > 0.0 && hi > 0.0) || (lo < 0.0 && hi < 0.0) {
            lo.abs().min(hi.abs())
        } else {
            0.0
        };
        (hi - lo).abs() < self.abs_tol + self.rel_tol * min_abs
    }
}
