//! Bracketed scalar root finding.
//!
//! Scan-then-refine: a coarse scan locates a sign change, then the Illinois
//! variant of regula falsi refines it with a bisection fallback.

use beam_types::error::{BeamError, BeamResult};

#[derive(Debug, Clone, Copy)]
pub struct RootConfig {
    pub x_tol: f64,
    pub f_tol: f64,
    pub max_iters: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        RootConfig {
            x_tol: 1e-12,
            f_tol: 1e-12,
            max_iters: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    pub f: f64,
    pub iterations: usize,
}

/// A bracket `[lo, hi]` with function values of opposite sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lo: f64,
    pub hi: f64,
    pub f_lo: f64,
    pub f_hi: f64,
}

/// Scan `n` equal intervals of `[lo, hi]` for the first sign change.
///
/// Points where `f` is `None` (outside its domain) end the scan; the
/// bracket must be found before them.
pub fn scan_for_bracket<F>(mut f: F, lo: f64, hi: f64, n: usize) -> BeamResult<Option<Bracket>>
where
    F: FnMut(f64) -> BeamResult<Option<f64>>,
{
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo || n == 0 {
        return Err(BeamError::PhysicsViolation(format!(
            "invalid scan interval [{lo}, {hi}] with {n} cells"
        )));
    }
    let h = (hi - lo) / n as f64;
    let Some(mut f_prev) = f(lo)? else {
        return Ok(None);
    };
    let mut x_prev = lo;
    for i in 1..=n {
        let x = lo + i as f64 * h;
        let Some(fx) = f(x)? else {
            return Ok(None);
        };
        if f_prev == 0.0 {
            return Ok(Some(Bracket {
                lo: x_prev,
                hi: x_prev,
                f_lo: 0.0,
                f_hi: 0.0,
            }));
        }
        if f_prev.signum() != fx.signum() {
            return Ok(Some(Bracket {
                lo: x_prev,
                hi: x,
                f_lo: f_prev,
                f_hi: fx,
            }));
        }
        x_prev = x;
        f_prev = fx;
    }
    Ok(None)
}

/// Refine a root inside a sign-change bracket.
pub fn solve_bracketed<F>(mut f: F, bracket: Bracket, cfg: RootConfig) -> BeamResult<Root>
where
    F: FnMut(f64) -> BeamResult<f64>,
{
    let Bracket {
        mut lo,
        mut hi,
        mut f_lo,
        mut f_hi,
    } = bracket;

    if f_lo == 0.0 {
        return Ok(Root { x: lo, f: 0.0, iterations: 0 });
    }
    if f_hi == 0.0 {
        return Ok(Root { x: hi, f: 0.0, iterations: 0 });
    }
    if f_lo.signum() == f_hi.signum() {
        return Err(BeamError::NoMatchedSolution(format!(
            "root not bracketed: f({lo})={f_lo}, f({hi})={f_hi}"
        )));
    }

    // Side that was retained on the previous step: -1 lo, +1 hi.
    let mut side = 0i8;
    for iter in 1..=cfg.max_iters {
        let mut x = (lo * f_hi - hi * f_lo) / (f_hi - f_lo);
        if !x.is_finite() || x <= lo.min(hi) || x >= lo.max(hi) {
            x = 0.5 * (lo + hi);
        }
        let fx = f(x)?;
        if !fx.is_finite() {
            return Err(BeamError::SolverDiverged {
                iteration: iter,
                message: format!("non-finite residual at x={x}"),
            });
        }
        if fx.abs() <= cfg.f_tol {
            return Ok(Root { x, f: fx, iterations: iter });
        }

        if fx.signum() == f_hi.signum() {
            hi = x;
            f_hi = fx;
            if side == -1 {
                f_lo *= 0.5;
            }
            side = -1;
        } else {
            lo = x;
            f_lo = fx;
            if side == 1 {
                f_hi *= 0.5;
            }
            side = 1;
        }

        if (hi - lo).abs() <= cfg.x_tol * (1.0 + x.abs()) {
            return Ok(Root { x, f: fx, iterations: iter });
        }
    }

    Err(BeamError::SolverDiverged {
        iteration: cfg.max_iters,
        message: format!("root bracket [{lo}, {hi}] did not shrink below tolerance"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_two() {
        let bracket = Bracket {
            lo: 0.0,
            hi: 2.0,
            f_lo: -2.0,
            f_hi: 2.0,
        };
        let root = solve_bracketed(|x| Ok(x * x - 2.0), bracket, RootConfig::default()).unwrap();
        assert!((root.x - std::f64::consts::SQRT_2).abs() < 1e-10);
    }

    #[test]
    fn test_scan_finds_first_sign_change() {
        let bracket = scan_for_bracket(|x| Ok(Some(x.cos())), 0.0, 10.0, 100)
            .unwrap()
            .unwrap();
        assert!(bracket.lo <= std::f64::consts::FRAC_PI_2);
        assert!(bracket.hi >= std::f64::consts::FRAC_PI_2);
        assert!(bracket.hi - bracket.lo < 0.11);
    }

    #[test]
    fn test_scan_stops_outside_domain() {
        let found = scan_for_bracket(
            |x| Ok(if x < 1.0 { Some(x + 1.0) } else { None }),
            0.0,
            5.0,
            50,
        )
        .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_unbracketed_is_reported() {
        let bracket = Bracket {
            lo: 0.0,
            hi: 1.0,
            f_lo: 1.0,
            f_hi: 2.0,
        };
        let err = solve_bracketed(|x| Ok(x + 1.0), bracket, RootConfig::default()).unwrap_err();
        assert!(matches!(err, BeamError::NoMatchedSolution(_)));
    }

    #[test]
    fn test_error_propagates_from_residual() {
        let bracket = Bracket {
            lo: 0.0,
            hi: 1.0,
            f_lo: -1.0,
            f_hi: 1.0,
        };
        let err = solve_bracketed(
            |_| Err(BeamError::PhysicsViolation("boom".to_string())),
            bracket,
            RootConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BeamError::PhysicsViolation(_)));
    }
}
