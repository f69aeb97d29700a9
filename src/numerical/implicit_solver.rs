//! # Implicit update equations
//!
//! Implicit multistep methods define the new state through an equation of the form
//!
//! ```text
//! y_{n+1} = g(y_{n+1}) = ψ + h β f(t_{n+1}, y_{n+1})
//! ```
//!
//! where `ψ` collects the contributions of already accepted points.
//!
//! Two iterations are available:
//! - **FixedPoint**: `x_{i+1} = g(x_i)`. Converges when `h |β| L < 1` (`L` is the
//!   Lipschitz constant of `f`), so it is cheap but restricted to mildly stiff problems.
//! - **Newton**: solves `G(x) = x - g(x) = 0` with
//!   `x_{i+1} = x_i - J_G⁻¹ G(x_i)`, `J_G = I - ∂g/∂x`. The Jacobian is built by
//!   forward differences and factorised by LU at every iteration.
//!
//! Both stop when the Euclidean norm of the correction `‖x_{i+1} - x_i‖` drops below
//! `tol`, or fail with `NonConvergence` after `max_iter` iterations or on a singular
//! Newton matrix. A correction that is no longer finite fails with `Diverged` at the
//! time the iterate belongs to. A partial iterate is never returned as a solution.
use crate::numerical::ode_error::OdeError;
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Deserialize, Default)]
pub enum IterationScheme {
    #[default]
    FixedPoint,
    Newton,
}

/// result of a converged iteration
#[derive(Debug, Clone)]
pub struct Converged {
    pub x: DVector<f64>,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct ImplicitSolver {
    pub tol: f64,
    pub max_iter: usize,
    pub scheme: IterationScheme,
}

impl ImplicitSolver {
    pub fn new(tol: f64, max_iter: usize, scheme: IterationScheme) -> ImplicitSolver {
        ImplicitSolver {
            tol,
            max_iter,
            scheme,
        }
    }

    /// Solves `x = g(x)` starting from `guess`; `t` is the time of the unknown state.
    pub fn solve<G>(&self, t: f64, g: G, guess: DVector<f64>) -> Result<Converged, OdeError>
    where
        G: FnMut(&DVector<f64>) -> Result<DVector<f64>, OdeError>,
    {
        match self.scheme {
            IterationScheme::FixedPoint => self.fixed_point(t, g, guess),
            IterationScheme::Newton => self.newton(t, g, guess),
        }
    }

    fn fixed_point<G>(&self, t: f64, mut g: G, guess: DVector<f64>) -> Result<Converged, OdeError>
    where
        G: FnMut(&DVector<f64>) -> Result<DVector<f64>, OdeError>,
    {
        let mut x = guess;
        let mut residual = f64::NAN;
        for i in 0..self.max_iter {
            let new_x = g(&x)?;
            residual = (&new_x - &x).norm();
            if !residual.is_finite() {
                debug!("fixed-point iteration blew up at iteration {}", i + 1);
                return Err(OdeError::Diverged { t });
            }
            x = new_x;
            if residual < self.tol {
                return Ok(Converged {
                    x,
                    iterations: i + 1,
                });
            }
        }
        debug!("fixed-point iteration stopped, last correction {:e}", residual);
        Err(OdeError::NonConvergence {
            iterations: self.max_iter,
            residual,
        })
    }

    fn newton<G>(&self, t: f64, mut g: G, guess: DVector<f64>) -> Result<Converged, OdeError>
    where
        G: FnMut(&DVector<f64>) -> Result<DVector<f64>, OdeError>,
    {
        let n = guess.len();
        let mut x = guess;
        // NaN until a correction has been computed
        let mut residual = f64::NAN;
        for i in 0..self.max_iter {
            let g_x = g(&x)?;
            let big_g = &x - &g_x;
            if big_g.iter().any(|v| !v.is_finite()) {
                debug!("Newton residual blew up at iteration {}", i + 1);
                return Err(OdeError::Diverged { t });
            }
            let jac = self.residual_jacobian(&mut g, &x, &g_x)?;
            let Some(dx) = jac.lu().solve(&(-big_g)) else {
                debug!("singular Newton matrix at iteration {}", i + 1);
                return Err(OdeError::NonConvergence {
                    iterations: i + 1,
                    residual,
                });
            };
            residual = dx.norm();
            if !residual.is_finite() {
                debug!("Newton correction blew up at iteration {}", i + 1);
                return Err(OdeError::Diverged { t });
            }
            x += dx;
            if residual < self.tol {
                return Ok(Converged {
                    x,
                    iterations: i + 1,
                });
            }
        }
        debug!(
            "Newton iteration stopped for a system of size {}, last correction {:e}",
            n, residual
        );
        Err(OdeError::NonConvergence {
            iterations: self.max_iter,
            residual,
        })
    }

    /// I - dg/dx by forward differences
    fn residual_jacobian<G>(
        &self,
        g: &mut G,
        x: &DVector<f64>,
        g_x: &DVector<f64>,
    ) -> Result<DMatrix<f64>, OdeError>
    where
        G: FnMut(&DVector<f64>) -> Result<DVector<f64>, OdeError>,
    {
        let n = x.len();
        let sqrt_eps = f64::EPSILON.sqrt();
        let mut jac = DMatrix::identity(n, n);
        let mut x_shifted = x.clone();
        for j in 0..n {
            let delta = sqrt_eps * x[j].abs().max(1.0);
            x_shifted[j] = x[j] + delta;
            let g_shifted = g(&x_shifted)?;
            x_shifted[j] = x[j];
            let column = (g_shifted - g_x) / delta;
            for i in 0..n {
                jac[(i, j)] -= column[i];
            }
        }
        Ok(jac)
    }
}
