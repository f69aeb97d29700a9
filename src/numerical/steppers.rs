//! # Steppers
//!
//! Every integration method advances the solution by one step through the
//! [`Stepper`] contract:
//!
//! ```text
//! advance(field, history, h) -> Accepted | Rejected | Failed
//! ```
//!
//! `history` holds the last accepted `(t, y, f(t, y))` triples, the driver seeds it
//! with the initial sample. On acceptance the stepper appends the new sample
//! (with the field evaluated there) itself, so the derivative of the latest point
//! is computed once and reused as the first stage of the next step or as the
//! newest term of a multistep formula.
//!
//! Multistep methods (`lookback() > 1`) take bootstrap steps with a single-step
//! tableau until their history is full.
pub mod adams_bashforth;
pub mod adams_moulton;
pub mod bdf;
pub mod coefficients;
pub mod explicit_rk;
pub mod rkf45;
pub mod symplectic;

use crate::numerical::ODE_api::{MethodId, SolverOptions};
use crate::numerical::history::History;
use crate::numerical::implicit_solver::ImplicitSolver;
use crate::numerical::ode_error::OdeError;
use crate::numerical::vector_field::VectorField;
use enum_dispatch::enum_dispatch;
use nalgebra::DVector;

pub use adams_bashforth::AdamsBashforth;
pub use adams_moulton::AdamsMoulton;
pub use bdf::Bdf;
pub use explicit_rk::{BootstrapMethod, Euler, Rk2, Rk2Variant, Rk4};
pub use rkf45::Rkf45;
pub use symplectic::{StormerVerlet, Verlet};

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    ErrorTooLarge { error: f64, tolerance: f64 },
}

#[derive(Debug)]
pub enum StepResult {
    Accepted {
        t: f64,
        state: DVector<f64>,
        error_estimate: Option<f64>,
        h_next: f64,
    },
    /// only produced by adaptive methods, the (t, state) pair stays unchanged
    Rejected { reason: RejectReason, h_next: f64 },
    Failed { reason: OdeError },
}

impl StepResult {
    pub(crate) fn from_result(result: Result<StepResult, OdeError>) -> StepResult {
        result.unwrap_or_else(|reason| StepResult::Failed { reason })
    }
}

#[enum_dispatch]
#[derive(Debug, Clone)]
pub enum StepperKernel {
    Euler(Euler),
    Rk2(Rk2),
    Rk4(Rk4),
    Rkf45(Rkf45),
    AdamsBashforth(AdamsBashforth),
    AdamsMoulton(AdamsMoulton),
    Bdf(Bdf),
    Verlet(Verlet),
    StormerVerlet(StormerVerlet),
}

#[enum_dispatch(StepperKernel)]
pub trait Stepper {
    fn name(&self) -> String;
    /// number of accepted samples the method reads
    fn lookback(&self) -> usize {
        1
    }
    /// shape check against the state dimension, before the first step
    fn validate(&self, _dim: usize) -> Result<(), OdeError> {
        Ok(())
    }
    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult;
    /// total iterations spent in implicit solves so far
    fn implicit_iterations(&self) -> usize {
        0
    }
}

impl StepperKernel {
    pub fn new(method: MethodId, options: &SolverOptions) -> Result<StepperKernel, OdeError> {
        let bootstrap = options.bootstrap.tableau(options.rk2_variant);
        let solver = ImplicitSolver::new(options.tol, options.max_iter, options.iteration);
        let kernel = match method {
            MethodId::Euler => StepperKernel::Euler(Euler::new()),
            MethodId::RK2 => StepperKernel::Rk2(Rk2::new(options.rk2_variant)),
            MethodId::RK4 => StepperKernel::Rk4(Rk4::new()),
            MethodId::RKF45 => StepperKernel::Rkf45(Rkf45::new(options.controller())),
            MethodId::AdamsBashforth(order) => {
                StepperKernel::AdamsBashforth(AdamsBashforth::new(order, bootstrap)?)
            }
            MethodId::AdamsMoulton(order) => {
                StepperKernel::AdamsMoulton(AdamsMoulton::new(order, bootstrap, solver)?)
            }
            MethodId::BDF(order) => StepperKernel::Bdf(Bdf::new(order, bootstrap, solver)?),
            MethodId::Verlet => StepperKernel::Verlet(Verlet::new()),
            MethodId::Symplectic => StepperKernel::StormerVerlet(StormerVerlet::new()),
        };
        Ok(kernel)
    }
}

/// Checks the new state, evaluates the field there and appends the sample to `history`.
pub(crate) fn accept_sample(
    field: &VectorField,
    history: &mut History,
    t: f64,
    state: DVector<f64>,
    error_estimate: Option<f64>,
    h_next: f64,
) -> Result<StepResult, OdeError> {
    if state.iter().any(|v| !v.is_finite()) {
        return Err(OdeError::Diverged { t });
    }
    let f = field.eval(t, &state)?;
    history.push(t, state.clone(), f);
    Ok(StepResult::Accepted {
        t,
        state,
        error_estimate,
        h_next,
    })
}
