//! Position/velocity integrators for second order systems written as
//! `[q_1..q_m, v_1..v_m]`, `q' = v`, `v' = a(t, q, v)`.
//!
//! The acceleration is read from the velocity rows of the vector field, so any
//! first-order system with this layout can be passed unchanged.
use super::{StepResult, Stepper, accept_sample};
use crate::numerical::history::History;
use crate::numerical::ode_error::OdeError;
use crate::numerical::vector_field::VectorField;
use nalgebra::DVector;

fn check_even(method: &str, dim: usize) -> Result<(), OdeError> {
    if dim % 2 != 0 {
        return Err(OdeError::UnsupportedStateShape {
            method: method.to_string(),
            dim,
        });
    }
    Ok(())
}

fn split(y: &DVector<f64>) -> (DVector<f64>, DVector<f64>) {
    let m = y.len() / 2;
    (y.rows(0, m).into_owned(), y.rows(m, m).into_owned())
}

fn join(q: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
    let m = q.len();
    DVector::from_fn(2 * m, |i, _| if i < m { q[i] } else { v[i - m] })
}

fn acceleration(f: &DVector<f64>) -> DVector<f64> {
    let m = f.len() / 2;
    f.rows(m, m).into_owned()
}

/// Leapfrog: the first step half-kicks the velocity, later steps kick by a full
/// step, so the recorded velocity lives at the half steps.
#[derive(Debug, Clone, Default)]
pub struct Verlet {
    started: bool,
}

impl Verlet {
    pub fn new() -> Verlet {
        Verlet { started: false }
    }

    fn try_advance(
        &mut self,
        field: &VectorField,
        history: &mut History,
        h: f64,
    ) -> Result<StepResult, OdeError> {
        let latest = history.latest().ok_or(OdeError::EmptyHistory)?;
        check_even("Verlet", latest.y.len())?;
        let t = latest.t;
        let (q, mut v) = split(&latest.y);
        let kick = if self.started { h } else { 0.5 * h };
        v.axpy(kick, &acceleration(&latest.f), 1.0);
        let q_new = q + h * &v;
        self.started = true;
        accept_sample(field, history, t + h, join(&q_new, &v), None, h)
    }
}

impl Stepper for Verlet {
    fn name(&self) -> String {
        "Verlet".to_string()
    }

    fn validate(&self, dim: usize) -> Result<(), OdeError> {
        check_even("Verlet", dim)
    }

    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult {
        StepResult::from_result(self.try_advance(field, history, h))
    }
}

/// Störmer-Verlet: half kick, drift, half kick. Velocities are synchronous with positions.
#[derive(Debug, Clone, Default)]
pub struct StormerVerlet;

impl StormerVerlet {
    pub fn new() -> StormerVerlet {
        StormerVerlet
    }

    fn try_advance(
        &mut self,
        field: &VectorField,
        history: &mut History,
        h: f64,
    ) -> Result<StepResult, OdeError> {
        let latest = history.latest().ok_or(OdeError::EmptyHistory)?;
        check_even("Symplectic", latest.y.len())?;
        let t = latest.t;
        let (q, mut v) = split(&latest.y);
        v.axpy(0.5 * h, &acceleration(&latest.f), 1.0);
        let q_new = q + h * &v;
        let f_half = field.eval(t + h, &join(&q_new, &v))?;
        v.axpy(0.5 * h, &acceleration(&f_half), 1.0);
        accept_sample(field, history, t + h, join(&q_new, &v), None, h)
    }
}

impl Stepper for StormerVerlet {
    fn name(&self) -> String {
        "Symplectic (Stormer-Verlet)".to_string()
    }

    fn validate(&self, dim: usize) -> Result<(), OdeError> {
        check_even("Symplectic", dim)
    }

    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult {
        StepResult::from_result(self.try_advance(field, history, h))
    }
}
