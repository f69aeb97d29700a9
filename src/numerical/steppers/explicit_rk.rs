//! Explicit one-step Runge-Kutta methods driven by a Butcher tableau.
//!
//! The first stage `k1 = f(t_n, y_n)` is never recomputed: it is the derivative
//! stored with the latest history entry.
use super::coefficients::ButcherTableau;
use super::{Stepper, StepResult, accept_sample};
use crate::numerical::history::History;
use crate::numerical::ode_error::OdeError;
use crate::numerical::vector_field::VectorField;
use nalgebra::DVector;
use serde::Deserialize;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Deserialize, Default)]
pub enum Rk2Variant {
    #[default]
    Midpoint,
    Heun,
}

impl Rk2Variant {
    pub fn tableau(&self) -> ButcherTableau {
        match self {
            Rk2Variant::Midpoint => ButcherTableau::midpoint(),
            Rk2Variant::Heun => ButcherTableau::heun(),
        }
    }
}

/// single-step method used to fill the history of multistep methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Deserialize, Default)]
pub enum BootstrapMethod {
    Euler,
    RK2,
    #[default]
    RK4,
}

impl BootstrapMethod {
    pub fn tableau(&self, rk2_variant: Rk2Variant) -> ButcherTableau {
        match self {
            BootstrapMethod::Euler => ButcherTableau::euler(),
            BootstrapMethod::RK2 => rk2_variant.tableau(),
            BootstrapMethod::RK4 => ButcherTableau::rk4(),
        }
    }
}

/// stages k_1..k_s of `tableau` at (t, y), `f0` = f(t, y)
pub fn rk_stages(
    tableau: &ButcherTableau,
    field: &VectorField,
    t: f64,
    y: &DVector<f64>,
    f0: &DVector<f64>,
    h: f64,
) -> Result<Vec<DVector<f64>>, OdeError> {
    let mut k: Vec<DVector<f64>> = Vec::with_capacity(tableau.stages());
    k.push(f0.clone());
    for i in 1..tableau.stages() {
        let mut y_stage = y.clone();
        for (j, a_ij) in tableau.a[i].iter().enumerate() {
            if *a_ij != 0.0 {
                y_stage.axpy(h * a_ij, &k[j], 1.0);
            }
        }
        k.push(field.eval(t + tableau.c[i] * h, &y_stage)?);
    }
    Ok(k)
}

/// y + h Σ w_i k_i
pub fn combine(y: &DVector<f64>, k: &[DVector<f64>], weights: &[f64], h: f64) -> DVector<f64> {
    let mut y_new = y.clone();
    for (k_i, w_i) in k.iter().zip(weights.iter()) {
        if *w_i != 0.0 {
            y_new.axpy(h * w_i, k_i, 1.0);
        }
    }
    y_new
}

/// One fixed step of an explicit tableau from the latest history entry.
pub fn rk_step(
    tableau: &ButcherTableau,
    field: &VectorField,
    history: &mut History,
    h: f64,
) -> Result<StepResult, OdeError> {
    let latest = history.latest().ok_or(OdeError::EmptyHistory)?;
    let t = latest.t;
    let k = rk_stages(tableau, field, t, &latest.y, &latest.f, h)?;
    let y_new = combine(&latest.y, &k, &tableau.b, h);
    accept_sample(field, history, t + h, y_new, None, h)
}

#[derive(Debug, Clone)]
pub struct Euler {
    tableau: ButcherTableau,
}

impl Euler {
    pub fn new() -> Euler {
        Euler {
            tableau: ButcherTableau::euler(),
        }
    }
}

impl Default for Euler {
    fn default() -> Self {
        Euler::new()
    }
}

impl Stepper for Euler {
    fn name(&self) -> String {
        "Euler".to_string()
    }

    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult {
        StepResult::from_result(rk_step(&self.tableau, field, history, h))
    }
}

#[derive(Debug, Clone)]
pub struct Rk2 {
    variant: Rk2Variant,
    tableau: ButcherTableau,
}

impl Rk2 {
    pub fn new(variant: Rk2Variant) -> Rk2 {
        Rk2 {
            variant,
            tableau: variant.tableau(),
        }
    }
}

impl Stepper for Rk2 {
    fn name(&self) -> String {
        format!("RK2 ({})", self.variant)
    }

    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult {
        StepResult::from_result(rk_step(&self.tableau, field, history, h))
    }
}

#[derive(Debug, Clone)]
pub struct Rk4 {
    tableau: ButcherTableau,
}

impl Rk4 {
    pub fn new() -> Rk4 {
        Rk4 {
            tableau: ButcherTableau::rk4(),
        }
    }
}

impl Default for Rk4 {
    fn default() -> Self {
        Rk4::new()
    }
}

impl Stepper for Rk4 {
    fn name(&self) -> String {
        "RK4".to_string()
    }

    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult {
        StepResult::from_result(rk_step(&self.tableau, field, history, h))
    }
}
