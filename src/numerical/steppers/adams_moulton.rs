use super::coefficients::{self, ButcherTableau};
use super::explicit_rk::rk_step;
use super::{StepResult, Stepper, accept_sample};
use crate::numerical::history::History;
use crate::numerical::implicit_solver::ImplicitSolver;
use crate::numerical::ode_error::OdeError;
use crate::numerical::vector_field::VectorField;
use log::debug;
use nalgebra::DVector;

/// Implicit Adams-Moulton of order p with an Adams-Bashforth predictor of the same order.
///
/// corrector: `y_{n+1} = y_n + h (β_0 f(t_{n+1}, y_{n+1}) + Σ_{j≥1} β_j f_{n+1-j})`
#[derive(Debug, Clone)]
pub struct AdamsMoulton {
    order: usize,
    beta: Vec<f64>,
    predictor: Vec<f64>,
    bootstrap: ButcherTableau,
    solver: ImplicitSolver,
    iterations: usize,
}

impl AdamsMoulton {
    pub fn new(
        order: usize,
        bootstrap: ButcherTableau,
        solver: ImplicitSolver,
    ) -> Result<AdamsMoulton, OdeError> {
        let invalid = || {
            OdeError::InvalidOptions(format!("Adams-Moulton order must be in 2..=6, got {}", order))
        };
        let beta = coefficients::adams_moulton(order).ok_or_else(invalid)?;
        let predictor = coefficients::adams_bashforth(order).ok_or_else(invalid)?;
        Ok(AdamsMoulton {
            order,
            beta,
            predictor,
            bootstrap,
            solver,
            iterations: 0,
        })
    }

    fn try_advance(
        &mut self,
        field: &VectorField,
        history: &mut History,
        h: f64,
    ) -> Result<StepResult, OdeError> {
        if !history.is_ready(self.order) {
            return rk_step(&self.bootstrap, field, history, h);
        }
        let latest = history.latest().ok_or(OdeError::EmptyHistory)?;
        let t_new = latest.t + h;
        let y_n = latest.y.clone();

        let mut y_pred = y_n.clone();
        // explicit part of the corrector, β_0 term excluded
        let mut psi = y_n;
        for j in 0..self.order {
            let f_j = &history.back(j).ok_or(OdeError::EmptyHistory)?.f;
            y_pred.axpy(h * self.predictor[j], f_j, 1.0);
            if j + 1 < self.order {
                psi.axpy(h * self.beta[j + 1], f_j, 1.0);
            }
        }

        let h_beta0 = h * self.beta[0];
        let g = |x: &DVector<f64>| -> Result<DVector<f64>, OdeError> {
            let f_x = field.eval(t_new, x)?;
            Ok(&psi + h_beta0 * f_x)
        };
        let converged = self.solver.solve(t_new, g, y_pred)?;
        self.iterations += converged.iterations;
        debug!(
            "AM{} step to t = {:.6} converged in {} iterations",
            self.order, t_new, converged.iterations
        );
        accept_sample(field, history, t_new, converged.x, None, h)
    }
}

impl Stepper for AdamsMoulton {
    fn name(&self) -> String {
        format!("AM{}", self.order)
    }

    fn lookback(&self) -> usize {
        self.order
    }

    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult {
        StepResult::from_result(self.try_advance(field, history, h))
    }

    fn implicit_iterations(&self) -> usize {
        self.iterations
    }
}
