use super::coefficients::{self, ButcherTableau};
use super::explicit_rk::rk_step;
use super::{StepResult, Stepper, accept_sample};
use crate::numerical::history::History;
use crate::numerical::implicit_solver::ImplicitSolver;
use crate::numerical::ode_error::OdeError;
use crate::numerical::vector_field::VectorField;
use log::debug;
use nalgebra::DVector;

/// Fixed step backward differentiation formula of order q,
/// `y_{n+1} = Σ a_j y_{n+1-j} + h b f(t_{n+1}, y_{n+1})`.
/// The explicit Euler predictor `y_n + h f_n` seeds the implicit solve.
#[derive(Debug, Clone)]
pub struct Bdf {
    order: usize,
    a: Vec<f64>,
    b: f64,
    bootstrap: ButcherTableau,
    solver: ImplicitSolver,
    iterations: usize,
}

impl Bdf {
    pub fn new(order: usize, bootstrap: ButcherTableau, solver: ImplicitSolver) -> Result<Bdf, OdeError> {
        let (a, b) = coefficients::bdf(order).ok_or_else(|| {
            OdeError::InvalidOptions(format!("BDF order must be in 1..=6, got {}", order))
        })?;
        Ok(Bdf {
            order,
            a,
            b,
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
        let mut guess = latest.y.clone();
        guess.axpy(h, &latest.f, 1.0);

        let mut psi = DVector::zeros(latest.y.len());
        for (j, a_j) in self.a.iter().enumerate() {
            let y_j = &history.back(j).ok_or(OdeError::EmptyHistory)?.y;
            psi.axpy(*a_j, y_j, 1.0);
        }

        let h_b = h * self.b;
        let g = |x: &DVector<f64>| -> Result<DVector<f64>, OdeError> {
            let f_x = field.eval(t_new, x)?;
            Ok(&psi + h_b * f_x)
        };
        let converged = self.solver.solve(t_new, g, guess)?;
        self.iterations += converged.iterations;
        debug!(
            "BDF{} step to t = {:.6} converged in {} iterations",
            self.order, t_new, converged.iterations
        );
        accept_sample(field, history, t_new, converged.x, None, h)
    }
}

impl Stepper for Bdf {
    fn name(&self) -> String {
        format!("BDF{}", self.order)
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
