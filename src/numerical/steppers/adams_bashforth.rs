use super::coefficients::{self, ButcherTableau};
use super::explicit_rk::rk_step;
use super::{StepResult, Stepper, accept_sample};
use crate::numerical::history::History;
use crate::numerical::ode_error::OdeError;
use crate::numerical::vector_field::VectorField;

/// Explicit k-step Adams-Bashforth, `y_{n+1} = y_n + h Σ β_j f_{n-j}`.
#[derive(Debug, Clone)]
pub struct AdamsBashforth {
    order: usize,
    beta: Vec<f64>,
    bootstrap: ButcherTableau,
}

impl AdamsBashforth {
    pub fn new(order: usize, bootstrap: ButcherTableau) -> Result<AdamsBashforth, OdeError> {
        let beta = coefficients::adams_bashforth(order).ok_or_else(|| {
            OdeError::InvalidOptions(format!(
                "Adams-Bashforth order must be in 2..=6, got {}",
                order
            ))
        })?;
        Ok(AdamsBashforth {
            order,
            beta,
            bootstrap,
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
        let t = latest.t;
        let mut y_new = latest.y.clone();
        for (j, beta_j) in self.beta.iter().enumerate() {
            let entry = history.back(j).ok_or(OdeError::EmptyHistory)?;
            y_new.axpy(h * beta_j, &entry.f, 1.0);
        }
        accept_sample(field, history, t + h, y_new, None, h)
    }
}

impl Stepper for AdamsBashforth {
    fn name(&self) -> String {
        format!("AB{}", self.order)
    }

    fn lookback(&self) -> usize {
        self.order
    }

    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult {
        StepResult::from_result(self.try_advance(field, history, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn run_ab(order: usize, field: &VectorField, y0: f64, h: f64, n: usize) -> Vec<f64> {
        let mut stepper = AdamsBashforth::new(order, ButcherTableau::rk4()).unwrap();
        let mut history = History::new(stepper.lookback());
        let y0 = DVector::from_element(1, y0);
        let f0 = field.eval(0.0, &y0).unwrap();
        history.push(0.0, y0, f0);
        let mut ys = Vec::new();
        for _ in 0..n {
            match stepper.advance(field, &mut history, h) {
                StepResult::Accepted { state, .. } => ys.push(state[0]),
                other => panic!("step failed: {:?}", other),
            }
        }
        ys
    }

    #[test]
    fn test_ab4_bootstrap_uses_rk4() {
        let field = VectorField::new(|_t, y: &DVector<f64>| -y.clone());
        let ys = run_ab(4, &field, 1.0, 0.1, 3);
        // RK4 amplification on y' = -y
        let z: f64 = -0.1;
        let r = 1.0 + z + z * z / 2.0 + z.powi(3) / 6.0 + z.powi(4) / 24.0;
        assert_relative_eq!(ys[0], r, epsilon = 1e-15);
        assert_relative_eq!(ys[2], r.powi(3), epsilon = 1e-14);
    }

    #[test]
    fn test_ab_exact_on_quadratic_in_t() {
        // y' = 2t, y = t^2: AB3 and higher are exact once started
        let field = VectorField::new(|t, _y: &DVector<f64>| DVector::from_element(1, 2.0 * t));
        let ys = run_ab(3, &field, 0.0, 0.1, 20);
        assert_relative_eq!(ys[19], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ab6_accuracy() {
        let field = VectorField::new(|_t, y: &DVector<f64>| -y.clone());
        let ys = run_ab(6, &field, 1.0, 0.01, 100);
        assert!((ys[99] - (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_order_range() {
        assert!(AdamsBashforth::new(1, ButcherTableau::rk4()).is_err());
        assert!(AdamsBashforth::new(6, ButcherTableau::rk4()).is_ok());
        assert_eq!(AdamsBashforth::new(5, ButcherTableau::rk4()).unwrap().name(), "AB5");
    }
}
