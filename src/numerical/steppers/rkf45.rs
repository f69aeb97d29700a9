use super::coefficients::ButcherTableau;
use super::explicit_rk::{combine, rk_stages};
use super::{RejectReason, StepResult, Stepper, accept_sample};
use crate::numerical::adaptive_controller::{AdaptiveController, StepDecision};
use crate::numerical::history::History;
use crate::numerical::ode_error::OdeError;
use crate::numerical::vector_field::VectorField;
use log::debug;

/// Runge-Kutta-Fehlberg 4(5) with step size control.
///
/// The 5th order solution is propagated, the error estimate is the Euclidean
/// norm of the difference between the 5th and 4th order results. A non-finite
/// estimate is rejected like a large one; if the controller runs out of
/// retries on it the step fails with `Diverged`.
#[derive(Debug, Clone)]
pub struct Rkf45 {
    tableau: ButcherTableau,
    controller: AdaptiveController,
}

impl Rkf45 {
    pub fn new(controller: AdaptiveController) -> Rkf45 {
        Rkf45 {
            tableau: ButcherTableau::fehlberg45(),
            controller,
        }
    }

    pub fn controller(&self) -> &AdaptiveController {
        &self.controller
    }

    fn try_advance(
        &mut self,
        field: &VectorField,
        history: &mut History,
        h: f64,
    ) -> Result<StepResult, OdeError> {
        let latest = history.latest().ok_or(OdeError::EmptyHistory)?;
        let t = latest.t;
        let k = rk_stages(&self.tableau, field, t, &latest.y, &latest.f, h)?;
        let y5 = combine(&latest.y, &k, &self.tableau.b, h);
        let b4 = self.tableau.b_err.as_deref().unwrap_or(self.tableau.b.as_slice());
        let y4 = combine(&latest.y, &k, b4, h);
        let error = (&y5 - &y4).norm();

        // giving up on a non-finite estimate means the field itself blew up
        let decision = self.controller.decide(h, error).map_err(|e| {
            if error.is_finite() {
                e
            } else {
                OdeError::Diverged { t: t + h }
            }
        })?;
        match decision {
            StepDecision::Accept { h_next } => {
                debug!("t = {:.6}: accepted h = {:e}, error {:e}", t + h, h, error);
                accept_sample(field, history, t + h, y5, Some(error), h_next)
            }
            StepDecision::Reject { h_next } => Ok(StepResult::Rejected {
                reason: RejectReason::ErrorTooLarge {
                    error,
                    tolerance: self.controller.tolerance,
                },
                h_next,
            }),
        }
    }
}

impl Stepper for Rkf45 {
    fn name(&self) -> String {
        "RKF45".to_string()
    }

    fn advance(&mut self, field: &VectorField, history: &mut History, h: f64) -> StepResult {
        StepResult::from_result(self.try_advance(field, history, h))
    }
}
