use crate::numerical::ode_error::OdeError;
use log::debug;

/// verdict of the controller on one trial step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepDecision {
    Accept { h_next: f64 },
    Reject { h_next: f64 },
}

/// Step size control for the embedded 4(5) pair.
///
/// `error ≤ tolerance` accepts and grows the step by
/// `min(growth_cap, safety·(tol/err)^(1/5))`; otherwise the step is retried with
/// `h·max(shrink_floor, safety·(tol/err)^(1/5))`. Consecutive rejections are
/// counted and reset by every accepted step.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    pub tolerance: f64,
    pub safety: f64,
    pub growth_cap: f64,
    pub shrink_floor: f64,
    pub h_min: f64,
    pub h_max: Option<f64>,
    pub max_rejections: usize,
    rejections: usize,
}

impl AdaptiveController {
    pub fn new(tolerance: f64) -> AdaptiveController {
        AdaptiveController {
            tolerance,
            safety: 0.9,
            growth_cap: 2.0,
            shrink_floor: 0.1,
            h_min: 1e-12,
            h_max: None,
            max_rejections: 10,
            rejections: 0,
        }
    }

    pub fn set_limits(&mut self, h_min: f64, h_max: Option<f64>, max_rejections: usize) {
        self.h_min = h_min;
        self.h_max = h_max;
        self.max_rejections = max_rejections;
    }

    pub fn set_factors(&mut self, safety: f64, growth_cap: f64, shrink_floor: f64) {
        self.safety = safety;
        self.growth_cap = growth_cap;
        self.shrink_floor = shrink_floor;
    }

    /// consecutive rejections since the last accepted step
    pub fn rejections(&self) -> usize {
        self.rejections
    }

    pub fn reset(&mut self) {
        self.rejections = 0;
    }

    /// Judges a trial step of size `h` with error estimate `err`.
    pub fn decide(&mut self, h: f64, err: f64) -> Result<StepDecision, OdeError> {
        if err.is_finite() && err <= self.tolerance {
            let factor = if err == 0.0 {
                self.growth_cap
            } else {
                self.growth_cap
                    .min(self.safety * (self.tolerance / err).powf(0.2))
            };
            let mut h_next = h * factor;
            if let Some(h_max) = self.h_max {
                h_next = h_next.min(h_max);
            }
            self.rejections = 0;
            return Ok(StepDecision::Accept {
                h_next: h_next.max(self.h_min),
            });
        }

        self.rejections += 1;
        let factor = if err.is_finite() {
            self.shrink_floor
                .max(self.safety * (self.tolerance / err).powf(0.2))
        } else {
            self.shrink_floor
        };
        let h_next = h * factor;
        debug!(
            "step h = {:e} rejected, error {:e} > {:e}, retry with {:e}",
            h, err, self.tolerance, h_next
        );
        if self.rejections > self.max_rejections || h_next < self.h_min {
            return Err(OdeError::StepSizeUnderflow {
                h: h_next,
                rejections: self.rejections,
            });
        }
        Ok(StepDecision::Reject { h_next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_accept_grows_step() {
        let mut controller = AdaptiveController::new(1e-6);
        // (tol/err)^(1/5) = 2 -> 0.9 * 2 = 1.8
        match controller.decide(0.1, 1e-6 / 32.0).unwrap() {
            StepDecision::Accept { h_next } => assert_relative_eq!(h_next, 0.18, epsilon = 1e-12),
            other => panic!("expected Accept, got {:?}", other),
        }
    }

    #[test]
    fn test_growth_is_capped() {
        let mut controller = AdaptiveController::new(1e-6);
        let StepDecision::Accept { h_next } = controller.decide(0.1, 1e-20).unwrap() else {
            panic!("step should be accepted");
        };
        assert_relative_eq!(h_next, 0.2, epsilon = 1e-12);
        let StepDecision::Accept { h_next } = controller.decide(0.1, 0.0).unwrap() else {
            panic!("zero error should be accepted");
        };
        assert_relative_eq!(h_next, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_tie_is_accepted() {
        let mut controller = AdaptiveController::new(1e-6);
        let decision = controller.decide(0.1, 1e-6).unwrap();
        assert!(matches!(decision, StepDecision::Accept { .. }));
    }

    #[test]
    fn test_h_max_caps_growth() {
        let mut controller = AdaptiveController::new(1e-6);
        controller.set_limits(1e-12, Some(0.15), 10);
        let StepDecision::Accept { h_next } = controller.decide(0.1, 0.0).unwrap() else {
            panic!("step should be accepted");
        };
        assert_eq!(h_next, 0.15);
    }

    #[test]
    fn test_reject_shrinks_step() {
        let mut controller = AdaptiveController::new(1e-6);
        // (tol/err)^(1/5) = 0.5 -> 0.45
        match controller.decide(0.1, 32e-6).unwrap() {
            StepDecision::Reject { h_next } => assert_relative_eq!(h_next, 0.045, epsilon = 1e-12),
            other => panic!("expected Reject, got {:?}", other),
        }
        assert_eq!(controller.rejections(), 1);
        // huge error hits the shrink floor
        let StepDecision::Reject { h_next } = controller.decide(0.1, 1e10).unwrap() else {
            panic!("step should be rejected");
        };
        assert_relative_eq!(h_next, 0.01, epsilon = 1e-15);
    }

    #[test]
    fn test_nan_error_is_rejected() {
        let mut controller = AdaptiveController::new(1e-6);
        let decision = controller.decide(0.1, f64::NAN).unwrap();
        assert!(matches!(decision, StepDecision::Reject { .. }));
    }

    #[test]
    fn test_too_many_rejections() {
        let mut controller = AdaptiveController::new(1e-6);
        controller.set_limits(1e-30, None, 3);
        let mut h = 1.0;
        for _ in 0..3 {
            match controller.decide(h, 1.0).unwrap() {
                StepDecision::Reject { h_next } => h = h_next,
                other => panic!("expected Reject, got {:?}", other),
            }
        }
        match controller.decide(h, 1.0) {
            Err(OdeError::StepSizeUnderflow { rejections, .. }) => assert_eq!(rejections, 4),
            other => panic!("expected StepSizeUnderflow, got {:?}", other),
        }
    }

    #[test]
    fn test_h_min_underflow() {
        let mut controller = AdaptiveController::new(1e-6);
        controller.set_limits(1e-3, None, 10);
        let result = controller.decide(2e-3, 1.0);
        assert!(matches!(result, Err(OdeError::StepSizeUnderflow { .. })));
    }

    #[test]
    fn test_accept_resets_rejections() {
        let mut controller = AdaptiveController::new(1e-6);
        controller.decide(0.1, 1.0).unwrap();
        assert_eq!(controller.rejections(), 1);
        controller.decide(0.01, 1e-9).unwrap();
        assert_eq!(controller.rejections(), 0);
    }
}
