//! Error types of the integration engine.
//!
//! Shape and grid errors are detected before the first step and abort the run
//! with an empty trajectory. Step-level failures (`NonConvergence`,
//! `StepSizeUnderflow`, `Diverged`) terminate the run but the samples accepted
//! before the failure are still handed back to the caller.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OdeError {
    #[error("vector field returned {got} components for a state of dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("method {method} cannot integrate a state of dimension {dim}: a [positions, velocities] split needs an even dimension")]
    UnsupportedStateShape { method: String, dim: usize },

    #[error("implicit iteration did not converge after {iterations} iterations (last correction {residual:e})")]
    NonConvergence { iterations: usize, residual: f64 },

    #[error("step size underflow: h = {h:e} after {rejections} consecutive rejections")]
    StepSizeUnderflow { h: f64, rejections: usize },

    #[error("solution diverged at t = {t}: non-finite value in state")]
    Diverged { t: f64 },

    #[error("invalid time grid: t0 = {t0}, t_end = {t_end}, h = {h}")]
    InvalidTimeGrid { t0: f64, t_end: f64, h: f64 },

    #[error("initial state is empty")]
    EmptyState,

    #[error("stepper called before the initial sample was recorded")]
    EmptyHistory,

    #[error("invalid solver options: {0}")]
    InvalidOptions(String),

    #[error("unknown method name: {0}")]
    UnknownMethod(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("plotting error: {0}")]
    Plot(String),
}

impl OdeError {
    /// true for failures raised by a step after integration started
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            OdeError::NonConvergence { .. }
                | OdeError::StepSizeUnderflow { .. }
                | OdeError::Diverged { .. }
        )
    }
}
