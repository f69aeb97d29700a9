//! # Driver
//!
//! `run` integrates `y' = f(t, y)` from `t0` to `t_end` with one of the methods of
//! [`MethodId`]:
//!
//! 1. the options and the time grid are checked (`h` has to move `t` at both ends,
//!    a fixed grid holds at most [`MAX_FIXED_STEPS`] steps), the stepper is built and
//!    checks the state shape;
//! 2. the field is evaluated once at `(t0, y0)`, a wrong derivative length aborts the run
//!    before any sample is recorded;
//! 3. fixed-step methods take `N = ceil((t_end - t0) / h)` steps, so the last sample may
//!    pass `t_end` by less than one step; RKF45 adapts `h` and clips its last step to
//!    land on `t_end`, a trial step too small to move `t` is a `StepSizeUnderflow`;
//! 4. a failing step stops the run, the samples accepted so far are returned in
//!    [`RunFailure`].
//!
//! [`ODEsolver`] wraps `run` with result export and plotting.
use crate::Utils::logger::{init_logger, parse_loglevel};
use crate::numerical::adaptive_controller::AdaptiveController;
use crate::numerical::history::History;
pub use crate::numerical::implicit_solver::IterationScheme;
use crate::numerical::ode_error::OdeError;
pub use crate::numerical::steppers::{BootstrapMethod, Rk2Variant};
use crate::numerical::steppers::{StepResult, Stepper, StepperKernel};
use crate::numerical::trajectory::{Trajectory, TrajectoryRecorder};
use crate::numerical::vector_field::VectorField;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};
use strum::IntoEnumIterator;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use thiserror::Error;

// steps this close to t_end count as landing on it
const GRID_EPS: f64 = 1e-9;
/// upper bound on the number of steps of a fixed-step run
pub const MAX_FIXED_STEPS: usize = 1_000_000_000;
// recorder preallocation cap
const PREALLOCATED_SAMPLES: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodId {
    Euler,
    RK2,
    RK4,
    RKF45,
    AdamsBashforth(usize),
    AdamsMoulton(usize),
    BDF(usize),
    Verlet,
    Symplectic,
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodId::Euler => write!(f, "Euler"),
            MethodId::RK2 => write!(f, "RK2"),
            MethodId::RK4 => write!(f, "RK4"),
            MethodId::RKF45 => write!(f, "RKF45"),
            MethodId::AdamsBashforth(order) => write!(f, "AB{}", order),
            MethodId::AdamsMoulton(order) => write!(f, "AM{}", order),
            MethodId::BDF(order) => write!(f, "BDF{}", order),
            MethodId::Verlet => write!(f, "Verlet"),
            MethodId::Symplectic => write!(f, "Symplectic"),
        }
    }
}

/// "AB", "AM" and "BDF" without an order select AB4, AM4 and BDF2
impl FromStr for MethodId {
    type Err = OdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_uppercase().replace(['-', '_', ' '], "");
        let order_of = |digits: &str, default: usize| -> Result<usize, OdeError> {
            if digits.is_empty() {
                return Ok(default);
            }
            digits
                .parse::<usize>()
                .map_err(|_| OdeError::UnknownMethod(s.to_string()))
        };
        let method = match name.as_str() {
            "EULER" => MethodId::Euler,
            "RK2" => MethodId::RK2,
            "RK4" => MethodId::RK4,
            "RKF45" => MethodId::RKF45,
            "VERLET" => MethodId::Verlet,
            "SYMPLECTIC" | "STORMERVERLET" => MethodId::Symplectic,
            _ if name.starts_with("BDF") => MethodId::BDF(order_of(&name[3..], 2)?),
            _ if name.starts_with("AB") => MethodId::AdamsBashforth(order_of(&name[2..], 4)?),
            _ if name.starts_with("AM") => MethodId::AdamsMoulton(order_of(&name[2..], 4)?),
            _ => return Err(OdeError::UnknownMethod(s.to_string())),
        };
        Ok(method)
    }
}

/// one row of the method comparison table
#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct MethodInfo {
    #[tabled(rename = "Method")]
    pub name: &'static str,
    #[tabled(rename = "Order")]
    pub order: &'static str,
    #[tabled(rename = "Stability")]
    pub stability: &'static str,
    #[tabled(rename = "Applications")]
    pub applications: &'static str,
}

impl MethodId {
    pub fn is_adaptive(&self) -> bool {
        matches!(self, MethodId::RKF45)
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self, MethodId::AdamsMoulton(_) | MethodId::BDF(_))
    }

    pub fn catalogue() -> Vec<MethodInfo> {
        let row = |name, order, stability, applications| MethodInfo {
            name,
            order,
            stability,
            applications,
        };
        vec![
            row("Euler", "1", "Conditional", "Education, simple simulations"),
            row("RK2", "2", "Conditional", "Real-time systems, game physics"),
            row("RK4", "4", "Conditional", "Engineering, aerospace, robotics"),
            row("RKF45", "4-5", "Adaptive", "Aerospace, scientific computing"),
            row("Adams-Bashforth", "2-6", "Conditional", "Climate modeling, fluid dynamics"),
            row("Adams-Moulton", "2-6", "Unconditional", "Circuit simulation, control systems"),
            row("BDF", "1-6", "Very stable", "Chemical kinetics, stiff systems"),
            row("Verlet", "2", "Energy-preserving", "Molecular dynamics, astrophysics"),
            row(
                "Stormer-Verlet (Symplectic)",
                "2",
                "Structure-preserving",
                "Quantum mechanics, celestial mechanics",
            ),
        ]
    }

    pub fn catalogue_table() -> String {
        let mut table = Table::new(&MethodId::catalogue());
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

/// Enum for different parameter types
#[derive(Clone, Debug, PartialEq)]
pub enum SolverParam {
    Float(f64),
    Int(usize),
    OptionalFloat(Option<f64>),
    Bool(bool),
    Text(String),
    OptionalText(Option<String>),
}

/// Run configuration. Every field has a default, so a TOML file only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// error tolerance of RKF45
    pub tolerance: f64,
    /// iteration limit of implicit solves
    pub max_iter: usize,
    /// convergence threshold of implicit solves
    pub tol: f64,
    pub growth_cap: f64,
    pub safety: f64,
    pub shrink_floor: f64,
    pub h_min: f64,
    pub h_max: Option<f64>,
    pub max_rejections: usize,
    pub iteration: IterationScheme,
    pub bootstrap: BootstrapMethod,
    pub rk2_variant: Rk2Variant,
    pub loglevel: Option<String>,
    pub log_to_file: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            tolerance: 1e-6,
            max_iter: 50,
            tol: 1e-8,
            growth_cap: 2.0,
            safety: 0.9,
            shrink_floor: 0.1,
            h_min: 1e-12,
            h_max: None,
            max_rejections: 10,
            iteration: IterationScheme::FixedPoint,
            bootstrap: BootstrapMethod::RK4,
            rk2_variant: Rk2Variant::Midpoint,
            loglevel: None,
            log_to_file: false,
        }
    }
}

fn parse_variant<T: IntoEnumIterator + fmt::Display>(key: &str, text: &str) -> Result<T, OdeError> {
    T::iter()
        .find(|v| v.to_string().eq_ignore_ascii_case(text))
        .ok_or_else(|| OdeError::InvalidOptions(format!("unknown value {} for {}", text, key)))
}

impl SolverOptions {
    pub fn from_toml_str(content: &str) -> Result<SolverOptions, OdeError> {
        let options: SolverOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<SolverOptions, OdeError> {
        let content = std::fs::read_to_string(path)?;
        SolverOptions::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), OdeError> {
        let invalid = |msg: String| Err(OdeError::InvalidOptions(msg));
        if !(self.tolerance > 0.0) {
            return invalid(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if !(self.tol > 0.0) {
            return invalid(format!("tol must be positive, got {}", self.tol));
        }
        if self.max_iter == 0 {
            return invalid("max_iter must be at least 1".to_string());
        }
        if !(self.safety > 0.0 && self.safety <= 1.0) {
            return invalid(format!("safety must be in (0, 1], got {}", self.safety));
        }
        if !(self.growth_cap >= 1.0) {
            return invalid(format!("growth_cap must be >= 1, got {}", self.growth_cap));
        }
        if !(self.shrink_floor > 0.0 && self.shrink_floor < 1.0) {
            return invalid(format!("shrink_floor must be in (0, 1), got {}", self.shrink_floor));
        }
        if !(self.h_min > 0.0) {
            return invalid(format!("h_min must be positive, got {}", self.h_min));
        }
        if let Some(h_max) = self.h_max {
            if !(h_max > self.h_min) {
                return invalid(format!("h_max {} must exceed h_min {}", h_max, self.h_min));
            }
        }
        parse_loglevel(&self.loglevel)?;
        Ok(())
    }

    pub fn controller(&self) -> AdaptiveController {
        let mut controller = AdaptiveController::new(self.tolerance);
        controller.set_factors(self.safety, self.growth_cap, self.shrink_floor);
        controller.set_limits(self.h_min, self.h_max, self.max_rejections);
        controller
    }

    /// Set a parameter by name
    pub fn set_parameter(&mut self, key: &str, value: SolverParam) -> Result<(), OdeError> {
        let mismatch = |value: &SolverParam| {
            Err(OdeError::InvalidOptions(format!(
                "parameter {} cannot take {:?}",
                key, value
            )))
        };
        match (key, value) {
            ("tolerance", SolverParam::Float(v)) => self.tolerance = v,
            ("tol", SolverParam::Float(v)) => self.tol = v,
            ("growth_cap", SolverParam::Float(v)) => self.growth_cap = v,
            ("safety", SolverParam::Float(v)) => self.safety = v,
            ("shrink_floor", SolverParam::Float(v)) => self.shrink_floor = v,
            ("h_min", SolverParam::Float(v)) => self.h_min = v,
            ("h_max", SolverParam::Float(v)) => self.h_max = Some(v),
            ("h_max", SolverParam::OptionalFloat(v)) => self.h_max = v,
            ("max_iter", SolverParam::Int(v)) => self.max_iter = v,
            ("max_rejections", SolverParam::Int(v)) => self.max_rejections = v,
            ("iteration", SolverParam::Text(v)) => self.iteration = parse_variant(key, &v)?,
            ("bootstrap", SolverParam::Text(v)) => self.bootstrap = parse_variant(key, &v)?,
            ("rk2_variant", SolverParam::Text(v)) => self.rk2_variant = parse_variant(key, &v)?,
            ("loglevel", SolverParam::Text(v)) => self.loglevel = Some(v),
            ("loglevel", SolverParam::OptionalText(v)) => self.loglevel = v,
            ("log_to_file", SolverParam::Bool(v)) => self.log_to_file = v,
            (
                "tolerance" | "tol" | "growth_cap" | "safety" | "shrink_floor" | "h_min" | "h_max"
                | "max_iter" | "max_rejections" | "iteration" | "bootstrap" | "rk2_variant"
                | "loglevel" | "log_to_file",
                other,
            ) => return mismatch(&other),
            (unknown, _) => {
                return Err(OdeError::InvalidOptions(format!("unknown parameter {}", unknown)));
            }
        }
        Ok(())
    }

    pub fn set_parameters(&mut self, params: HashMap<String, SolverParam>) -> Result<(), OdeError> {
        for (key, value) in params {
            self.set_parameter(&key, value)?;
        }
        Ok(())
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// implicit solve settings
    pub fn set_iteration(&mut self, scheme: IterationScheme, tol: f64, max_iter: usize) {
        self.iteration = scheme;
        self.tol = tol;
        self.max_iter = max_iter;
    }

    pub fn set_step_limits(&mut self, h_min: f64, h_max: Option<f64>, max_rejections: usize) {
        self.h_min = h_min;
        self.h_max = h_max;
        self.max_rejections = max_rejections;
    }

    pub fn set_bootstrap(&mut self, bootstrap: BootstrapMethod) {
        self.bootstrap = bootstrap;
    }

    pub fn set_rk2_variant(&mut self, variant: Rk2Variant) {
        self.rk2_variant = variant;
    }

    pub fn set_loglevel(&mut self, loglevel: Option<String>) {
        self.loglevel = loglevel;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunStatistics {
    pub field_evaluations: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub implicit_iterations: usize,
    pub max_error_estimate: Option<f64>,
    pub elapsed: Duration,
}

#[derive(Tabled)]
struct StatisticsRow {
    #[tabled(rename = "Statistic")]
    key: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl RunStatistics {
    pub fn table(&self) -> String {
        let rows = vec![
            StatisticsRow {
                key: "field evaluations",
                value: self.field_evaluations.to_string(),
            },
            StatisticsRow {
                key: "accepted steps",
                value: self.accepted_steps.to_string(),
            },
            StatisticsRow {
                key: "rejected steps",
                value: self.rejected_steps.to_string(),
            },
            StatisticsRow {
                key: "implicit iterations",
                value: self.implicit_iterations.to_string(),
            },
            StatisticsRow {
                key: "max error estimate",
                value: self
                    .max_error_estimate
                    .map_or("-".to_string(), |e| format!("{:e}", e)),
            },
            StatisticsRow {
                key: "elapsed, ms",
                value: self.elapsed.as_millis().to_string(),
            },
        ];
        let mut table = Table::new(&rows);
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub method: MethodId,
    pub trajectory: Trajectory,
    pub statistics: RunStatistics,
}

/// A run stopped by `reason`. `trajectory` holds every sample accepted before the
/// failure and `t` the time of the last of them (`None` when nothing was recorded).
#[derive(Debug, Error)]
#[error("{method} stopped: {reason}")]
pub struct RunFailure {
    pub method: MethodId,
    #[source]
    pub reason: OdeError,
    pub trajectory: Trajectory,
    pub t: Option<f64>,
    pub statistics: RunStatistics,
}

struct RunState {
    method: MethodId,
    recorder: TrajectoryRecorder,
    statistics: RunStatistics,
    evaluations_at_start: usize,
    start: Instant,
}

impl RunState {
    fn finish_statistics(&mut self, field: &VectorField, stepper: Option<&StepperKernel>) {
        self.statistics.field_evaluations = field.evaluations() - self.evaluations_at_start;
        self.statistics.implicit_iterations = stepper.map_or(0, |s| s.implicit_iterations());
        self.statistics.elapsed = self.start.elapsed();
    }

    fn fail(mut self, reason: OdeError, field: &VectorField, stepper: Option<&StepperKernel>) -> RunFailure {
        self.finish_statistics(field, stepper);
        let trajectory = self.recorder.finish();
        let t = trajectory.last().map(|s| s.t);
        warn!(
            "{} stopped after {} samples: {}",
            self.method,
            trajectory.len(),
            reason
        );
        RunFailure {
            method: self.method,
            reason,
            trajectory,
            t,
            statistics: self.statistics,
        }
    }
}

fn check_grid(t0: f64, t_end: f64, h: f64) -> Result<(), OdeError> {
    let finite = t0.is_finite() && t_end.is_finite() && h.is_finite();
    // h must also move t at both ends of the interval
    if !finite || h <= 0.0 || t_end <= t0 || t0 + h <= t0 || t_end - h >= t_end {
        return Err(OdeError::InvalidTimeGrid { t0, t_end, h });
    }
    Ok(())
}

/// Number of fixed steps covering [t0, t_end]; grids longer than
/// [`MAX_FIXED_STEPS`] are rejected.
pub fn fixed_step_count(t0: f64, t_end: f64, h: f64) -> Result<usize, OdeError> {
    let n = ((t_end - t0) / h - GRID_EPS).ceil().max(1.0);
    if !n.is_finite() || n > MAX_FIXED_STEPS as f64 {
        return Err(OdeError::InvalidTimeGrid { t0, t_end, h });
    }
    Ok(n as usize)
}

/// Integrates `field` from `(t0, initial_state)` to `t_end` with `method`.
pub fn run(
    method: MethodId,
    field: &VectorField,
    initial_state: DVector<f64>,
    t0: f64,
    t_end: f64,
    h: f64,
    options: &SolverOptions,
) -> Result<Solution, RunFailure> {
    let mut state = RunState {
        method,
        recorder: TrajectoryRecorder::new(),
        statistics: RunStatistics::default(),
        evaluations_at_start: field.evaluations(),
        start: Instant::now(),
    };
    let setup = || -> Result<(StepperKernel, DVector<f64>, usize), OdeError> {
        options.validate()?;
        init_logger(&options.loglevel, options.log_to_file)?;
        check_grid(t0, t_end, h)?;
        if initial_state.is_empty() {
            return Err(OdeError::EmptyState);
        }
        let n_steps = if method.is_adaptive() {
            0
        } else {
            fixed_step_count(t0, t_end, h)?
        };
        let stepper = StepperKernel::new(method, options)?;
        stepper.validate(initial_state.len())?;
        let f0 = field.eval(t0, &initial_state)?;
        if initial_state.iter().any(|v| !v.is_finite()) {
            return Err(OdeError::Diverged { t: t0 });
        }
        Ok((stepper, f0, n_steps))
    };
    let (mut stepper, f0, n_steps) = match setup() {
        Ok(ready) => ready,
        Err(reason) => return Err(state.fail(reason, field, None)),
    };
    info!(
        "{} on [{}, {}] with h = {}, dimension {}",
        stepper.name(),
        t0,
        t_end,
        h,
        initial_state.len()
    );

    if !method.is_adaptive() {
        state.recorder =
            TrajectoryRecorder::with_capacity(n_steps.saturating_add(1).min(PREALLOCATED_SAMPLES));
    }
    let mut history = History::new(stepper.lookback());
    history.push(t0, initial_state.clone(), f0);
    state.recorder.record(t0, initial_state);

    let outcome = if method.is_adaptive() {
        adaptive_loop(&mut stepper, field, &mut history, &mut state, t0, t_end, h)
    } else {
        fixed_loop(&mut stepper, field, &mut history, &mut state, n_steps, h)
    };
    if let Err(reason) = outcome {
        return Err(state.fail(reason, field, Some(&stepper)));
    }

    state.finish_statistics(field, Some(&stepper));
    info!("\n{}", state.statistics.table());
    Ok(Solution {
        method,
        trajectory: state.recorder.finish(),
        statistics: state.statistics,
    })
}

fn fixed_loop(
    stepper: &mut StepperKernel,
    field: &VectorField,
    history: &mut History,
    state: &mut RunState,
    n_steps: usize,
    h: f64,
) -> Result<(), OdeError> {
    for _ in 0..n_steps {
        let t = history.latest().ok_or(OdeError::EmptyHistory)?.t;
        if t + h <= t {
            return Err(OdeError::StepSizeUnderflow { h, rejections: 0 });
        }
        match stepper.advance(field, history, h) {
            StepResult::Accepted { t, state: y, .. } => {
                state.recorder.record(t, y);
                state.statistics.accepted_steps += 1;
            }
            StepResult::Rejected { reason, .. } => {
                warn!("fixed step rejected: {:?}", reason);
                state.statistics.rejected_steps += 1;
            }
            StepResult::Failed { reason } => return Err(reason),
        }
    }
    Ok(())
}

fn adaptive_loop(
    stepper: &mut StepperKernel,
    field: &VectorField,
    history: &mut History,
    state: &mut RunState,
    t0: f64,
    t_end: f64,
    h: f64,
) -> Result<(), OdeError> {
    let eps = GRID_EPS * (t_end - t0);
    let mut t = t0;
    let mut h_try = h;
    let mut rejections = 0;
    while t_end - t > eps {
        let h_step = h_try.min(t_end - t);
        if t + h_step <= t {
            return Err(OdeError::StepSizeUnderflow {
                h: h_step,
                rejections,
            });
        }
        match stepper.advance(field, history, h_step) {
            StepResult::Accepted {
                t: t_new,
                state: y,
                error_estimate,
                h_next,
            } => {
                state.recorder.record(t_new, y);
                state.statistics.accepted_steps += 1;
                if let Some(error) = error_estimate {
                    let worst = state.statistics.max_error_estimate.get_or_insert(error);
                    *worst = worst.max(error);
                }
                t = t_new;
                h_try = h_next;
                rejections = 0;
            }
            StepResult::Rejected { h_next, .. } => {
                state.statistics.rejected_steps += 1;
                rejections += 1;
                h_try = h_next;
            }
            StepResult::Failed { reason } => return Err(reason),
        }
    }
    Ok(())
}

/// Owns the problem and keeps the result of the last `solve`.
pub struct ODEsolver {
    field: VectorField,
    method: MethodId,
    t0: f64,
    y0: DVector<f64>,
    t_end: f64,
    h: f64,
    options: SolverOptions,
    trajectory: Trajectory,
    statistics: Option<RunStatistics>,
}

impl ODEsolver {
    pub fn new(
        field: VectorField,
        method: MethodId,
        t0: f64,
        y0: DVector<f64>,
        t_end: f64,
        h: f64,
    ) -> ODEsolver {
        ODEsolver {
            field,
            method,
            t0,
            y0,
            t_end,
            h,
            options: SolverOptions::default(),
            trajectory: Trajectory::default(),
            statistics: None,
        }
    }

    pub fn set_options(&mut self, options: SolverOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn set_parameter(&mut self, key: &str, value: SolverParam) -> Result<(), OdeError> {
        self.options.set_parameter(key, value)
    }

    /// On failure the partial trajectory is kept and the reason returned.
    pub fn solve(&mut self) -> Result<(), OdeError> {
        let result = run(
            self.method,
            &self.field,
            self.y0.clone(),
            self.t0,
            self.t_end,
            self.h,
            &self.options,
        );
        match result {
            Ok(solution) => {
                self.trajectory = solution.trajectory;
                self.statistics = Some(solution.statistics);
                Ok(())
            }
            Err(failure) => {
                self.trajectory = failure.trajectory;
                self.statistics = Some(failure.statistics);
                Err(failure.reason)
            }
        }
    }

    pub fn get_result(&self) -> (DVector<f64>, DMatrix<f64>) {
        self.trajectory.to_matrices()
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn statistics(&self) -> Option<&RunStatistics> {
        self.statistics.as_ref()
    }

    pub fn save_result<P: AsRef<Path>>(&self, path: P) -> Result<(), OdeError> {
        self.trajectory.save_to_csv(path)
    }

    pub fn plot_result<P: AsRef<Path>>(&self, dir: P) -> Result<(), OdeError> {
        self.trajectory.plot(dir, &self.method.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn decay() -> VectorField {
        VectorField::new(|_t, y: &DVector<f64>| -y.clone())
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in [
            MethodId::Euler,
            MethodId::RK2,
            MethodId::RK4,
            MethodId::RKF45,
            MethodId::AdamsBashforth(5),
            MethodId::AdamsMoulton(3),
            MethodId::BDF(6),
            MethodId::Verlet,
            MethodId::Symplectic,
        ] {
            assert_eq!(method.to_string().parse::<MethodId>().unwrap(), method);
        }
    }

    #[test]
    fn test_method_parsing_defaults() {
        assert_eq!("bdf".parse::<MethodId>().unwrap(), MethodId::BDF(2));
        assert_eq!("AB".parse::<MethodId>().unwrap(), MethodId::AdamsBashforth(4));
        assert_eq!("am".parse::<MethodId>().unwrap(), MethodId::AdamsMoulton(4));
        assert_eq!("Stormer-Verlet".parse::<MethodId>().unwrap(), MethodId::Symplectic);
        assert!("BDF3".parse::<MethodId>().unwrap().is_implicit());
        assert!(!"AB3".parse::<MethodId>().unwrap().is_implicit());
        assert!("rkf45".parse::<MethodId>().unwrap().is_adaptive());
        assert!(matches!(
            "RK7x".parse::<MethodId>(),
            Err(OdeError::UnknownMethod(_))
        ));
        assert!(matches!(
            "ABx".parse::<MethodId>(),
            Err(OdeError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_catalogue_table() {
        assert_eq!(MethodId::catalogue().len(), 9);
        let table = MethodId::catalogue_table();
        assert!(table.contains("Chemical kinetics"));
        assert!(table.contains("Method"));
    }

    #[test]
    fn test_options_from_toml() {
        let options = SolverOptions::from_toml_str(
            r#"
            tolerance = 1e-8
            iteration = "Newton"
            bootstrap = "Euler"
            h_max = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(options.tolerance, 1e-8);
        assert_eq!(options.iteration, IterationScheme::Newton);
        assert_eq!(options.bootstrap, BootstrapMethod::Euler);
        assert_eq!(options.h_max, Some(0.5));
        assert_eq!(options.max_iter, 50);
        assert!(matches!(
            SolverOptions::from_toml_str("tolerance = \"small\""),
            Err(OdeError::Config(_))
        ));
        assert!(matches!(
            SolverOptions::from_toml_str("safety = 2.0"),
            Err(OdeError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_options_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.toml");
        std::fs::write(&path, "max_rejections = 3\nrk2_variant = \"Heun\"\n").unwrap();
        let options = SolverOptions::from_toml_file(&path).unwrap();
        assert_eq!(options.max_rejections, 3);
        assert_eq!(options.rk2_variant, Rk2Variant::Heun);
    }

    #[test]
    fn test_set_parameter() {
        let mut options = SolverOptions::default();
        options.set_parameter("tol", SolverParam::Float(1e-12)).unwrap();
        options
            .set_parameter("iteration", SolverParam::Text("newton".to_string()))
            .unwrap();
        options.set_parameter("h_max", SolverParam::OptionalFloat(None)).unwrap();
        assert_eq!(options.tol, 1e-12);
        assert_eq!(options.iteration, IterationScheme::Newton);
        assert!(matches!(
            options.set_parameter("max_iter", SolverParam::Float(3.0)),
            Err(OdeError::InvalidOptions(_))
        ));
        assert!(matches!(
            options.set_parameter("stepsize", SolverParam::Float(3.0)),
            Err(OdeError::InvalidOptions(_))
        ));
        let mut params = HashMap::new();
        params.insert("max_rejections".to_string(), SolverParam::Int(4));
        params.insert("bootstrap".to_string(), SolverParam::Text("RK2".to_string()));
        options.set_parameters(params).unwrap();
        assert_eq!(options.max_rejections, 4);
        assert_eq!(options.bootstrap, BootstrapMethod::RK2);
    }

    #[test]
    fn test_fixed_step_count() {
        assert_eq!(fixed_step_count(0.0, 1.0, 0.1).unwrap(), 10);
        assert_eq!(fixed_step_count(0.0, 1.0, 0.3).unwrap(), 4);
        assert_eq!(fixed_step_count(0.0, 10.0, 0.1).unwrap(), 100);
        assert!(matches!(
            fixed_step_count(0.0, 1e20, 1.0),
            Err(OdeError::InvalidTimeGrid { .. })
        ));
    }

    #[test]
    fn test_fixed_grid_overshoots_end() {
        let solution = run(
            MethodId::Euler,
            &decay(),
            DVector::from_element(1, 1.0),
            0.0,
            1.0,
            0.3,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(solution.trajectory.len(), 5);
        assert_relative_eq!(solution.trajectory.last().unwrap().t, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_grid() {
        let options = SolverOptions::default();
        let y0 = DVector::from_element(1, 1.0);
        for (t0, t_end, h) in [
            (0.0, 1.0, 0.0),
            (1.0, 0.0, 0.1),
            (0.0, f64::NAN, 0.1),
            // h below the float spacing at t0
            (1e6, 1e6 + 1e-9, 1e-12),
            // more than MAX_FIXED_STEPS steps
            (0.0, 1e12, 1e-3),
        ] {
            let failure = run(MethodId::RK4, &decay(), y0.clone(), t0, t_end, h, &options).unwrap_err();
            assert!(matches!(failure.reason, OdeError::InvalidTimeGrid { .. }));
            assert!(failure.trajectory.is_empty());
            assert!(failure.t.is_none());
        }
    }

    #[test]
    fn test_adaptive_step_below_time_resolution() {
        // the float spacing at t = 1e6 is about 1.2e-10, the rapidly oscillating
        // field keeps every trial step rejected until h stops moving t
        let field = VectorField::new(|t, _y: &DVector<f64>| {
            DVector::from_element(1, 1e6 * (1e9 * (t - 1e6)).cos())
        });
        let mut options = SolverOptions::default();
        options.set_tolerance(1e-300);
        options.set_step_limits(1e-30, None, 50);
        let failure = run(
            MethodId::RKF45,
            &field,
            DVector::from_element(1, 1.0),
            1e6,
            1e6 + 1.0,
            1e-3,
            &options,
        )
        .unwrap_err();
        match failure.reason {
            OdeError::StepSizeUnderflow { h, rejections } => {
                assert!(1e6 + h == 1e6);
                assert!(rejections > 0);
            }
            ref other => panic!("expected StepSizeUnderflow, got {}", other),
        }
        assert_eq!(failure.trajectory.len(), 1);
        assert_eq!(failure.t, Some(1e6));
    }

    #[test]
    fn test_empty_state() {
        let failure = run(
            MethodId::RK4,
            &decay(),
            DVector::zeros(0),
            0.0,
            1.0,
            0.1,
            &SolverOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(failure.reason, OdeError::EmptyState));
    }

    #[test]
    fn test_statistics() {
        let field = decay();
        let solution = run(
            MethodId::RK4,
            &field,
            DVector::from_element(1, 1.0),
            0.0,
            1.0,
            0.1,
            &SolverOptions::default(),
        )
        .unwrap();
        let stats = &solution.statistics;
        assert_eq!(stats.accepted_steps, 10);
        assert_eq!(stats.rejected_steps, 0);
        assert_eq!(stats.field_evaluations, 1 + 10 * 4);
        assert!(stats.max_error_estimate.is_none());
        assert!(stats.table().contains("accepted steps"));
    }

    #[test]
    fn test_rkf45_lands_on_t_end() {
        let solution = run(
            MethodId::RKF45,
            &decay(),
            DVector::from_element(1, 1.0),
            0.0,
            2.0,
            0.3,
            &SolverOptions::default(),
        )
        .unwrap();
        let last = solution.trajectory.last().unwrap();
        assert_relative_eq!(last.t, 2.0, epsilon = 1e-12);
        assert_relative_eq!(last.y[0], (-2.0f64).exp(), epsilon = 1e-5);
        assert!(solution.statistics.max_error_estimate.unwrap() <= 1e-6);
    }

    #[test]
    fn test_solver_facade() {
        let field = VectorField::new(|_t, y: &DVector<f64>| DVector::from_vec(vec![y[1], -y[0]]));
        let mut solver = ODEsolver::new(
            field,
            MethodId::AdamsBashforth(4),
            0.0,
            DVector::from_vec(vec![1.0, 0.0]),
            1.0,
            0.01,
        );
        solver
            .set_parameter("bootstrap", SolverParam::Text("RK4".to_string()))
            .unwrap();
        solver.solve().unwrap();
        let (t, y) = solver.get_result();
        assert_eq!(t.len(), 101);
        assert_relative_eq!(y[(100, 0)], 1.0f64.cos(), epsilon = 1e-6);
        assert_eq!(solver.statistics().unwrap().accepted_steps, 100);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ab4.csv");
        solver.save_result(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Time,x_0,x_1"));
    }
}
