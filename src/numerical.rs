//! numerical integration engine for initial value problems
/// error taxonomy of the engine
pub mod ode_error;
/// checked wrapper around the right-hand side f(t, y)
pub mod vector_field;
/// bounded lookback of accepted (t, y, f) triples
pub mod history;
/// append-only record of accepted samples
pub mod trajectory;
/// fixed-point and Newton iterations for implicit update equations
pub mod implicit_solver;
/// step size control of embedded Runge-Kutta pairs
pub mod adaptive_controller;
/// family of step-advance algorithms sharing the `Stepper` contract
/// Example
/// ```rust, ignore
/// let mut stepper = StepperKernel::new(MethodId::AdamsBashforth(4), &SolverOptions::default())?;
/// let mut history = History::new(stepper.lookback());
/// history.push(t0, y0.clone(), field.eval(t0, &y0)?);
/// let result = stepper.advance(&field, &mut history, 0.1);
/// ```
pub mod steppers;
/// driver: method selection, options, `run` and the `ODEsolver` facade
pub mod ODE_api;
