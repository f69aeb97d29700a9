use crate::numerical::ode_error::OdeError;
use nalgebra::DVector;
use std::cell::Cell;
use std::fmt;

/// Right-hand side of `y' = f(t, y)`.
///
/// The callable must be deterministic and side-effect free. Every evaluation goes
/// through [`VectorField::eval`], which rejects derivatives whose length differs
/// from the state before any stepper can consume them.
pub struct VectorField {
    f: Box<dyn Fn(f64, &DVector<f64>) -> DVector<f64>>,
    evaluations: Cell<usize>,
}

impl fmt::Debug for VectorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VectorField {{ evaluations: {} }}", self.evaluations.get())
    }
}

impl VectorField {
    pub fn new<F>(f: F) -> VectorField
    where
        F: Fn(f64, &DVector<f64>) -> DVector<f64> + 'static,
    {
        VectorField {
            f: Box::new(f),
            evaluations: Cell::new(0),
        }
    }

    /// wraps a function already boxed the way lambdified systems are
    pub fn from_boxed(f: Box<dyn Fn(f64, &DVector<f64>) -> DVector<f64>>) -> VectorField {
        VectorField {
            f,
            evaluations: Cell::new(0),
        }
    }

    /// f(t, y) with the dimension check
    pub fn eval(&self, t: f64, y: &DVector<f64>) -> Result<DVector<f64>, OdeError> {
        self.evaluations.set(self.evaluations.get() + 1);
        let dydt = (self.f)(t, y);
        if dydt.len() != y.len() {
            return Err(OdeError::DimensionMismatch {
                expected: y.len(),
                got: dydt.len(),
            });
        }
        Ok(dydt)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    pub fn reset_evaluations(&self) {
        self.evaluations.set(0);
    }
}
