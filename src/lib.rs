// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_snake_case)]
//! Engine for initial value problems of ODE systems of any order, written as
//! first-order vector systems `y' = f(t, y)`.
//!
//! ```rust, ignore
//! use RustedODE::numerical::ODE_api::{run, MethodId, SolverOptions};
//! use RustedODE::numerical::vector_field::VectorField;
//! use nalgebra::DVector;
//! // y'' = -y  ->  y0' = y1, y1' = -y0
//! let field = VectorField::new(|_t, y: &DVector<f64>| DVector::from_vec(vec![y[1], -y[0]]));
//! let y0 = DVector::from_vec(vec![1.0, 0.0]);
//! let solution = run(MethodId::RK4, &field, y0, 0.0, 10.0, 0.1, &SolverOptions::default()).unwrap();
//! let (t, y) = solution.trajectory.to_matrices();
//! ```
pub mod Utils;
pub mod numerical;
