use RustedODE::numerical::ODE_api::{IterationScheme, MethodId, ODEsolver, SolverOptions, SolverParam, run};
use RustedODE::numerical::vector_field::VectorField;
use nalgebra::DVector;
use std::env;

fn main() {
    println!("=== IVP method examples ===\n");
    println!("{}", MethodId::catalogue_table());

    // method name from the command line, RK4 by default
    let method: MethodId = match env::args().nth(1).unwrap_or("RK4".to_string()).parse() {
        Ok(method) => method,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    println!("\n1. Harmonic oscillator x'' = -x with {}", method);
    harmonic_oscillator(method);

    println!("\n2. Stiff decay y' = -50 y: BDF2 with Newton iteration against Euler");
    stiff_decay();

    println!("\n3. Van der Pol oscillator with adaptive RKF45");
    van_der_pol();
}

fn harmonic_oscillator(method: MethodId) {
    let field = VectorField::new(|_t, y: &DVector<f64>| DVector::from_vec(vec![y[1], -y[0]]));
    let mut solver = ODEsolver::new(field, method, 0.0, DVector::from_vec(vec![1.0, 0.0]), 10.0, 0.1);
    if let Err(e) = solver.set_parameter("loglevel", SolverParam::Text("info".to_string())) {
        eprintln!("{}", e);
    }
    if let Err(e) = solver.solve() {
        println!("run stopped: {}", e);
    }
    let (t_result, y_result) = solver.get_result();
    let last = t_result.len() - 1;
    println!(
        "x({:.2}) = {:.6}, exact {:.6}",
        t_result[last],
        y_result[(last, 0)],
        t_result[last].cos()
    );
    let energy = |i: usize| 0.5 * (y_result[(i, 0)].powi(2) + y_result[(i, 1)].powi(2));
    println!("energy drift {:e}", energy(last) - energy(0));
    let file_name = format!("harmonic_oscillator_{}.csv", method);
    match solver.save_result(&file_name) {
        Ok(()) => println!("result saved to {}", file_name),
        Err(e) => eprintln!("{}", e),
    }
    if let Err(e) = solver.plot_result(".") {
        eprintln!("{}", e);
    }
}

fn stiff_decay() {
    let field = VectorField::new(|_t, y: &DVector<f64>| -50.0 * y.clone());
    let y0 = DVector::from_element(1, 1.0);
    let mut options = SolverOptions::default();
    options.set_iteration(IterationScheme::Newton, 1e-10, 20);
    for method in [MethodId::BDF(2), MethodId::Euler] {
        match run(method, &field, y0.clone(), 0.0, 2.0, 0.1, &options) {
            Ok(solution) => {
                let last = solution.trajectory.last().map_or(f64::NAN, |s| s.y[0]);
                println!("{}: y(2) = {:e}", method, last);
            }
            Err(failure) => println!("{}", failure),
        }
    }
}

fn van_der_pol() {
    let mu = 1.0;
    let field = VectorField::new(move |_t, y: &DVector<f64>| {
        DVector::from_vec(vec![y[1], mu * (1.0 - y[0] * y[0]) * y[1] - y[0]])
    });
    let mut options = SolverOptions::default();
    options.set_tolerance(1e-8);
    match run(MethodId::RKF45, &field, DVector::from_vec(vec![2.0, 0.0]), 0.0, 20.0, 0.1, &options) {
        Ok(solution) => {
            println!("{}", solution.statistics.table());
            if let Some(last) = solution.trajectory.last() {
                println!("state at t = {:.3}: {:?}", last.t, last.y.as_slice());
            }
        }
        Err(failure) => println!("{}", failure),
    }
}
