//! Butcher tableaux of the explicit Runge-Kutta family and the coefficient
//! tables of the linear multistep methods.
//!
//! Adams weights are listed newest first: `β[0]` multiplies `f_n` for
//! Adams-Bashforth and the implicit `f_{n+1}` for Adams-Moulton. BDF weights
//! `a[j]` multiply `y_{n-j}`, the implicit term carries `b`.

/// explicit tableau, `b_err` holds the lower order weights of an embedded pair
#[derive(Debug, Clone, PartialEq)]
pub struct ButcherTableau {
    pub a: Vec<Vec<f64>>,
    pub b: Vec<f64>,
    pub c: Vec<f64>,
    pub b_err: Option<Vec<f64>>,
}

impl ButcherTableau {
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    pub fn euler() -> ButcherTableau {
        ButcherTableau {
            a: vec![vec![]],
            b: vec![1.0],
            c: vec![0.0],
            b_err: None,
        }
    }

    pub fn midpoint() -> ButcherTableau {
        ButcherTableau {
            a: vec![vec![], vec![0.5]],
            b: vec![0.0, 1.0],
            c: vec![0.0, 0.5],
            b_err: None,
        }
    }

    pub fn heun() -> ButcherTableau {
        ButcherTableau {
            a: vec![vec![], vec![1.0]],
            b: vec![0.5, 0.5],
            c: vec![0.0, 1.0],
            b_err: None,
        }
    }

    pub fn rk4() -> ButcherTableau {
        ButcherTableau {
            a: vec![vec![], vec![0.5], vec![0.0, 0.5], vec![0.0, 0.0, 1.0]],
            b: vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
            c: vec![0.0, 0.5, 0.5, 1.0],
            b_err: None,
        }
    }

    /// Fehlberg 4(5): `b` propagates the 5th order solution, `b_err` is the 4th order one
    pub fn fehlberg45() -> ButcherTableau {
        ButcherTableau {
            a: vec![
                vec![],
                vec![1.0 / 4.0],
                vec![3.0 / 32.0, 9.0 / 32.0],
                vec![1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
                vec![439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
                vec![
                    -8.0 / 27.0,
                    2.0,
                    -3544.0 / 2565.0,
                    1859.0 / 4104.0,
                    -11.0 / 40.0,
                ],
            ],
            b: vec![
                16.0 / 135.0,
                0.0,
                6656.0 / 12825.0,
                28561.0 / 56430.0,
                -9.0 / 50.0,
                2.0 / 55.0,
            ],
            c: vec![0.0, 1.0 / 4.0, 3.0 / 8.0, 12.0 / 13.0, 1.0, 1.0 / 2.0],
            b_err: Some(vec![
                25.0 / 216.0,
                0.0,
                1408.0 / 2565.0,
                2197.0 / 4104.0,
                -1.0 / 5.0,
                0.0,
            ]),
        }
    }
}

fn scaled(numerators: &[f64], denominator: f64) -> Vec<f64> {
    numerators.iter().map(|n| n / denominator).collect()
}

/// β_j of the k-step Adams-Bashforth formula, `None` outside 2..=6
pub fn adams_bashforth(order: usize) -> Option<Vec<f64>> {
    let beta = match order {
        2 => scaled(&[3.0, -1.0], 2.0),
        3 => scaled(&[23.0, -16.0, 5.0], 12.0),
        4 => scaled(&[55.0, -59.0, 37.0, -9.0], 24.0),
        5 => scaled(&[1901.0, -2774.0, 2616.0, -1274.0, 251.0], 720.0),
        6 => scaled(&[4277.0, -7923.0, 9982.0, -7298.0, 2877.0, -475.0], 1440.0),
        _ => return None,
    };
    Some(beta)
}

/// β_j of the Adams-Moulton formula of order `order`, `None` outside 2..=6
pub fn adams_moulton(order: usize) -> Option<Vec<f64>> {
    let beta = match order {
        2 => scaled(&[1.0, 1.0], 2.0),
        3 => scaled(&[5.0, 8.0, -1.0], 12.0),
        4 => scaled(&[9.0, 19.0, -5.0, 1.0], 24.0),
        5 => scaled(&[251.0, 646.0, -264.0, 106.0, -19.0], 720.0),
        6 => scaled(&[475.0, 1427.0, -798.0, 482.0, -173.0, 27.0], 1440.0),
        _ => return None,
    };
    Some(beta)
}

/// (a_j, b) of the BDF formula of order `order`, `None` outside 1..=6
pub fn bdf(order: usize) -> Option<(Vec<f64>, f64)> {
    let coefficients = match order {
        1 => (vec![1.0], 1.0),
        2 => (scaled(&[4.0, -1.0], 3.0), 2.0 / 3.0),
        3 => (scaled(&[18.0, -9.0, 2.0], 11.0), 6.0 / 11.0),
        4 => (scaled(&[48.0, -36.0, 16.0, -3.0], 25.0), 12.0 / 25.0),
        5 => (
            scaled(&[300.0, -300.0, 200.0, -75.0, 12.0], 137.0),
            60.0 / 137.0,
        ),
        6 => (
            scaled(&[360.0, -450.0, 400.0, -225.0, 72.0, -10.0], 147.0),
            60.0 / 147.0,
        ),
        _ => return None,
    };
    Some(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // consistency: every formula integrates y' = 1 exactly
    #[test]
    fn test_adams_weights_sum_to_one() {
        for order in 2..=6 {
            let ab: f64 = adams_bashforth(order).unwrap().iter().sum();
            let am: f64 = adams_moulton(order).unwrap().iter().sum();
            assert_relative_eq!(ab, 1.0, epsilon = 1e-12);
            assert_relative_eq!(am, 1.0, epsilon = 1e-12);
            assert_eq!(adams_bashforth(order).unwrap().len(), order);
            assert_eq!(adams_moulton(order).unwrap().len(), order);
        }
    }

    #[test]
    fn test_bdf_consistency() {
        for order in 1..=6 {
            let (a, b) = bdf(order).unwrap();
            assert_eq!(a.len(), order);
            let sum_a: f64 = a.iter().sum();
            assert_relative_eq!(sum_a, 1.0, epsilon = 1e-12);
            // exact for y = t
            let first_moment: f64 = a.iter().enumerate().map(|(j, a_j)| a_j * (j as f64 + 1.0)).sum();
            assert_relative_eq!(first_moment, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_orders_out_of_range() {
        assert!(adams_bashforth(1).is_none());
        assert!(adams_bashforth(7).is_none());
        assert!(adams_moulton(1).is_none());
        assert!(bdf(0).is_none());
        assert!(bdf(7).is_none());
    }

    #[test]
    fn test_tableaux_are_consistent() {
        for tableau in [
            ButcherTableau::euler(),
            ButcherTableau::midpoint(),
            ButcherTableau::heun(),
            ButcherTableau::rk4(),
            ButcherTableau::fehlberg45(),
        ] {
            let sum_b: f64 = tableau.b.iter().sum();
            assert_relative_eq!(sum_b, 1.0, epsilon = 1e-12);
            for (i, row) in tableau.a.iter().enumerate() {
                let sum_row: f64 = row.iter().sum();
                assert_relative_eq!(sum_row, tableau.c[i], epsilon = 1e-12);
            }
        }
        let b_err_sum: f64 = ButcherTableau::fehlberg45().b_err.unwrap().iter().sum();
        assert_relative_eq!(b_err_sum, 1.0, epsilon = 1e-12);
    }
}
