//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::quadrature::QuadraturePair;
use crate::Real;
use nalgebra::{convert, Point1, U1};
use std::f64::consts::PI;

/// Recurrence relation for Legendre polynomials.
///
/// Note: we use a formula for which derivatives are *not* defined at |x| == 1, so
/// it is only suitable for evaluation in the open interval (-1, 1).
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // The current value, i.e. p_n(x)
    p1: f64,
    // The previous value in the recurrence, i.e. p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    fn evaluate(n: usize, x: f64) -> Self {
        // Use recurrence relation
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        let mut p3;
        for m in 1..=n {
            let m = m as f64;
            p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }

        Self { n, x, p1, p2 }
    }

    fn value_and_derivative(&self) -> (f64, f64) {
        let Self { n, x, p1, p2 } = &self;
        let n = *n as f64;
        // Standard recurrence relation
        // dp_n/dx (x) = n * (x * p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
        (*p1, n * (x * p1 - p2) / (x * x - 1.0))
    }
}

/// Gauss quadrature for the reference interval [-1, 1].
///
/// Returns the Gauss quadrature rule with the given number of points. Given `n`
/// points, the rule integrates polynomials of degree up to `2 n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss<T: Real>(num_points: usize) -> QuadraturePair<T, U1> {
    let (weights, points) = gauss_f64(num_points);
    let weights = weights.into_iter().map(convert).collect();
    let points = points.into_iter().map(|x| Point1::new(convert(x))).collect();
    (weights, points)
}

/// Gauss quadrature roots and weights computed in `f64`.
pub(crate) fn gauss_f64(num_points: usize) -> (Vec<f64>, Vec<f64>) {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    // Loosely based on the procedure used in
    // Numerical Recipes, The art of Scientific Computing, Third Edition (2007)
    let m = (n + 1) / 2;

    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    // Only find the first m roots. The remaining roots follow by symmetry.
    for i in 0..m {
        // A fairly accurate initial guess
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let (mut p, mut dp) = LegendreRecurrence::evaluate(n, x).value_and_derivative();

        // Newton's method
        loop {
            let dx = -p / dp;
            x += dx;
            let (p_new, dp_new) = LegendreRecurrence::evaluate(n, x).value_and_derivative();
            p = p_new;
            dp = dp_new;
            if dx.abs() <= 1e-15 {
                break;
            }
        }

        // Once a root is known, its weight is given explicitly by a standard formula
        let w = 2.0 / ((1.0 - x * x) * dp * dp);

        points.push(x);
        weights.push(w);
    }

    // Recover the remaining points and weights by symmetry
    for i in m..n {
        let mirror_idx = n - i - 1;
        points.push(-points[mirror_idx]);
        weights.push(weights[mirror_idx]);
    }

    assert_eq!(points.len(), n, "Internal error: incorrect number of points produced");

    (weights, points)
}
