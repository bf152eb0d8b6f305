//! 2D and 3D quadrature rules formed by tensor product formulations.
//!
//! For quadrilaterals and hexahedra, quadrature rules can be constructed as
//! tensor products of 1D rules.

use crate::quadrature::univariate::gauss_f64;
use crate::quadrature::QuadraturePair;
use crate::Real;
use nalgebra::{convert, Point2, Point3, U2, U3};

/// A Gauss quadrature rule for the reference quadrilateral `[-1, 1]^2`.
///
/// The rule is constructed as a tensor product from 1D rules, with the provided
/// number of points per dimension.
pub fn quadrilateral_gauss<T: Real>(num_points_per_dim: usize) -> QuadraturePair<T, U2> {
    let n = num_points_per_dim;
    let (weights1d, points1d) = gauss_f64(n);
    let mut weights2d = Vec::with_capacity(n * n);
    let mut points2d = Vec::with_capacity(n * n);

    let rule1d_iter = || weights1d.iter().zip(&points1d);

    for (&wx, &x) in rule1d_iter() {
        for (&wy, &y) in rule1d_iter() {
            weights2d.push(convert(wx * wy));
            points2d.push(Point2::new(convert(x), convert(y)));
        }
    }

    (weights2d, points2d)
}

/// A Gauss quadrature rule for the reference hexahedron `[-1, 1]^3`.
///
/// The rule is constructed as a tensor product from 1D rules, with the provided
/// number of points per dimension.
pub fn hexahedron_gauss<T: Real>(num_points_per_dim: usize) -> QuadraturePair<T, U3> {
    let n = num_points_per_dim;
    let (weights1d, points1d) = gauss_f64(n);
    let mut weights3d = Vec::with_capacity(n * n * n);
    let mut points3d = Vec::with_capacity(n * n * n);

    let rule1d_iter = || weights1d.iter().zip(&points1d);

    for (&wx, &x) in rule1d_iter() {
        for (&wy, &y) in rule1d_iter() {
            for (&wz, &z) in rule1d_iter() {
                weights3d.push(convert(wx * wy * wz));
                points3d.push(Point3::new(convert(x), convert(y), convert(z)));
            }
        }
    }

    (weights3d, points3d)
}
