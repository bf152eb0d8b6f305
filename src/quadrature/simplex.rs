//! Quadrature rules for the reference simplices, constructed by collapsing
//! tensor-product Gauss rules (Duffy-type transformation).
//!
//! The reference triangle has corners (-1, -1), (1, -1), (-1, 1); the reference
//! tetrahedron has corners (-1, -1, -1), (1, -1, -1), (-1, 1, -1), (-1, -1, 1).
//! The collapsed construction yields rules that are exact for all polynomials up
//! to the requested total degree: the collapse map is bilinear, so a degree-`p`
//! polynomial on the simplex pulls back to a polynomial of degree at most `p`
//! plus the degree of the collapse Jacobian in each tensor direction, which the
//! underlying Gauss rules integrate exactly.

use crate::quadrature::univariate::gauss_f64;
use crate::quadrature::QuadraturePair;
use crate::Real;
use nalgebra::{convert, Point2, Point3, U2, U3};

/// A quadrature rule for the reference triangle, exact for polynomials of total
/// degree up to `degree`.
pub fn triangle<T: Real>(degree: usize) -> QuadraturePair<T, U2> {
    // The collapse map is xi = (1 + u)(1 - v)/2 - 1, eta = v with area element
    // (1 - v)/2, so exactness requires degree `degree` in u and `degree + 1` in v.
    let n = (degree + 2).div_ceil(2);
    let (weights1d, points1d) = gauss_f64(n);

    let mut weights = Vec::with_capacity(n * n);
    let mut points = Vec::with_capacity(n * n);
    for (&wu, &u) in weights1d.iter().zip(&points1d) {
        for (&wv, &v) in weights1d.iter().zip(&points1d) {
            let xi = (1.0 + u) * (1.0 - v) / 2.0 - 1.0;
            let eta = v;
            let w = wu * wv * (1.0 - v) / 2.0;
            weights.push(convert(w));
            points.push(Point2::new(convert(xi), convert(eta)));
        }
    }
    (weights, points)
}

/// A quadrature rule for the reference tetrahedron, exact for polynomials of
/// total degree up to `degree`.
pub fn tetrahedron<T: Real>(degree: usize) -> QuadraturePair<T, U3> {
    // Collapse map:
    //   xi   = (1 + u)(1 - v)(1 - w)/4 - 1
    //   eta  = (1 + v)(1 - w)/2 - 1
    //   zeta = w
    // with volume element (1 - v)(1 - w)^2 / 8, so exactness requires degree
    // `degree` in u, `degree + 1` in v and `degree + 2` in w.
    let n = (degree + 3).div_ceil(2);
    let (weights1d, points1d) = gauss_f64(n);

    let mut weights = Vec::with_capacity(n * n * n);
    let mut points = Vec::with_capacity(n * n * n);
    for (&wu, &u) in weights1d.iter().zip(&points1d) {
        for (&wv, &v) in weights1d.iter().zip(&points1d) {
            for (&ww, &w) in weights1d.iter().zip(&points1d) {
                let xi = (1.0 + u) * (1.0 - v) * (1.0 - w) / 4.0 - 1.0;
                let eta = (1.0 + v) * (1.0 - w) / 2.0 - 1.0;
                let zeta = w;
                let weight = wu * wv * ww * (1.0 - v) * (1.0 - w) * (1.0 - w) / 8.0;
                weights.push(convert(weight));
                points.push(Point3::new(convert(xi), convert(eta), convert(zeta)));
            }
        }
    }
    (weights, points)
}
