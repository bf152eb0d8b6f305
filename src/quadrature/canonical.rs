//! Canonical quadrature dispatch from element types and polynomial degrees.

use crate::element::ElementType;
use crate::quadrature::{simplex, tensor, univariate, QuadraturePair};
use crate::{Real, SmallDim};
use eyre::eyre;
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, U1, U2, U3};

/// The number of Gauss points per dimension needed to integrate the given
/// polynomial degree exactly.
fn gauss_points_for_degree(degree: usize) -> usize {
    degree / 2 + 1
}

/// Dimension-indexed construction of reference quadrature rules.
///
/// Implemented for the reference dimensions `U1`, `U2`, `U3`; returns an error
/// for element types that do not live in the respective dimension.
pub trait CanonicalQuadrature<T: Real>: SmallDim
where
    DefaultAllocator: Allocator<T, Self>,
{
    /// A rule on the reference domain of `element_type`, exact for polynomials
    /// of total degree up to `degree`.
    fn reference_rule(element_type: ElementType, degree: usize) -> eyre::Result<QuadraturePair<T, Self>>;
}

impl<T: Real> CanonicalQuadrature<T> for U1 {
    fn reference_rule(element_type: ElementType, degree: usize) -> eyre::Result<QuadraturePair<T, U1>> {
        match element_type {
            ElementType::Segment => Ok(univariate::gauss(gauss_points_for_degree(degree))),
            other => Err(eyre!("no one-dimensional quadrature rule available for element type {other}")),
        }
    }
}

impl<T: Real> CanonicalQuadrature<T> for U2 {
    fn reference_rule(element_type: ElementType, degree: usize) -> eyre::Result<QuadraturePair<T, U2>> {
        match element_type {
            ElementType::Triangle => Ok(simplex::triangle(degree)),
            ElementType::Quadrilateral => Ok(tensor::quadrilateral_gauss(gauss_points_for_degree(degree))),
            other => Err(eyre!("no two-dimensional quadrature rule available for element type {other}")),
        }
    }
}

impl<T: Real> CanonicalQuadrature<T> for U3 {
    fn reference_rule(element_type: ElementType, degree: usize) -> eyre::Result<QuadraturePair<T, U3>> {
        match element_type {
            ElementType::Tetrahedron => Ok(simplex::tetrahedron(degree)),
            ElementType::Hexahedron => Ok(tensor::hexahedron_gauss(gauss_points_for_degree(degree))),
            other => Err(eyre!("no three-dimensional quadrature rule available for element type {other}")),
        }
    }
}
