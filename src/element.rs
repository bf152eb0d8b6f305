//! The finite element query contract consumed by the assembly kernels, plus a
//! small set of concrete reference elements.
//!
//! Concrete function spaces live outside this crate; the assembly kernels only
//! require the narrow query surface defined by [`ReferenceFiniteElement`] and
//! [`FiniteElement`]: degree-of-freedom count, polynomial order, element type tag
//! and shape function/derivative evaluation at reference coordinates.

use crate::allocators::{BiDimAllocator, DimAllocator};
use crate::SmallDim;
use nalgebra::{DefaultAllocator, Dyn, OMatrix, OPoint, Scalar, U1};
use serde::{Deserialize, Serialize};
use std::fmt;

mod quadrilateral;
mod segment;
mod tetrahedron;
mod triangle;

pub use quadrilateral::*;
pub use segment::*;
pub use tetrahedron::*;
pub use triangle::*;

/// A column-major view with dynamic column count, used for basis gradient output.
pub type MatrixViewMut<'a, T, R> = nalgebra::MatrixViewMut<'a, T, R, Dyn, U1, Dyn>;
/// Immutable counterpart of [`MatrixViewMut`].
pub type MatrixView<'a, T, R> = nalgebra::MatrixView<'a, T, R, Dyn, U1, Dyn>;

/// Tag identifying the reference domain of a finite element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Segment,
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Hexahedron,
}

impl ElementType {
    /// The dimension of the reference domain.
    pub fn reference_dim(&self) -> usize {
        match self {
            ElementType::Segment => 1,
            ElementType::Triangle | ElementType::Quadrilateral => 2,
            ElementType::Tetrahedron | ElementType::Hexahedron => 3,
        }
    }

    /// Whether elements of this type map affinely from the reference domain
    /// (straight-sided instances), i.e. whether the type belongs to the simplex
    /// family. Quadrature orders can be reduced by the differential operator's
    /// derivative order for these types.
    pub fn is_affine_family(&self) -> bool {
        matches!(
            self,
            ElementType::Segment | ElementType::Triangle | ElementType::Tetrahedron
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Segment => "segment",
            ElementType::Triangle => "triangle",
            ElementType::Quadrilateral => "quadrilateral",
            ElementType::Tetrahedron => "tetrahedron",
            ElementType::Hexahedron => "hexahedron",
        };
        write!(f, "{name}")
    }
}

pub trait ReferenceFiniteElement<T>
where
    T: Scalar,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>,
{
    type ReferenceDim: SmallDim;

    /// Returns the number of nodes (degrees of freedom per component) in the
    /// element.
    fn num_nodes(&self) -> usize;

    /// The polynomial order of the element's basis.
    fn order(&self) -> usize;

    /// The reference domain tag of the element.
    fn element_type(&self) -> ElementType;

    /// Evaluates each basis function at the given reference coordinates.
    ///
    /// The output slice must have length equal to `num_nodes()`.
    fn populate_basis(&self, basis_values: &mut [T], reference_coords: &OPoint<T, Self::ReferenceDim>);

    /// Fills a matrix whose columns are the gradients of each basis function
    /// with respect to the reference coordinates.
    ///
    /// The output view must have `num_nodes()` columns.
    fn populate_basis_gradients(
        &self,
        basis_gradients: MatrixViewMut<T, Self::ReferenceDim>,
        reference_coords: &OPoint<T, Self::ReferenceDim>,
    );
}

pub trait FiniteElement<T>: ReferenceFiniteElement<T>
where
    T: Scalar,
    DefaultAllocator: BiDimAllocator<T, Self::GeometryDim, Self::ReferenceDim>,
{
    type GeometryDim: SmallDim;

    /// Compute the Jacobian of the transformation from the reference element to
    /// the given element at the given reference coordinates.
    fn reference_jacobian(
        &self,
        reference_coords: &OPoint<T, Self::ReferenceDim>,
    ) -> OMatrix<T, Self::GeometryDim, Self::ReferenceDim>;

    /// Maps reference coordinates to physical coordinates in the element.
    fn map_reference_coords(&self, reference_coords: &OPoint<T, Self::ReferenceDim>) -> OPoint<T, Self::GeometryDim>;

    /// The diameter of the finite element, i.e. the largest distance between any
    /// two points in the element.
    fn diameter(&self) -> T;
}

/// A finite element whose geometry dimension and reference dimension coincide.
pub trait VolumetricFiniteElement<T>:
    FiniteElement<T, ReferenceDim = <Self as FiniteElement<T>>::GeometryDim>
where
    T: Scalar,
    DefaultAllocator: BiDimAllocator<T, Self::GeometryDim, Self::ReferenceDim>,
{
}

impl<T, E> VolumetricFiniteElement<T> for E
where
    T: Scalar,
    E: FiniteElement<T, ReferenceDim = <Self as FiniteElement<T>>::GeometryDim>,
    DefaultAllocator: BiDimAllocator<T, Self::GeometryDim, Self::ReferenceDim>,
{
}
