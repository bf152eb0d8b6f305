//! Mapped integration points: the geometric data the assembly kernels consume at
//! each quadrature point.
//!
//! The data here is what an element transformation provider computes: the
//! Jacobian of the reference-to-physical map, its determinant and (transposed)
//! inverse, and the mapped physical coordinates. The assembly engines treat it as
//! read-only.

use crate::allocators::DimAllocator;
use crate::element::FiniteElement;
use crate::{Real, SmallDim};
use eyre::eyre;
use itertools::izip;
use nalgebra::{DefaultAllocator, OMatrix, OPoint};

/// Geometric data for one quadrature point mapped onto one element.
#[derive(Debug, Clone)]
pub struct MappedIntegrationPoint<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    reference_coords: OPoint<T, D>,
    coords: OPoint<T, D>,
    weight: T,
    jacobian: OMatrix<T, D, D>,
    jacobian_det: T,
    jacobian_inv_t: OMatrix<T, D, D>,
}

impl<T, D> MappedIntegrationPoint<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    /// Maps a single reference point (with associated quadrature weight) through
    /// the geometry of the given element.
    ///
    /// Returns an error if the element Jacobian is singular at the point. An
    /// inverted (negative-determinant) Jacobian is not an error here: integration
    /// weights are formed from the absolute determinant, so a merely inverted
    /// orientation is corrected by the sign.
    pub fn map_element_point<Element>(element: &Element, xi: &OPoint<T, D>, weight: T) -> eyre::Result<Self>
    where
        Element: FiniteElement<T, GeometryDim = D, ReferenceDim = D>,
    {
        let jacobian = element.reference_jacobian(xi);
        let jacobian_det = jacobian.determinant();
        let jacobian_inv_t = jacobian
            .clone()
            .try_inverse()
            .ok_or_else(|| eyre!("singular element Jacobian encountered"))?
            .transpose();
        Ok(Self {
            reference_coords: xi.clone(),
            coords: element.map_reference_coords(xi),
            weight,
            jacobian,
            jacobian_det,
            jacobian_inv_t,
        })
    }

    pub fn reference_coords(&self) -> &OPoint<T, D> {
        &self.reference_coords
    }

    /// The mapped physical coordinates of the point.
    pub fn coords(&self) -> &OPoint<T, D> {
        &self.coords
    }

    /// The quadrature weight associated with the point.
    pub fn weight(&self) -> T {
        self.weight
    }

    pub fn jacobian(&self) -> &OMatrix<T, D, D> {
        &self.jacobian
    }

    pub fn jacobian_det(&self) -> T {
        self.jacobian_det
    }

    pub fn jacobian_inv_t(&self) -> &OMatrix<T, D, D> {
        &self.jacobian_inv_t
    }

    /// The absolute Jacobian determinant.
    pub fn measure(&self) -> T {
        self.jacobian_det.abs()
    }

    /// The combined integration factor: quadrature weight times absolute
    /// Jacobian determinant.
    pub fn integration_weight(&self) -> T {
        self.weight * self.jacobian_det.abs()
    }
}

/// Maps an entire quadrature rule through the geometry of the given element,
/// into a reusable buffer.
pub fn populate_mapped_quadrature<T, Element>(
    element: &Element,
    weights: &[T],
    points: &[OPoint<T, Element::GeometryDim>],
    output: &mut Vec<MappedIntegrationPoint<T, Element::GeometryDim>>,
) -> eyre::Result<()>
where
    T: Real,
    Element: FiniteElement<T, ReferenceDim = <Element as FiniteElement<T>>::GeometryDim>,
    DefaultAllocator: DimAllocator<T, Element::GeometryDim>,
{
    assert_eq!(weights.len(), points.len());
    output.clear();
    output.reserve(points.len());
    for (&w, xi) in izip!(weights, points) {
        output.push(MappedIntegrationPoint::map_element_point(element, xi, w)?);
    }
    Ok(())
}
