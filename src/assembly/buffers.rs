//! Reusable scratch buffers for element-level assembly.
//!
//! One instance of each buffer lives in a thread-local workspace owned by the
//! assembler that uses it: acquired at the start of one element's assembly,
//! resized in place, and never shared across threads, so consecutive elements
//! reuse the same allocations without aliasing each other's data.

use crate::element::{ElementType, MatrixView, MatrixViewMut};
use crate::quadrature::canonical::CanonicalQuadrature;
use crate::{Real, SmallDim};
use nalgebra::{DMatrix, DefaultAllocator, DimName, Dyn, OPoint, Scalar};

use crate::allocators::DimAllocator;

#[derive(Debug)]
pub struct BasisFunctionBuffer<T: Scalar> {
    element_basis_values: Vec<T>,
    element_basis_gradients: DMatrix<T>,
}

impl<T: Real> Default for BasisFunctionBuffer<T> {
    fn default() -> Self {
        Self {
            element_basis_values: Vec::new(),
            element_basis_gradients: DMatrix::zeros(0, 0),
        }
    }
}

impl<T: Real> BasisFunctionBuffer<T> {
    pub fn resize(&mut self, node_count: usize, reference_dim: usize) {
        self.element_basis_values.resize(node_count, T::zero());
        self.element_basis_gradients
            .resize_mut(reference_dim, node_count, T::zero());
    }

    pub fn values(&self) -> &[T] {
        &self.element_basis_values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.element_basis_values
    }

    pub fn element_gradients<D: DimName>(&self) -> MatrixView<T, D> {
        let ncols = self.element_basis_gradients.ncols();
        self.element_basis_gradients
            .generic_view((0, 0), (D::name(), Dyn(ncols)))
    }

    pub fn element_gradients_mut<D: DimName>(&mut self) -> MatrixViewMut<T, D> {
        let ncols = self.element_basis_gradients.ncols();
        self.element_basis_gradients
            .generic_view_mut((0, 0), (D::name(), Dyn(ncols)))
    }
}

/// A buffer holding the reference quadrature rule for the element currently
/// being assembled.
///
/// Consecutive elements overwhelmingly share element type and integration
/// degree, so the last rule is memoized and only rebuilt when the key changes.
#[derive(Debug)]
pub struct QuadratureRuleBuffer<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    weights: Vec<T>,
    points: Vec<OPoint<T, D>>,
    key: Option<(ElementType, usize)>,
}

impl<T, D> Default for QuadratureRuleBuffer<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn default() -> Self {
        Self {
            weights: Vec::new(),
            points: Vec::new(),
            key: None,
        }
    }
}

impl<T, D> QuadratureRuleBuffer<T, D>
where
    T: Real,
    D: SmallDim + CanonicalQuadrature<T>,
    DefaultAllocator: DimAllocator<T, D>,
{
    /// Fills the buffer with the canonical rule for the given element type and
    /// polynomial degree, reusing the current contents when the key matches.
    pub fn populate_canonical(&mut self, element_type: ElementType, degree: usize) -> eyre::Result<()> {
        if self.key != Some((element_type, degree)) {
            let (weights, points) = D::reference_rule(element_type, degree)?;
            self.weights = weights;
            self.points = points;
            self.key = Some((element_type, degree));
        }
        Ok(())
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn points(&self) -> &[OPoint<T, D>] {
        &self.points
    }
}
