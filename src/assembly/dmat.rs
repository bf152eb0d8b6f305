//! The coefficient tensor contract: the "D" in $\int (B v) : D (B u) \, dx$.
//!
//! A coefficient tensor encapsulates a (possibly nonlinear) material or
//! coefficient law and its action at one mapped integration point. All
//! operations are pure in the point and their arguments, so they may be invoked
//! from any quadrature loop without point-to-point state.

use crate::allocators::BiDimAllocator;
use crate::geometry::MappedIntegrationPoint;
use crate::{Real, SmallDim, Symmetry};
use eyre::eyre;
use nalgebra::{convert, DefaultAllocator, OMatrix, OPoint, OVector};
use std::marker::PhantomData;

pub trait CoefficientTensor<T, GeometryDim>
where
    T: Real,
    GeometryDim: SmallDim,
    DefaultAllocator: BiDimAllocator<T, GeometryDim, Self::FluxDim>,
{
    /// The dimension of the physical quantity the tensor acts on.
    type FluxDim: SmallDim;

    /// Whether the tensor is symmetric. Assembly exploits symmetry by forming
    /// only one triangle of the element matrix.
    fn symmetry(&self) -> Symmetry;

    /// Fills the D-matrix at the given mapped point.
    fn populate_matrix(
        &self,
        point: &MappedIntegrationPoint<T, GeometryDim>,
        dmat: &mut OMatrix<T, Self::FluxDim, Self::FluxDim>,
    );

    /// Fills the tangent D-matrix linearized about the given state.
    ///
    /// Linear tensors keep the default, which ignores the state.
    fn populate_linearized_matrix(
        &self,
        point: &MappedIntegrationPoint<T, GeometryDim>,
        _linearization_state: &OVector<T, Self::FluxDim>,
        dmat: &mut OMatrix<T, Self::FluxDim, Self::FluxDim>,
    ) {
        self.populate_matrix(point, dmat);
    }

    /// Computes `D * x`.
    fn apply(
        &self,
        point: &MappedIntegrationPoint<T, GeometryDim>,
        x: &OVector<T, Self::FluxDim>,
    ) -> OVector<T, Self::FluxDim> {
        let mut dmat = OMatrix::<T, Self::FluxDim, Self::FluxDim>::zeros();
        self.populate_matrix(point, &mut dmat);
        dmat * x
    }

    /// Computes `D^T * x`.
    fn apply_transpose(
        &self,
        point: &MappedIntegrationPoint<T, GeometryDim>,
        x: &OVector<T, Self::FluxDim>,
    ) -> OVector<T, Self::FluxDim> {
        let mut dmat = OMatrix::<T, Self::FluxDim, Self::FluxDim>::zeros();
        self.populate_matrix(point, &mut dmat);
        dmat.tr_mul(x)
    }

    /// Computes `D^{-1} * x`. Fails if the tensor is singular at the point.
    fn apply_inverse(
        &self,
        point: &MappedIntegrationPoint<T, GeometryDim>,
        x: &OVector<T, Self::FluxDim>,
    ) -> eyre::Result<OVector<T, Self::FluxDim>> {
        let mut dmat = OMatrix::<T, Self::FluxDim, Self::FluxDim>::zeros();
        self.populate_matrix(point, &mut dmat);
        let inverse = dmat
            .try_inverse()
            .ok_or_else(|| eyre!("coefficient tensor is singular, cannot apply inverse"))?;
        Ok(inverse * x)
    }

    /// Computes the tangent application `D_lin(state) * x`.
    fn apply_linearized(
        &self,
        point: &MappedIntegrationPoint<T, GeometryDim>,
        linearization_state: &OVector<T, Self::FluxDim>,
        x: &OVector<T, Self::FluxDim>,
    ) -> OVector<T, Self::FluxDim> {
        let mut dmat = OMatrix::<T, Self::FluxDim, Self::FluxDim>::zeros();
        self.populate_linearized_matrix(point, linearization_state, &mut dmat);
        dmat * x
    }

    /// Computes the energy density `x^T D x / 2`.
    fn energy(&self, point: &MappedIntegrationPoint<T, GeometryDim>, x: &OVector<T, Self::FluxDim>) -> T {
        let half: T = convert(0.5);
        half * x.dot(&self.apply(point, x))
    }
}

/// A constant isotropic tensor `c * I`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsotropicTensor<T, D> {
    coefficient: T,
    marker: PhantomData<D>,
}

impl<T, D> IsotropicTensor<T, D> {
    pub fn new(coefficient: T) -> Self {
        Self {
            coefficient,
            marker: PhantomData,
        }
    }
}

impl<T, GeometryDim, D> CoefficientTensor<T, GeometryDim> for IsotropicTensor<T, D>
where
    T: Real,
    GeometryDim: SmallDim,
    D: SmallDim,
    DefaultAllocator: BiDimAllocator<T, GeometryDim, D>,
{
    type FluxDim = D;

    fn symmetry(&self) -> Symmetry {
        Symmetry::Symmetric
    }

    fn populate_matrix(&self, _point: &MappedIntegrationPoint<T, GeometryDim>, dmat: &mut OMatrix<T, D, D>) {
        dmat.fill(T::zero());
        dmat.fill_diagonal(self.coefficient);
    }

    fn apply(&self, _point: &MappedIntegrationPoint<T, GeometryDim>, x: &OVector<T, D>) -> OVector<T, D> {
        x * self.coefficient
    }

    fn apply_transpose(&self, _point: &MappedIntegrationPoint<T, GeometryDim>, x: &OVector<T, D>) -> OVector<T, D> {
        x * self.coefficient
    }

    fn apply_inverse(
        &self,
        _point: &MappedIntegrationPoint<T, GeometryDim>,
        x: &OVector<T, D>,
    ) -> eyre::Result<OVector<T, D>> {
        if self.coefficient == T::zero() {
            return Err(eyre!("coefficient tensor is singular, cannot apply inverse"));
        }
        Ok(x / self.coefficient)
    }

    fn energy(&self, _point: &MappedIntegrationPoint<T, GeometryDim>, x: &OVector<T, D>) -> T {
        let half: T = convert(0.5);
        half * self.coefficient * x.norm_squared()
    }
}

/// An isotropic tensor `c(x) * I` whose scalar coefficient is evaluated at the
/// mapped physical coordinates of each integration point.
#[derive(Debug, Clone, Copy)]
pub struct CoefficientFnTensor<F, D> {
    function: F,
    marker: PhantomData<D>,
}

impl<F, D> CoefficientFnTensor<F, D> {
    pub fn new(function: F) -> Self {
        Self {
            function,
            marker: PhantomData,
        }
    }
}

impl<T, GeometryDim, D, F> CoefficientTensor<T, GeometryDim> for CoefficientFnTensor<F, D>
where
    T: Real,
    GeometryDim: SmallDim,
    D: SmallDim,
    F: Fn(&OPoint<T, GeometryDim>) -> T,
    DefaultAllocator: BiDimAllocator<T, GeometryDim, D>,
{
    type FluxDim = D;

    fn symmetry(&self) -> Symmetry {
        Symmetry::Symmetric
    }

    fn populate_matrix(&self, point: &MappedIntegrationPoint<T, GeometryDim>, dmat: &mut OMatrix<T, D, D>) {
        let coefficient = (self.function)(point.coords());
        dmat.fill(T::zero());
        dmat.fill_diagonal(coefficient);
    }

    fn apply(&self, point: &MappedIntegrationPoint<T, GeometryDim>, x: &OVector<T, D>) -> OVector<T, D> {
        x * (self.function)(point.coords())
    }

    fn apply_transpose(&self, point: &MappedIntegrationPoint<T, GeometryDim>, x: &OVector<T, D>) -> OVector<T, D> {
        x * (self.function)(point.coords())
    }
}

/// A constant, possibly non-symmetric full matrix tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixTensor<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: nalgebra::allocator::Allocator<T, D, D>,
{
    matrix: OMatrix<T, D, D>,
}

impl<T, D> MatrixTensor<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: nalgebra::allocator::Allocator<T, D, D>,
{
    pub fn new(matrix: OMatrix<T, D, D>) -> Self {
        Self { matrix }
    }
}

impl<T, GeometryDim, D> CoefficientTensor<T, GeometryDim> for MatrixTensor<T, D>
where
    T: Real,
    GeometryDim: SmallDim,
    D: SmallDim,
    DefaultAllocator: BiDimAllocator<T, GeometryDim, D>,
{
    type FluxDim = D;

    fn symmetry(&self) -> Symmetry {
        Symmetry::NonSymmetric
    }

    fn populate_matrix(&self, _point: &MappedIntegrationPoint<T, GeometryDim>, dmat: &mut OMatrix<T, D, D>) {
        dmat.copy_from(&self.matrix);
    }
}
