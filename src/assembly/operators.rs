//! The differential operator contract: the "B" in $\int (B v) : D (B u) \, dx$.
//!
//! A differential operator maps the local coefficient vector of an element onto a
//! physical-space differential quantity (value, gradient, divergence, ...) at a
//! mapped integration point. Its matrix form, the B-matrix, has one row per flux
//! component and one column per local degree of freedom; `apply`/`apply_transpose`
//! provide matrix-free fast paths that agree with the matrix form.

use crate::allocators::BiDimAllocator;
use crate::assembly::buffers::BasisFunctionBuffer;
use crate::element::{MatrixViewMut, VolumetricFiniteElement};
use crate::geometry::MappedIntegrationPoint;
use crate::{Real, SmallDim};
use itertools::izip;
use nalgebra::{DMatrix, DVectorView, DVectorViewMut, DefaultAllocator, DimName, Dyn, OVector, U1};

pub trait DifferentialOperator<T, Element>
where
    T: Real,
    Element: VolumetricFiniteElement<T>,
    DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, Self::FluxDim>,
{
    /// The number of solution components per node.
    type SolutionDim: SmallDim;
    /// The number of components of the physical quantity produced by the
    /// operator (the row dimension of the B-matrix).
    type FluxDim: SmallDim;

    /// The derivative order of the operator. Quadrature degrees are reduced by
    /// twice this order for affine element families.
    const DIFF_ORDER: usize;

    /// A short name identifying the operator in error messages.
    fn name(&self) -> &'static str;

    /// Fills the B-matrix at the given mapped point.
    ///
    /// The output view must have `num_nodes * SolutionDim` columns. The basis
    /// buffer is scratch space owned by the caller.
    fn populate_matrix(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        output: MatrixViewMut<T, Self::FluxDim>,
    );

    /// Computes `B * coeffs` at the given mapped point.
    ///
    /// The default implementation forms the B-matrix explicitly; operators
    /// should override this with a direct evaluation where a faster path exists.
    fn apply(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        coeffs: DVectorView<T>,
    ) -> OVector<T, Self::FluxDim> {
        let n = element.num_nodes() * Self::SolutionDim::dim();
        let mut b = DMatrix::zeros(Self::FluxDim::dim(), n);
        self.populate_matrix(
            element,
            point,
            basis,
            b.generic_view_mut((0, 0), (Self::FluxDim::name(), Dyn(n))),
        );
        let mut result = OVector::<T, Self::FluxDim>::zeros();
        result.gemv(T::one(), &b, &coeffs, T::zero());
        result
    }

    /// Computes `B^T * flux` at the given mapped point, overwriting `output`.
    fn apply_transpose(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        flux: &OVector<T, Self::FluxDim>,
        mut output: DVectorViewMut<T>,
    ) {
        let n = element.num_nodes() * Self::SolutionDim::dim();
        let mut b = DMatrix::zeros(Self::FluxDim::dim(), n);
        self.populate_matrix(
            element,
            point,
            basis,
            b.generic_view_mut((0, 0), (Self::FluxDim::name(), Dyn(n))),
        );
        output.gemv_tr(T::one(), &b, flux, T::zero());
    }

    /// Fills B-matrices for an entire set of mapped points, stacked vertically
    /// in blocks of `FluxDim` rows.
    ///
    /// The default implementation loops over the points; batched operators may
    /// override this with a vectorized evaluation.
    fn populate_matrix_ir(
        &self,
        element: &Element,
        points: &[MappedIntegrationPoint<T, Element::GeometryDim>],
        basis: &mut BasisFunctionBuffer<T>,
        output: &mut DMatrix<T>,
    ) {
        let m = Self::FluxDim::dim();
        let n = element.num_nodes() * Self::SolutionDim::dim();
        assert!(output.nrows() >= m * points.len(), "Output matrix has too few rows");
        assert_eq!(output.ncols(), n, "Output matrix column count mismatch");
        for (k, point) in points.iter().enumerate() {
            let view = output.generic_view_mut((k * m, 0), (Self::FluxDim::name(), Dyn(n)));
            self.populate_matrix(element, point, basis, view);
        }
    }
}

/// The identity operator on a scalar-valued space: `B * coeffs` is the function
/// value at the point. Used for mass-type forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueOperator;

impl<T, Element> DifferentialOperator<T, Element> for ValueOperator
where
    T: Real,
    Element: VolumetricFiniteElement<T>,
    DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, U1>,
{
    type SolutionDim = U1;
    type FluxDim = U1;

    const DIFF_ORDER: usize = 0;

    fn name(&self) -> &'static str {
        "value"
    }

    fn populate_matrix(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        mut output: MatrixViewMut<T, U1>,
    ) {
        let n = element.num_nodes();
        assert_eq!(output.ncols(), n);
        basis.resize(n, Element::GeometryDim::dim());
        element.populate_basis(basis.values_mut(), point.reference_coords());
        for (j, &phi) in basis.values().iter().enumerate() {
            output[(0, j)] = phi;
        }
    }

    fn apply(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        coeffs: DVectorView<T>,
    ) -> OVector<T, U1> {
        let n = element.num_nodes();
        assert_eq!(coeffs.len(), n);
        basis.resize(n, Element::GeometryDim::dim());
        element.populate_basis(basis.values_mut(), point.reference_coords());
        let mut value = T::zero();
        for (&phi, &c) in izip!(basis.values(), coeffs.iter()) {
            value += phi * c;
        }
        let mut result = OVector::<T, U1>::zeros();
        result[0] = value;
        result
    }

    fn apply_transpose(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        flux: &OVector<T, U1>,
        mut output: DVectorViewMut<T>,
    ) {
        let n = element.num_nodes();
        assert_eq!(output.len(), n);
        basis.resize(n, Element::GeometryDim::dim());
        element.populate_basis(basis.values_mut(), point.reference_coords());
        for (j, &phi) in basis.values().iter().enumerate() {
            output[j] = phi * flux.x;
        }
    }
}

/// The gradient operator on a scalar-valued space: `B * coeffs` is the physical
/// gradient of the function at the point. Used for diffusion-type forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GradientOperator;

impl<T, Element> DifferentialOperator<T, Element> for GradientOperator
where
    T: Real,
    Element: VolumetricFiniteElement<T>,
    DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, Element::GeometryDim>,
{
    type SolutionDim = U1;
    type FluxDim = Element::GeometryDim;

    const DIFF_ORDER: usize = 1;

    fn name(&self) -> &'static str {
        "gradient"
    }

    fn populate_matrix(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        mut output: MatrixViewMut<T, Element::GeometryDim>,
    ) {
        let n = element.num_nodes();
        let d = Element::GeometryDim::dim();
        assert_eq!(output.ncols(), n);
        basis.resize(n, d);
        element.populate_basis_gradients(
            basis.element_gradients_mut::<Element::GeometryDim>(),
            point.reference_coords(),
        );
        // Physical gradients are J^{-T} times the reference gradients.
        let gradients_ref = basis.element_gradients::<Element::GeometryDim>();
        output.gemm(T::one(), point.jacobian_inv_t(), &gradients_ref, T::zero());
    }

    fn apply(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        coeffs: DVectorView<T>,
    ) -> OVector<T, Element::GeometryDim> {
        let n = element.num_nodes();
        let d = Element::GeometryDim::dim();
        assert_eq!(coeffs.len(), n);
        basis.resize(n, d);
        element.populate_basis_gradients(
            basis.element_gradients_mut::<Element::GeometryDim>(),
            point.reference_coords(),
        );
        // Contract with the reference gradients first, then map by J^{-T}; this
        // avoids transforming one gradient per node.
        let gradients_ref = basis.element_gradients::<Element::GeometryDim>();
        let mut gradient_ref = OVector::<T, Element::GeometryDim>::zeros();
        gradient_ref.gemv(T::one(), &gradients_ref, &coeffs, T::zero());
        point.jacobian_inv_t() * gradient_ref
    }

    fn apply_transpose(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        flux: &OVector<T, Element::GeometryDim>,
        mut output: DVectorViewMut<T>,
    ) {
        let n = element.num_nodes();
        let d = Element::GeometryDim::dim();
        assert_eq!(output.len(), n);
        basis.resize(n, d);
        element.populate_basis_gradients(
            basis.element_gradients_mut::<Element::GeometryDim>(),
            point.reference_coords(),
        );
        let gradients_ref = basis.element_gradients::<Element::GeometryDim>();
        // B^T f = G_ref^T (J^{-1} f)
        let pulled_back = point.jacobian_inv_t().tr_mul(flux);
        output.gemv_tr(T::one(), &gradients_ref, &pulled_back, T::zero());
    }
}

/// The divergence operator on a vector-valued space with one component per
/// geometric dimension: `B * coeffs` is the divergence of the vector field at
/// the point. Degrees of freedom are ordered node-major, components within each
/// node contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DivergenceOperator;

impl<T, Element> DifferentialOperator<T, Element> for DivergenceOperator
where
    T: Real,
    Element: VolumetricFiniteElement<T>,
    DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, U1>,
{
    type SolutionDim = Element::GeometryDim;
    type FluxDim = U1;

    const DIFF_ORDER: usize = 1;

    fn name(&self) -> &'static str {
        "divergence"
    }

    fn populate_matrix(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        basis: &mut BasisFunctionBuffer<T>,
        mut output: MatrixViewMut<T, U1>,
    ) {
        let n = element.num_nodes();
        let d = Element::GeometryDim::dim();
        assert_eq!(output.ncols(), n * d);
        basis.resize(n, d);
        element.populate_basis_gradients(
            basis.element_gradients_mut::<Element::GeometryDim>(),
            point.reference_coords(),
        );
        let gradients_ref = basis.element_gradients::<Element::GeometryDim>();
        for j in 0..n {
            let gradient_phys = point.jacobian_inv_t() * gradients_ref.column(j);
            for c in 0..d {
                output[(0, j * d + c)] = gradient_phys[c];
            }
        }
    }
}
