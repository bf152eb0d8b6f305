//! The BDB assembly engine: element matrices and matrix-free element operators
//! for bilinear forms $\int (B v) : D (B u) \, dx$.

use crate::allocators::BiDimAllocator;
use crate::assembly::buffers::{BasisFunctionBuffer, QuadratureRuleBuffer};
use crate::assembly::dmat::CoefficientTensor;
use crate::assembly::operators::DifferentialOperator;
use crate::element::{ElementType, VolumetricFiniteElement};
use crate::geometry::{populate_mapped_quadrature, MappedIntegrationPoint};
use crate::quadrature::canonical::CanonicalQuadrature;
use crate::util::clone_upper_to_lower;
use crate::{Real, SmallDim, Symmetry};
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use eyre::{eyre, WrapErr};
use itertools::izip;
use nalgebra::{
    DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, DefaultAllocator, DimName, Dyn, OMatrix, OVector,
};

#[derive(Debug)]
struct BdbWorkspace<T, GeometryDim, FluxDim>
where
    T: Real,
    GeometryDim: SmallDim,
    FluxDim: SmallDim,
    DefaultAllocator: BiDimAllocator<T, GeometryDim, FluxDim>,
{
    basis: BasisFunctionBuffer<T>,
    quadrature: QuadratureRuleBuffer<T, GeometryDim>,
    mapped_points: Vec<MappedIntegrationPoint<T, GeometryDim>>,
    b_stack: DMatrix<T>,
    db_stack: DMatrix<T>,
    dmats: Vec<OMatrix<T, FluxDim, FluxDim>>,
    vector_buffer: DVector<T>,
}

impl<T, GeometryDim, FluxDim> Default for BdbWorkspace<T, GeometryDim, FluxDim>
where
    T: Real,
    GeometryDim: SmallDim,
    FluxDim: SmallDim,
    DefaultAllocator: BiDimAllocator<T, GeometryDim, FluxDim>,
{
    fn default() -> Self {
        Self {
            basis: Default::default(),
            quadrature: Default::default(),
            mapped_points: Vec::new(),
            b_stack: DMatrix::zeros(0, 0),
            db_stack: DMatrix::zeros(0, 0),
            dmats: Vec::new(),
            vector_buffer: DVector::zeros(0),
        }
    }
}

define_thread_local_workspace!(WORKSPACE);

/// Assembles element matrices and element operators for the bilinear form
/// induced by a differential operator and a coefficient tensor.
///
/// The assembler is configured once and then invoked per element by an external
/// assembly loop. All methods take `&self` and use only thread-local scratch, so
/// distinct elements may be processed concurrently by an external worker pool.
#[derive(Debug, Clone)]
pub struct BdbAssembler<DiffOp, DMat> {
    diff_op: DiffOp,
    dmat_op: DMat,
    integration_order: Option<usize>,
    expected_element_type: Option<ElementType>,
}

impl<DiffOp, DMat> BdbAssembler<DiffOp, DMat> {
    pub fn new(diff_op: DiffOp, dmat_op: DMat) -> Self {
        Self {
            diff_op,
            dmat_op,
            integration_order: None,
            expected_element_type: None,
        }
    }

    /// Overrides the default integration order.
    pub fn with_integration_order(mut self, order: usize) -> Self {
        self.integration_order = Some(order);
        self
    }

    /// Restricts the assembler to a single element type; assembly fails with a
    /// descriptive error for any other type.
    pub fn with_expected_element_type(mut self, element_type: ElementType) -> Self {
        self.expected_element_type = Some(element_type);
        self
    }

    pub fn diff_op(&self) -> &DiffOp {
        &self.diff_op
    }

    pub fn dmat_op(&self) -> &DMat {
        &self.dmat_op
    }
}

impl<DiffOp, DMat> BdbAssembler<DiffOp, DMat> {
    /// Verifies that an element's type matches the assembler's expectation.
    pub fn check_element_type(&self, found: ElementType) -> eyre::Result<()> {
        if let Some(expected) = self.expected_element_type {
            if found != expected {
                return Err(eyre!(
                    "element type {found} does not match the expected element type {expected}"
                ));
            }
        }
        Ok(())
    }

    /// The integration degree used for an element: twice the element order,
    /// reduced by twice the operator's derivative order for the affine element
    /// family, unless an explicit override is set.
    pub fn integration_degree(&self, element_type: ElementType, element_order: usize, diff_order: usize) -> usize {
        if let Some(order) = self.integration_order {
            return order;
        }
        let order = 2 * element_order;
        if element_type.is_affine_family() {
            order.saturating_sub(2 * diff_order)
        } else {
            order
        }
    }

    /// Assembles the element matrix `sum_q w_q |J_q| B_q^T D_q B_q` into the
    /// provided output matrix.
    pub fn assemble_element_matrix_into<T, Element>(
        &self,
        element: &Element,
        output: DMatrixViewMut<T>,
    ) -> eyre::Result<()>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        Element::GeometryDim: CanonicalQuadrature<T>,
        DiffOp: DifferentialOperator<T, Element>,
        DMat: CoefficientTensor<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        self.do_assemble_element_matrix(element, output, None).wrap_err_with(|| {
            format!(
                "in assemble_element_matrix, operator = {}, element type = {}",
                self.diff_op.name(),
                element.element_type()
            )
        })
    }

    /// Assembles the tangent element matrix about the state `u_lin`: the
    /// coefficient tensor is linearized about `B u_lin` at each quadrature
    /// point, then assembled exactly like the plain element matrix.
    pub fn assemble_linearized_element_matrix_into<T, Element>(
        &self,
        element: &Element,
        u_lin: DVectorView<T>,
        output: DMatrixViewMut<T>,
    ) -> eyre::Result<()>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        Element::GeometryDim: CanonicalQuadrature<T>,
        DiffOp: DifferentialOperator<T, Element>,
        DMat: CoefficientTensor<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        self.do_assemble_element_matrix(element, output, Some(u_lin))
            .wrap_err_with(|| {
                format!(
                    "in assemble_linearized_element_matrix, operator = {}, element type = {}",
                    self.diff_op.name(),
                    element.element_type()
                )
            })
    }

    fn do_assemble_element_matrix<T, Element>(
        &self,
        element: &Element,
        mut output: DMatrixViewMut<T>,
        linearization: Option<DVectorView<T>>,
    ) -> eyre::Result<()>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        Element::GeometryDim: CanonicalQuadrature<T>,
        DiffOp: DifferentialOperator<T, Element>,
        DMat: CoefficientTensor<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        self.check_element_type(element.element_type())?;
        let n = element.num_nodes() * DiffOp::SolutionDim::dim();
        assert_eq!(output.nrows(), n, "Output matrix dimension mismatch");
        assert_eq!(output.ncols(), n, "Output matrix dimension mismatch");
        let degree = self.integration_degree(element.element_type(), element.order(), DiffOp::DIFF_ORDER);

        with_thread_local_workspace(
            &WORKSPACE,
            |ws: &mut BdbWorkspace<T, Element::GeometryDim, DiffOp::FluxDim>| -> eyre::Result<()> {
                ws.quadrature.populate_canonical(element.element_type(), degree)?;
                populate_mapped_quadrature(element, ws.quadrature.weights(), ws.quadrature.points(), &mut ws.mapped_points)?;

                let BdbWorkspace {
                    basis,
                    mapped_points,
                    b_stack,
                    db_stack,
                    dmats,
                    ..
                } = ws;
                let num_points = mapped_points.len();
                let m = DiffOp::FluxDim::dim();

                dmats.resize(num_points, OMatrix::<T, DiffOp::FluxDim, DiffOp::FluxDim>::zeros());
                for (point, dmat) in izip!(mapped_points.iter(), dmats.iter_mut()) {
                    match linearization {
                        None => self.dmat_op.populate_matrix(point, dmat),
                        Some(u_lin) => {
                            let state = self.diff_op.apply(element, point, basis, u_lin);
                            self.dmat_op.populate_linearized_matrix(point, &state, dmat);
                        }
                    }
                }

                output.fill(T::zero());
                let symmetric = matches!(self.dmat_op.symmetry(), Symmetry::Symmetric);

                // Points are processed in fixed-size blocks so that the
                // accumulation over a block is a single stacked product. The
                // block size only affects floating point summation order, not
                // the assembled values.
                let block_size = 4 * (6 / m + 1);
                b_stack.resize_mut(m * block_size, n, T::zero());
                db_stack.resize_mut(m * block_size, n, T::zero());

                let mut start = 0;
                while start < num_points {
                    let count = block_size.min(num_points - start);
                    let rows = m * count;

                    self.diff_op
                        .populate_matrix_ir(element, &mapped_points[start..start + count], basis, b_stack);
                    for k in 0..count {
                        let point = &mapped_points[start + k];
                        let b_view = b_stack.generic_view((k * m, 0), (DiffOp::FluxDim::name(), Dyn(n)));
                        let mut db_view = db_stack.generic_view_mut((k * m, 0), (DiffOp::FluxDim::name(), Dyn(n)));
                        db_view.gemm(point.integration_weight(), &dmats[start + k], &b_view, T::zero());
                    }

                    let b_used = b_stack.view((0, 0), (rows, n));
                    let db_used = db_stack.view((0, 0), (rows, n));
                    if symmetric {
                        // Only the upper triangle is formed; the mirror copy
                        // happens once after all blocks are accumulated.
                        for j in 0..n {
                            for i in 0..=j {
                                output[(i, j)] += b_used.column(i).dot(&db_used.column(j));
                            }
                        }
                    } else {
                        output.gemm_tr(T::one(), &b_used, &db_used, T::one());
                    }
                    start += count;
                }

                if symmetric {
                    clone_upper_to_lower(&mut output);
                }
                Ok(())
            },
        )
    }

    /// Assembles only the diagonal of the element matrix, for Jacobi-type
    /// preconditioners.
    pub fn assemble_element_matrix_diagonal_into<T, Element>(
        &self,
        element: &Element,
        mut output: DVectorViewMut<T>,
    ) -> eyre::Result<()>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        Element::GeometryDim: CanonicalQuadrature<T>,
        DiffOp: DifferentialOperator<T, Element>,
        DMat: CoefficientTensor<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        let result = with_thread_local_workspace(
            &WORKSPACE,
            |ws: &mut BdbWorkspace<T, Element::GeometryDim, DiffOp::FluxDim>| -> eyre::Result<()> {
                self.check_element_type(element.element_type())?;
                let n = element.num_nodes() * DiffOp::SolutionDim::dim();
                assert_eq!(output.len(), n, "Output vector dimension mismatch");
                let degree = self.integration_degree(element.element_type(), element.order(), DiffOp::DIFF_ORDER);

                ws.quadrature.populate_canonical(element.element_type(), degree)?;
                populate_mapped_quadrature(element, ws.quadrature.weights(), ws.quadrature.points(), &mut ws.mapped_points)?;

                let BdbWorkspace {
                    basis,
                    mapped_points,
                    b_stack,
                    ..
                } = ws;
                let m = DiffOp::FluxDim::dim();
                b_stack.resize_mut(m, n, T::zero());
                output.fill(T::zero());

                for point in mapped_points.iter() {
                    let b_view = b_stack.generic_view_mut((0, 0), (DiffOp::FluxDim::name(), Dyn(n)));
                    self.diff_op.populate_matrix(element, point, basis, b_view);
                    let mut dmat = OMatrix::<T, DiffOp::FluxDim, DiffOp::FluxDim>::zeros();
                    self.dmat_op.populate_matrix(point, &mut dmat);
                    let fac = point.integration_weight();

                    let b = b_stack.generic_view((0, 0), (DiffOp::FluxDim::name(), Dyn(n)));
                    for j in 0..n {
                        let b_col = b.column(j);
                        let db_col = &dmat * b_col;
                        output[j] += fac * b_col.dot(&db_col);
                    }
                }
                Ok(())
            },
        );
        result.wrap_err_with(|| {
            format!(
                "in assemble_element_matrix_diagonal, operator = {}, element type = {}",
                self.diff_op.name(),
                element.element_type()
            )
        })
    }

    /// Computes `y = B^T D B x` without forming the element matrix.
    pub fn apply_element_matrix<T, Element>(
        &self,
        element: &Element,
        x: DVectorView<T>,
        mut y: DVectorViewMut<T>,
    ) -> eyre::Result<()>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        Element::GeometryDim: CanonicalQuadrature<T>,
        DiffOp: DifferentialOperator<T, Element>,
        DMat: CoefficientTensor<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        let result = with_thread_local_workspace(
            &WORKSPACE,
            |ws: &mut BdbWorkspace<T, Element::GeometryDim, DiffOp::FluxDim>| -> eyre::Result<()> {
                self.check_element_type(element.element_type())?;
                let n = element.num_nodes() * DiffOp::SolutionDim::dim();
                assert_eq!(x.len(), n, "Input vector dimension mismatch");
                assert_eq!(y.len(), n, "Output vector dimension mismatch");
                let degree = self.integration_degree(element.element_type(), element.order(), DiffOp::DIFF_ORDER);

                ws.quadrature.populate_canonical(element.element_type(), degree)?;
                populate_mapped_quadrature(element, ws.quadrature.weights(), ws.quadrature.points(), &mut ws.mapped_points)?;

                let BdbWorkspace {
                    basis,
                    mapped_points,
                    vector_buffer,
                    ..
                } = ws;
                y.fill(T::zero());
                vector_buffer.resize_vertically_mut(n, T::zero());
                for point in mapped_points.iter() {
                    let flux = self.diff_op.apply(element, point, basis, x);
                    let dflux = self.dmat_op.apply(point, &flux) * point.integration_weight();
                    self.diff_op
                        .apply_transpose(element, point, basis, &dflux, DVectorViewMut::from(&mut *vector_buffer));
                    y.axpy(T::one(), vector_buffer, T::one());
                }
                Ok(())
            },
        );
        result.wrap_err_with(|| {
            format!(
                "in apply_element_matrix, operator = {}, element type = {}",
                self.diff_op.name(),
                element.element_type()
            )
        })
    }

    /// Computes the matrix-free directional application of the tangent matrix
    /// about `u_lin`: `y = B^T D_lin(B u_lin) B x`.
    pub fn apply_linearized_element_matrix<T, Element>(
        &self,
        element: &Element,
        u_lin: DVectorView<T>,
        x: DVectorView<T>,
        mut y: DVectorViewMut<T>,
    ) -> eyre::Result<()>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        Element::GeometryDim: CanonicalQuadrature<T>,
        DiffOp: DifferentialOperator<T, Element>,
        DMat: CoefficientTensor<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        let result = with_thread_local_workspace(
            &WORKSPACE,
            |ws: &mut BdbWorkspace<T, Element::GeometryDim, DiffOp::FluxDim>| -> eyre::Result<()> {
                self.check_element_type(element.element_type())?;
                let n = element.num_nodes() * DiffOp::SolutionDim::dim();
                assert_eq!(u_lin.len(), n, "Linearization state dimension mismatch");
                assert_eq!(x.len(), n, "Input vector dimension mismatch");
                assert_eq!(y.len(), n, "Output vector dimension mismatch");
                let degree = self.integration_degree(element.element_type(), element.order(), DiffOp::DIFF_ORDER);

                ws.quadrature.populate_canonical(element.element_type(), degree)?;
                populate_mapped_quadrature(element, ws.quadrature.weights(), ws.quadrature.points(), &mut ws.mapped_points)?;

                let BdbWorkspace {
                    basis,
                    mapped_points,
                    vector_buffer,
                    ..
                } = ws;
                y.fill(T::zero());
                vector_buffer.resize_vertically_mut(n, T::zero());
                for point in mapped_points.iter() {
                    let state = self.diff_op.apply(element, point, basis, u_lin);
                    let flux = self.diff_op.apply(element, point, basis, x);
                    let dflux = self.dmat_op.apply_linearized(point, &state, &flux) * point.integration_weight();
                    self.diff_op
                        .apply_transpose(element, point, basis, &dflux, DVectorViewMut::from(&mut *vector_buffer));
                    y.axpy(T::one(), vector_buffer, T::one());
                }
                Ok(())
            },
        );
        result.wrap_err_with(|| {
            format!(
                "in apply_linearized_element_matrix, operator = {}, element type = {}",
                self.diff_op.name(),
                element.element_type()
            )
        })
    }

    /// Computes the element energy `sum_q w_q |J_q| E(B u)` where `E` is the
    /// coefficient tensor's energy density. Used for line searches and
    /// energy-based convergence checks.
    pub fn compute_element_energy<T, Element>(&self, element: &Element, u: DVectorView<T>) -> eyre::Result<T>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        Element::GeometryDim: CanonicalQuadrature<T>,
        DiffOp: DifferentialOperator<T, Element>,
        DMat: CoefficientTensor<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        let result = with_thread_local_workspace(
            &WORKSPACE,
            |ws: &mut BdbWorkspace<T, Element::GeometryDim, DiffOp::FluxDim>| -> eyre::Result<T> {
                self.check_element_type(element.element_type())?;
                let n = element.num_nodes() * DiffOp::SolutionDim::dim();
                assert_eq!(u.len(), n, "Input vector dimension mismatch");
                let degree = self.integration_degree(element.element_type(), element.order(), DiffOp::DIFF_ORDER);

                ws.quadrature.populate_canonical(element.element_type(), degree)?;
                populate_mapped_quadrature(element, ws.quadrature.weights(), ws.quadrature.points(), &mut ws.mapped_points)?;

                let BdbWorkspace {
                    basis, mapped_points, ..
                } = ws;
                let mut energy = T::zero();
                for point in mapped_points.iter() {
                    let flux = self.diff_op.apply(element, point, basis, u);
                    energy += point.integration_weight() * self.dmat_op.energy(point, &flux);
                }
                Ok(energy)
            },
        );
        result.wrap_err_with(|| {
            format!(
                "in compute_element_energy, operator = {}, element type = {}",
                self.diff_op.name(),
                element.element_type()
            )
        })
    }

    /// Computes the physical-space quantity `B coeffs` at a single mapped point,
    /// with the coefficient tensor optionally applied.
    pub fn compute_flux<T, Element>(
        &self,
        element: &Element,
        point: &MappedIntegrationPoint<T, Element::GeometryDim>,
        coeffs: DVectorView<T>,
        apply_d: bool,
    ) -> OVector<T, DiffOp::FluxDim>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        DiffOp: DifferentialOperator<T, Element>,
        DMat: CoefficientTensor<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        with_thread_local_workspace(
            &WORKSPACE,
            |ws: &mut BdbWorkspace<T, Element::GeometryDim, DiffOp::FluxDim>| {
                let flux = self.diff_op.apply(element, point, &mut ws.basis, coeffs);
                if apply_d {
                    self.dmat_op.apply(point, &flux)
                } else {
                    flux
                }
            },
        )
    }
}
