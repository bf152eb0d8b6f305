//! Element vector assembly for linear forms of the type $\int (B v) \cdot d \, dx$.

use crate::allocators::BiDimAllocator;
use crate::assembly::buffers::{BasisFunctionBuffer, QuadratureRuleBuffer};
use crate::assembly::operators::DifferentialOperator;
use crate::element::{ElementType, VolumetricFiniteElement};
use crate::geometry::{populate_mapped_quadrature, MappedIntegrationPoint};
use crate::quadrature::canonical::CanonicalQuadrature;
use crate::{Real, SmallDim};
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use eyre::{eyre, WrapErr};
use nalgebra::{DVector, DVectorViewMut, DefaultAllocator, DimName, OPoint, OVector};
use std::marker::PhantomData;

/// The source term of a linear form: a flux-valued function of the mapped
/// integration point.
pub trait SourceTerm<T, GeometryDim>
where
    T: Real,
    GeometryDim: SmallDim,
    DefaultAllocator: BiDimAllocator<T, GeometryDim, Self::FluxDim>,
{
    type FluxDim: SmallDim;

    fn populate_vector(
        &self,
        point: &MappedIntegrationPoint<T, GeometryDim>,
        output: &mut OVector<T, Self::FluxDim>,
    );
}

/// A source term evaluated from a closure of the mapped physical coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSource<F, D> {
    function: F,
    marker: PhantomData<D>,
}

impl<F, D> FunctionSource<F, D> {
    pub fn new(function: F) -> Self {
        Self {
            function,
            marker: PhantomData,
        }
    }
}

impl<T, GeometryDim, D, F> SourceTerm<T, GeometryDim> for FunctionSource<F, D>
where
    T: Real,
    GeometryDim: SmallDim,
    D: SmallDim,
    F: Fn(&OPoint<T, GeometryDim>) -> OVector<T, D>,
    DefaultAllocator: BiDimAllocator<T, GeometryDim, D>,
{
    type FluxDim = D;

    fn populate_vector(&self, point: &MappedIntegrationPoint<T, GeometryDim>, output: &mut OVector<T, D>) {
        *output = (self.function)(point.coords());
    }
}

#[derive(Debug)]
struct SourceAssemblerWorkspace<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: crate::allocators::DimAllocator<T, D>,
{
    basis: BasisFunctionBuffer<T>,
    quadrature: QuadratureRuleBuffer<T, D>,
    mapped_points: Vec<MappedIntegrationPoint<T, D>>,
    vector_buffer: DVector<T>,
}

impl<T, D> Default for SourceAssemblerWorkspace<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: crate::allocators::DimAllocator<T, D>,
{
    fn default() -> Self {
        Self {
            basis: Default::default(),
            quadrature: Default::default(),
            mapped_points: Vec::new(),
            vector_buffer: DVector::zeros(0),
        }
    }
}

define_thread_local_workspace!(WORKSPACE);

/// Assembles element vectors $\sum_q w_q |J_q| \, B_q^T d(x_q)$ for a
/// differential operator and a source term.
#[derive(Debug, Clone)]
pub struct ElementSourceAssembler<DiffOp, Source> {
    diff_op: DiffOp,
    source: Source,
    integration_order: Option<usize>,
    expected_element_type: Option<ElementType>,
}

impl<DiffOp, Source> ElementSourceAssembler<DiffOp, Source> {
    pub fn new(diff_op: DiffOp, source: Source) -> Self {
        Self {
            diff_op,
            source,
            integration_order: None,
            expected_element_type: None,
        }
    }

    /// Overrides the default integration order.
    pub fn with_integration_order(mut self, order: usize) -> Self {
        self.integration_order = Some(order);
        self
    }

    /// Restricts the assembler to a single element type; assembly fails for any
    /// other type.
    pub fn with_expected_element_type(mut self, element_type: ElementType) -> Self {
        self.expected_element_type = Some(element_type);
        self
    }

    pub fn assemble_element_vector_into<T, Element>(
        &self,
        element: &Element,
        mut output: DVectorViewMut<T>,
    ) -> eyre::Result<()>
    where
        T: Real,
        Element: VolumetricFiniteElement<T>,
        Element::GeometryDim: CanonicalQuadrature<T>,
        DiffOp: DifferentialOperator<T, Element>,
        Source: SourceTerm<T, Element::GeometryDim, FluxDim = DiffOp::FluxDim>,
        DefaultAllocator: BiDimAllocator<T, Element::GeometryDim, DiffOp::FluxDim>,
    {
        let result = (|| -> eyre::Result<()> {
            if let Some(expected) = self.expected_element_type {
                let found = element.element_type();
                if found != expected {
                    return Err(eyre!(
                        "element type {found} does not match the expected element type {expected} \
                         (operator: {})",
                        self.diff_op.name()
                    ));
                }
            }
            let n = element.num_nodes() * DiffOp::SolutionDim::dim();
            assert_eq!(output.len(), n, "Output vector dimension mismatch");

            let degree = self.integration_order.unwrap_or_else(|| {
                let order = 2 * element.order() + 1;
                if element.element_type().is_affine_family() {
                    order.saturating_sub(DiffOp::DIFF_ORDER)
                } else {
                    order
                }
            });

            with_thread_local_workspace(
                &WORKSPACE,
                |ws: &mut SourceAssemblerWorkspace<T, Element::GeometryDim>| -> eyre::Result<()> {
                    ws.quadrature.populate_canonical(element.element_type(), degree)?;
                    populate_mapped_quadrature(
                        element,
                        ws.quadrature.weights(),
                        ws.quadrature.points(),
                        &mut ws.mapped_points,
                    )?;

                    let SourceAssemblerWorkspace {
                        basis,
                        mapped_points,
                        vector_buffer,
                        ..
                    } = ws;
                    output.fill(T::zero());
                    vector_buffer.resize_vertically_mut(n, T::zero());
                    for point in mapped_points.iter() {
                        let mut source_value = OVector::<T, DiffOp::FluxDim>::zeros();
                        self.source.populate_vector(point, &mut source_value);
                        source_value *= point.integration_weight();
                        self.diff_op.apply_transpose(
                            element,
                            point,
                            basis,
                            &source_value,
                            DVectorViewMut::from(&mut *vector_buffer),
                        );
                        output.axpy(T::one(), vector_buffer, T::one());
                    }
                    Ok(())
                },
            )
        })();
        result.wrap_err_with(|| {
            format!(
                "in assemble_element_vector, operator = {}, element type = {}",
                self.diff_op.name(),
                element.element_type()
            )
        })
    }
}
