use crate::element::{ElementType, FiniteElement, MatrixViewMut, ReferenceFiniteElement};
use crate::Real;
use nalgebra::{distance, Matrix1, Matrix1x2, OPoint, Point1, Scalar, U1};
use numeric_literals::replace_float_literals;

/// A finite element representing linear basis functions on the reference
/// interval [-1, 1].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Segment2d1Element<T>
where
    T: Scalar,
{
    vertices: [Point1<T>; 2],
}

impl<T> Segment2d1Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point1<T>; 2]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point1<T>; 2] {
        &self.vertices
    }
}

impl<T> Segment2d1Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([Point1::new(-1.0), Point1::new(1.0)])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point1<T>) -> Matrix1x2<T> {
        Matrix1x2::from_row_slice(&[
            0.5 - 0.5 * xi.x,
            0.5 + 0.5 * xi.x,
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, _: &Point1<T>) -> Matrix1x2<T> {
        Matrix1x2::from_row_slice(&[-0.5, 0.5])
    }
}

impl<T> ReferenceFiniteElement<T> for Segment2d1Element<T>
where
    T: Real,
{
    type ReferenceDim = U1;

    fn num_nodes(&self) -> usize {
        2
    }

    fn order(&self) -> usize {
        1
    }

    fn element_type(&self) -> ElementType {
        ElementType::Segment
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point1<T>) {
        basis_values.clone_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U1>, xi: &Point1<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }
}

impl<T> FiniteElement<T> for Segment2d1Element<T>
where
    T: Real,
{
    type GeometryDim = U1;

    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point1<T>) -> Matrix1<T> {
        let X: Matrix1x2<T> = Matrix1x2::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    fn map_reference_coords(&self, xi: &Point1<T>) -> Point1<T> {
        let X: Matrix1x2<T> = Matrix1x2::from_fn(|i, j| self.vertices[j][i]);
        let N = self.evaluate_basis(xi);
        OPoint::from(&X * &N.transpose())
    }

    fn diameter(&self) -> T {
        distance(&self.vertices[0], &self.vertices[1])
    }
}
