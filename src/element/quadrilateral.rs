use crate::element::{ElementType, FiniteElement, MatrixViewMut, ReferenceFiniteElement};
use crate::Real;
use itertools::Itertools;
use nalgebra::{distance, Matrix1x4, Matrix2, Matrix2x4, OPoint, Point2, Scalar, Vector2, U2};
use numeric_literals::replace_float_literals;

/// A finite element representing bilinear basis functions on a quadrilateral, in
/// two dimensions.
///
/// The reference element is the square [-1, 1]^2 with vertices in counterclockwise
/// order starting at (-1, -1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quad4d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 4],
}

impl<T> Quad4d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 4] {
        &self.vertices
    }
}

impl<T> Quad4d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x4<T> {
        let (x, y) = (xi.x, xi.y);
        Matrix1x4::from_row_slice(&[
            0.25 * (1.0 - x) * (1.0 - y),
            0.25 * (1.0 + x) * (1.0 - y),
            0.25 * (1.0 + x) * (1.0 + y),
            0.25 * (1.0 - x) * (1.0 + y),
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, xi: &Point2<T>) -> Matrix2x4<T> {
        let (x, y) = (xi.x, xi.y);
        Matrix2x4::from_columns(&[
            Vector2::new(-0.25 * (1.0 - y), -0.25 * (1.0 - x)),
            Vector2::new(0.25 * (1.0 - y), -0.25 * (1.0 + x)),
            Vector2::new(0.25 * (1.0 + y), 0.25 * (1.0 + x)),
            Vector2::new(-0.25 * (1.0 + y), 0.25 * (1.0 - x)),
        ])
    }
}

impl<T> ReferenceFiniteElement<T> for Quad4d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;

    fn num_nodes(&self) -> usize {
        4
    }

    fn order(&self) -> usize {
        1
    }

    fn element_type(&self) -> ElementType {
        ElementType::Quadrilateral
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        basis_values.clone_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U2>, xi: &Point2<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }
}

impl<T> FiniteElement<T> for Quad4d2Element<T>
where
    T: Real,
{
    type GeometryDim = U2;

    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point2<T>) -> Matrix2<T> {
        let X: Matrix2x4<T> = Matrix2x4::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        let X: Matrix2x4<T> = Matrix2x4::from_fn(|i, j| self.vertices[j][i]);
        let N = self.evaluate_basis(xi);
        OPoint::from(&X * &N.transpose())
    }

    fn diameter(&self) -> T {
        self.vertices
            .iter()
            .tuple_combinations()
            .map(|(x, y)| distance(x, y))
            .fold(T::zero(), |a, b| a.max(b))
    }
}
