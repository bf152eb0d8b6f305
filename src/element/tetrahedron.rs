use crate::element::{ElementType, FiniteElement, MatrixViewMut, ReferenceFiniteElement};
use crate::Real;
use itertools::Itertools;
use nalgebra::{distance, Matrix1x4, Matrix3, Matrix3x4, OPoint, Point3, Scalar, Vector3, U3};
use numeric_literals::replace_float_literals;

/// A finite element representing linear basis functions on a tetrahedron, in
/// three dimensions.
///
/// The reference element is the tetrahedron defined by the corners
/// (-1, -1, -1), (1, -1, -1), (-1, 1, -1), (-1, -1, 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tet4Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 4],
}

impl<T> Tet4Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point3<T>; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 4] {
        &self.vertices
    }
}

impl<T> Tet4Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(-1.0, 1.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point3<T>) -> Matrix1x4<T> {
        Matrix1x4::from_row_slice(&[
            -0.5 * (1.0 + xi.x + xi.y + xi.z),
            0.5 * (1.0 + xi.x),
            0.5 * (1.0 + xi.y),
            0.5 * (1.0 + xi.z),
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, _: &Point3<T>) -> Matrix3x4<T> {
        Matrix3x4::from_columns(&[
            Vector3::new(-0.5, -0.5, -0.5),
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(0.0, 0.0, 0.5),
        ])
    }
}

impl<T> ReferenceFiniteElement<T> for Tet4Element<T>
where
    T: Real,
{
    type ReferenceDim = U3;

    fn num_nodes(&self) -> usize {
        4
    }

    fn order(&self) -> usize {
        1
    }

    fn element_type(&self) -> ElementType {
        ElementType::Tetrahedron
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point3<T>) {
        basis_values.clone_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U3>, xi: &Point3<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }
}

impl<T> FiniteElement<T> for Tet4Element<T>
where
    T: Real,
{
    type GeometryDim = U3;

    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point3<T>) -> Matrix3<T> {
        let X: Matrix3x4<T> = Matrix3x4::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    fn map_reference_coords(&self, xi: &Point3<T>) -> Point3<T> {
        let X: Matrix3x4<T> = Matrix3x4::from_fn(|i, j| self.vertices[j][i]);
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
