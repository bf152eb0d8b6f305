use crate::element::{ElementType, FiniteElement, MatrixViewMut, ReferenceFiniteElement};
use crate::Real;
use itertools::Itertools;
use nalgebra::{
    distance, Matrix1x3, Matrix1x6, Matrix2, Matrix2x3, Matrix2x6, OPoint, Point2, Scalar, Vector2, U2,
};
use numeric_literals::replace_float_literals;

/// A finite element representing linear basis functions on a triangle, in two
/// dimensions.
///
/// The reference element is chosen to be the triangle defined by the corners
/// (-1, -1), (1, -1), (-1, 1). This perhaps unorthodox choice is due to the
/// quadrature rules we employ.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri3d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 3],
}

impl<T> Tri3d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 3] {
        &self.vertices
    }
}

impl<T> Tri3d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(-1.0, 1.0),
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x3<T> {
        Matrix1x3::from_row_slice(&[
            -0.5 * xi.x - 0.5 * xi.y,
            0.5 * xi.x + 0.5,
            0.5 * xi.y + 0.5,
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, _: &Point2<T>) -> Matrix2x3<T> {
        Matrix2x3::from_columns(&[
            Vector2::new(-0.5, -0.5),
            Vector2::new(0.5, 0.0),
            Vector2::new(0.0, 0.5),
        ])
    }
}

impl<T> ReferenceFiniteElement<T> for Tri3d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;

    fn num_nodes(&self) -> usize {
        3
    }

    fn order(&self) -> usize {
        1
    }

    fn element_type(&self) -> ElementType {
        ElementType::Triangle
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        basis_values.clone_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U2>, xi: &Point2<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }
}

impl<T> FiniteElement<T> for Tri3d2Element<T>
where
    T: Real,
{
    type GeometryDim = U2;

    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point2<T>) -> Matrix2<T> {
        let X: Matrix2x3<T> = Matrix2x3::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        let X: Matrix2x3<T> = Matrix2x3::from_fn(|i, j| self.vertices[j][i]);
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

/// A finite element representing quadratic basis functions on a triangle, in two
/// dimensions.
///
/// The reference element is chosen to be the triangle defined by the corners
/// (-1, -1), (1, -1), (-1, 1). Nodes 3, 4 and 5 are the midpoints of the edges
/// (0, 1), (1, 2) and (2, 0), respectively.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri6d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 6],
}

impl<T> Tri6d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 6]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 6] {
        &self.vertices
    }
}

impl<'a, T> From<&'a Tri3d2Element<T>> for Tri6d2Element<T>
where
    T: Real,
{
    fn from(tri3: &'a Tri3d2Element<T>) -> Self {
        let v = tri3.vertices();
        let midpoint = |a: &Point2<T>, b: &Point2<T>| Point2::from((a.coords + b.coords) * T::from_f64(0.5).expect("Literal must fit in T"));
        Self::from_vertices([
            v[0],
            v[1],
            v[2],
            midpoint(&v[0], &v[1]),
            midpoint(&v[1], &v[2]),
            midpoint(&v[2], &v[0]),
        ])
    }
}

impl<T> Tri6d2Element<T>
where
    T: Real,
{
    pub fn reference() -> Self {
        Self::from(&Tri3d2Element::reference())
    }

    /// Barycentric coordinates of the reference triangle and their (constant)
    /// reference gradients.
    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn barycentric(&self, xi: &Point2<T>) -> [T; 3] {
        [
            -0.5 * xi.x - 0.5 * xi.y,
            0.5 * xi.x + 0.5,
            0.5 * xi.y + 0.5,
        ]
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn barycentric_gradients(&self) -> [Vector2<T>; 3] {
        [
            Vector2::new(-0.5, -0.5),
            Vector2::new(0.5, 0.0),
            Vector2::new(0.0, 0.5),
        ]
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x6<T> {
        let [l0, l1, l2] = self.barycentric(xi);
        Matrix1x6::from_row_slice(&[
            l0 * (2.0 * l0 - 1.0),
            l1 * (2.0 * l1 - 1.0),
            l2 * (2.0 * l2 - 1.0),
            4.0 * l0 * l1,
            4.0 * l1 * l2,
            4.0 * l2 * l0,
        ])
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, xi: &Point2<T>) -> Matrix2x6<T> {
        let [l0, l1, l2] = self.barycentric(xi);
        let [g0, g1, g2] = self.barycentric_gradients();
        Matrix2x6::from_columns(&[
            g0 * (4.0 * l0 - 1.0),
            g1 * (4.0 * l1 - 1.0),
            g2 * (4.0 * l2 - 1.0),
            (g0 * l1 + g1 * l0) * 4.0,
            (g1 * l2 + g2 * l1) * 4.0,
            (g2 * l0 + g0 * l2) * 4.0,
        ])
    }
}

impl<T> ReferenceFiniteElement<T> for Tri6d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;

    fn num_nodes(&self) -> usize {
        6
    }

    fn order(&self) -> usize {
        2
    }

    fn element_type(&self) -> ElementType {
        ElementType::Triangle
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        basis_values.clone_from_slice(self.evaluate_basis(xi).as_slice());
    }

    fn populate_basis_gradients(&self, mut basis_gradients: MatrixViewMut<T, U2>, xi: &Point2<T>) {
        basis_gradients.copy_from(&self.gradients(xi));
    }
}

impl<T> FiniteElement<T> for Tri6d2Element<T>
where
    T: Real,
{
    type GeometryDim = U2;

    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point2<T>) -> Matrix2<T> {
        let X: Matrix2x6<T> = Matrix2x6::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        let X: Matrix2x6<T> = Matrix2x6::from_fn(|i, j| self.vertices[j][i]);
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
