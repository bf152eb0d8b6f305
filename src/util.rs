//! Small linear-algebra utilities shared by the assembly kernels.
use nalgebra::storage::StorageMut;
use nalgebra::{Dim, Matrix, Scalar};

/// Clones the upper triangle entries into the lower triangle entries.
///
/// The primary use case for this is to construct a full symmetric matrix from a
/// symmetric matrix represented only by its upper triangular entries.
pub fn clone_upper_to_lower<T, R, C, S>(matrix: &mut Matrix<T, R, C, S>)
where
    T: Scalar,
    R: Dim,
    C: Dim,
    S: StorageMut<T, R, C>,
{
    for j in 0..matrix.ncols() {
        for i in (j + 1)..matrix.nrows() {
            matrix[(i, j)] = matrix[(j, i)].clone();
        }
    }
}
