//! Element-level assembly kernels and multigrid transfer operators for finite
//! element computations.
//!
//! The crate provides two subsystems:
//!
//! - [`assembly`]: generic element-level assembly of bilinear and linear forms of
//!   the type $\int (B v) : D (B u) \, dx$, where the differential operator ($B$)
//!   and the coefficient tensor ($D$) are supplied as composable type parameters.
//!   A linearized variant supports Newton-type iterations for nonlinear
//!   coefficient tensors.
//! - [`multigrid`]: grid-transfer (prolongation/restriction) operators that move
//!   vectors between consecutive refinement levels of a hierarchy, including
//!   sign-aware transfer for oriented edge degrees of freedom.
//!
//! Mesh data structures, concrete function spaces and global (sparse) assembly are
//! deliberately *not* part of this crate: they enter only through narrow query
//! traits ([`element::FiniteElement`], the hierarchy traits in [`multigrid`]), so
//! that the kernels can be embedded in any surrounding FEM infrastructure.

use nalgebra::{DimMin, DimName, RealField};

pub mod allocators;
pub mod assembly;
pub mod element;
pub mod geometry;
pub mod multigrid;
pub mod quadrature;
pub mod util;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

/// A small, fixed-size dimension.
///
/// Used as a trait alias for various traits frequently needed by generic routines
/// in this crate.
pub trait SmallDim: DimName + DimMin<Self, Output = Self> {}

impl<D> SmallDim for D where D: DimName + DimMin<Self, Output = Self> {}

/// Trait alias for real scalar types used throughout the crate.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// Symmetry classification of a coefficient tensor or assembled operator.
///
/// Assembly routines use this to decide whether only one triangle of an element
/// matrix needs to be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    Symmetric,
    NonSymmetric,
}
