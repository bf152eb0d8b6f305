//! Element-level assembly of bilinear and linear forms.
//!
//! The central abstraction is the factorization of a bilinear form
//! $a(u, v) = \int (B v) : D (B u) \, dx$ into a differential operator $B$
//! ([`operators::DifferentialOperator`]) and a coefficient tensor $D$
//! ([`dmat::CoefficientTensor`]). [`bdb::BdbAssembler`] fuses the two with a
//! quadrature rule into dense element matrices and matrix-free element operators,
//! including a linearized variant for Newton-type iterations;
//! [`source::ElementSourceAssembler`] assembles the corresponding linear forms
//! $\int (B v) \cdot d \, dx$.

pub mod bdb;
pub mod buffers;
pub mod dmat;
pub mod operators;
pub mod source;

pub use bdb::*;
pub use buffers::*;
pub use dmat::*;
pub use operators::*;
pub use source::*;
