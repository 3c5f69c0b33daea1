//! Pure CPU kernels for `tensorgrad`.
//!
//! These functions do the actual number crunching on raw contiguous buffers.
//! They are separated from the tensor and graph types so the core crate stays
//! free of numeric loops and the kernels can be swapped for optimized
//! libraries (BLAS and friends) without touching the graph machinery.
//!
//! All kernels are side-effect-free with respect to their inputs: the only
//! buffer ever written is the one being produced (or, for [`add_assign`],
//! the accumulator passed in for that purpose).

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod elementwise;
pub mod matmul;

pub use elementwise::{add_assign, elementwise_add, elementwise_multiply};
pub use matmul::{matmul2d, matmul2d_grad_lhs, matmul2d_grad_rhs};

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Trait bound for elements that can be processed by kernels.
/// This mirrors `TensorElem` in the main crate to avoid circular dependencies.
pub trait KernelElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> KernelElem for T where
    T: Num
        + NumAssign
        + Copy
        + Clone
        + Debug
        + Send
        + Sync
        + FromPrimitive
        + ToPrimitive
        + PartialOrd
{
}
