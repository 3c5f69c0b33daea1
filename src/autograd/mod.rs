//! Reverse-mode automatic differentiation.
//!
//! `tensorgrad` records a computation graph dynamically while forward
//! operations run. Each operation that produces a gradient-tracked tensor
//! attaches a [`GradNode`] to its result: a record of the operand handles
//! and of the rule that turns a downstream gradient into per-operand
//! contributions. Calling [`crate::autograd::backward`] (or
//! [`Tensor::backward`]) walks the recorded graph from a root toward the
//! leaves and sums contributions into each tensor's gradient slot.
//!
//! # How it works
//!
//! 1. **Forward pass**: operations compute their result through the kernel
//!    crate, then attach a node holding shared references to the operands.
//!    Tensors created directly by the user have no node; they are the leaves
//!    of the graph.
//! 2. **Backward pass**: the engine orders every tensor reachable from the
//!    root so that all consumers of a tensor fire before the tensor itself,
//!    which makes the summed gradient of a value complete before it is
//!    propagated further. That ordering is what keeps diamond-shaped graphs
//!    correct.
//!
//! Gradient slots only ever accumulate. Two backward passes add up unless
//! [`Tensor::clear_grad`] is called in between.
//!
//! [`Tensor::backward`]: crate::tensor::Tensor::backward
//! [`Tensor::clear_grad`]: crate::tensor::Tensor::clear_grad

use std::fmt::Debug;

use crate::tensor::{Result, Tensor, TensorElem, TensorError};

pub mod engine;
pub mod functional;
pub mod ops;

#[cfg(test)]
mod tests;

pub use engine::backward;
pub use ops::{add, matmul2d, multiply};

/// A record of one forward operation in the computation graph.
///
/// A node owns nothing beyond its captured operand references and the values
/// it needs for its local derivative; it is stateless with respect to the
/// forward output.
pub trait GradNode<T: TensorElem>: Debug {
    /// Diagnostic tag for the operation this node records.
    fn name(&self) -> &'static str;

    /// Operand handles captured at construction time. The backward traversal
    /// walks these edges toward the leaves.
    fn inputs(&self) -> &[Tensor<T>];

    /// Computes the local gradient contribution for each operand, given the
    /// gradient flowing in from downstream. Returns one entry per input,
    /// `None` for operands that do not require gradients.
    fn backward(&self, grad_output: &Tensor<T>) -> Result<Vec<Option<Tensor<T>>>>;
}

/// Accumulates `contribution` into `target`'s gradient slot.
///
/// The slot is materialized as a zero-filled, untracked tensor of the
/// owning tensor's shape on first use, then element-wise added into. It is
/// never overwritten: repeated calls keep summing, including across
/// independent backward passes, until [`Tensor::clear_grad`] resets it.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the contribution's shape
/// differs from the owning tensor's shape.
///
/// [`Tensor::clear_grad`]: crate::tensor::Tensor::clear_grad
pub fn accumulate<T: TensorElem>(target: &Tensor<T>, contribution: &Tensor<T>) -> Result<()> {
    let shape = target.shape();
    let got = contribution.shape();
    if got != shape {
        return Err(TensorError::ShapeMismatch {
            expected: shape,
            got,
        });
    }

    // Snapshot before borrowing the target: the contribution may alias it.
    let values = contribution.to_vec();
    let slot = {
        let mut inner = target.raw_mut();
        inner
            .grad
            .get_or_insert_with(|| Tensor::zeros(&shape, false))
            .clone()
    };
    slot.add_assign_values(&values)
}
