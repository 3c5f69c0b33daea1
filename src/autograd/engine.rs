//! Backward driver.
//!
//! Walks the graph reachable from a root tensor in reverse topological
//! order and accumulates gradient contributions into every operand's slot.
//! The traversal uses an explicit stack, so arbitrarily deep graphs do not
//! overflow the call stack.

use std::collections::{HashMap, HashSet};

use super::accumulate;
use crate::tensor::{Result, Tensor, TensorElem, TensorError};

enum Visit<T: TensorElem> {
    Enter(Tensor<T>),
    Exit(Tensor<T>),
}

/// Tensors reachable from `root` through `grad_fn` edges, in DFS post
/// order. Iterated in reverse, every consumer of a tensor comes before the
/// tensor itself, so a tensor's summed gradient is complete before its own
/// node fires. That ordering is what makes diamond-shaped graphs correct.
fn topo_order<T: TensorElem>(root: &Tensor<T>) -> Vec<Tensor<T>> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![Visit::Enter(root.clone())];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(tensor) => {
                if !visited.insert(tensor.id()) {
                    continue;
                }
                let node = tensor.grad_fn();
                stack.push(Visit::Exit(tensor));
                if let Some(node) = node {
                    for input in node.inputs() {
                        if !visited.contains(&input.id()) {
                            stack.push(Visit::Enter(input.clone()));
                        }
                    }
                }
            }
            Visit::Exit(tensor) => order.push(tensor),
        }
    }
    order
}

/// Propagates `grad_output` backward from `root`.
///
/// The upstream gradient is accumulated into `root`'s slot; if `root` is a
/// leaf that is the entire effect. Otherwise every node reachable from
/// `root` fires exactly once, in reverse topological order, and each
/// contribution it produces is summed into the receiving operand's slot.
///
/// Each node receives the gradient collected for its output *during this
/// pass*. Propagating from the persistent slots instead would re-send the
/// residue of earlier passes, so repeated backward calls sum instead of
/// compounding.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if `grad_output`'s shape differs
/// from `root`'s shape.
pub fn backward<T: TensorElem>(root: &Tensor<T>, grad_output: &Tensor<T>) -> Result<()> {
    let root_shape = root.shape();
    let grad_shape = grad_output.shape();
    if grad_shape != root_shape {
        return Err(TensorError::ShapeMismatch {
            expected: root_shape,
            got: grad_shape,
        });
    }

    accumulate(root, grad_output)?;

    // Pass-local upstream gradients, keyed by tensor identity.
    let mut pending: HashMap<usize, Tensor<T>> = HashMap::new();
    pending.insert(
        root.id(),
        Tensor::from_data(&root_shape, grad_output.to_vec(), false)?,
    );

    let order = topo_order(root);
    log::debug!(
        "backward: visiting {} tensors from root of shape {:?}",
        order.len(),
        root_shape
    );

    for tensor in order.iter().rev() {
        let Some(node) = tensor.grad_fn() else { continue };
        let Some(upstream) = pending.get(&tensor.id()).cloned() else {
            continue;
        };

        log::trace!("backward: firing {}", node.name());
        let contributions = node.backward(&upstream)?;
        let inputs = node.inputs();
        debug_assert_eq!(contributions.len(), inputs.len());

        for (input, contribution) in inputs.iter().zip(contributions) {
            let Some(contribution) = contribution else {
                continue;
            };
            accumulate(input, &contribution)?;
            let slot = pending
                .entry(input.id())
                .or_insert_with(|| Tensor::zeros(&input.shape(), false))
                .clone();
            slot.add_assign_values(&contribution.to_vec())?;
        }
    }
    Ok(())
}

impl<T: TensorElem> Tensor<T> {
    /// Runs a backward pass from this tensor seeded with a ones gradient,
    /// the usual seed for a scalar loss.
    pub fn backward(&self) -> Result<()> {
        let seed = Tensor::ones(&self.shape(), false);
        backward(self, &seed)
    }
}
