//! Core tensor implementation.
//!
//! This module defines [`Tensor`], the central data structure in
//! `tensorgrad`: a dense, row-major n-dimensional array together with the
//! autograd state the graph machinery needs (a `requires_grad` flag, a
//! lazily materialized gradient slot and an optional link to the graph node
//! that produced it).
//!
//! # Key Components
//!
//! - [`Tensor`]: a cheaply cloneable shared handle to the tensor record.
//! - [`TensorError`]: error type for tensor and graph operations.
//! - [`TensorElem`]: trait bound for elements that can be stored in a tensor.
//!
//! # Ownership
//!
//! A single tensor is commonly owned by several parties at once: the user
//! handle, the graph nodes that captured it as an operand, and a gradient
//! slot. `Tensor` is therefore a reference-counted handle; [`Tensor::clone`]
//! copies the handle, not the storage.
//!
//! # Examples
//!
//! ```rust
//! use tensorgrad::Tensor;
//!
//! let t = Tensor::from_data(&[2, 3], vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0], false).unwrap();
//! assert_eq!(t.shape(), vec![2, 3]);
//! assert_eq!(t.at(&[1, 2]).unwrap(), 6.0);
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use num_traits::{One, Zero};
use tensorgrad_kernels::{self as kernels, KernelElem, KernelError};
use thiserror::Error;

use crate::autograd::GradNode;

pub mod display;

/// Error type for tensor and graph operations.
///
/// Every variant is a programmer-error condition detected synchronously at
/// the point of violation; nothing here is transient or retried.
#[derive(Error, Debug)]
pub enum TensorError {
    #[error("{op}: operand tensor is absent")]
    NullOperand { op: &'static str },

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("rank mismatch: expected {expected} dimensions, got {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("index {index:?} out of range for shape {shape:?}")]
    OutOfRange {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("data length {len} does not match shape {shape:?} ({expected} elements)")]
    DataSizeMismatch {
        len: usize,
        expected: usize,
        shape: Vec<usize>,
    },
}

pub type Result<T> = std::result::Result<T, TensorError>;

impl From<KernelError> for TensorError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::ShapeMismatch { expected, got } => {
                TensorError::ShapeMismatch { expected, got }
            }
        }
    }
}

/// Trait bound for elements that can be stored in a tensor.
///
/// Inherits the kernel crate's numeric bounds; `'static` is required because
/// graph nodes hold type-erased references to their operands.
pub trait TensorElem: KernelElem + 'static {}

impl<T> TensorElem for T where T: KernelElem + 'static {}

/// Number of elements implied by a shape.
///
/// The product of the empty shape is taken to be 0, not 1: a rank-0 tensor
/// holds no elements. Scalars are represented as shape `[1]`.
pub(crate) fn numel_of(shape: &[usize]) -> usize {
    if shape.is_empty() {
        0
    } else {
        shape.iter().product()
    }
}

/// Computes row-major strides for a shape.
///
/// `strides[last] == 1` and `strides[i] == strides[i + 1] * shape[i + 1]`.
/// Strides are derived state: they are recomputed whenever a shape is set
/// and never mutated independently.
fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// The shared tensor record behind a [`Tensor`] handle.
pub(crate) struct TensorData<T: TensorElem> {
    pub(crate) data: Vec<T>,
    pub(crate) shape: Vec<usize>,
    pub(crate) strides: Vec<usize>,
    pub(crate) requires_grad: bool,
    pub(crate) grad: Option<Tensor<T>>,
    pub(crate) grad_fn: Option<Rc<dyn GradNode<T>>>,
}

impl<T: TensorElem> TensorData<T> {
    fn offset(&self, indices: &[usize]) -> Result<usize> {
        if indices.len() != self.shape.len() {
            return Err(TensorError::RankMismatch {
                expected: self.shape.len(),
                got: indices.len(),
            });
        }
        let mut off = 0;
        for (axis, (&idx, &dim)) in indices.iter().zip(self.shape.iter()).enumerate() {
            if idx >= dim {
                return Err(TensorError::OutOfRange {
                    index: indices.to_vec(),
                    shape: self.shape.clone(),
                });
            }
            off += idx * self.strides[axis];
        }
        Ok(off)
    }
}

/// A dense n-dimensional tensor tracked by the autograd graph.
///
/// The handle is reference counted: cloning it aliases the same storage,
/// gradient slot and graph link, mirroring how a value can simultaneously be
/// a user variable and an operand captured by a node.
pub struct Tensor<T: TensorElem> {
    inner: Rc<RefCell<TensorData<T>>>,
}

impl<T: TensorElem> Clone for Tensor<T> {
    /// Clones the handle. Both handles refer to the same tensor record.
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: TensorElem> Tensor<T> {
    fn from_parts(shape: Vec<usize>, data: Vec<T>, requires_grad: bool) -> Self {
        let strides = compute_strides(&shape);
        Self {
            inner: Rc::new(RefCell::new(TensorData {
                data,
                shape,
                strides,
                requires_grad,
                grad: None,
                grad_fn: None,
            })),
        }
    }

    /// Creates a tensor of the given shape with every element set to `value`.
    pub fn filled(shape: &[usize], value: T, requires_grad: bool) -> Self {
        let data = vec![value; numel_of(shape)];
        Self::from_parts(shape.to_vec(), data, requires_grad)
    }

    /// Creates a tensor filled with zeros.
    pub fn zeros(shape: &[usize], requires_grad: bool) -> Self {
        Self::filled(shape, T::zero(), requires_grad)
    }

    /// Creates a tensor filled with ones.
    pub fn ones(shape: &[usize], requires_grad: bool) -> Self {
        Self::filled(shape, T::one(), requires_grad)
    }

    /// Creates a tensor from an explicit flat buffer in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::DataSizeMismatch`] if `data.len()` differs from
    /// the element count implied by `shape`.
    pub fn from_data(shape: &[usize], data: Vec<T>, requires_grad: bool) -> Result<Self> {
        let expected = numel_of(shape);
        if data.len() != expected {
            return Err(TensorError::DataSizeMismatch {
                len: data.len(),
                expected,
                shape: shape.to_vec(),
            });
        }
        Ok(Self::from_parts(shape.to_vec(), data, requires_grad))
    }

    /// Returns the shape.
    pub fn shape(&self) -> Vec<usize> {
        self.inner.borrow().shape.clone()
    }

    /// Returns the row-major strides.
    pub fn strides(&self) -> Vec<usize> {
        self.inner.borrow().strides.clone()
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.inner.borrow().shape.len()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.inner.borrow().data.len()
    }

    /// Copies the flat buffer out.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.borrow().data.clone()
    }

    /// Reads one element by flat offset.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::OutOfRange`] if `index >= numel`.
    pub fn get(&self, index: usize) -> Result<T> {
        let inner = self.inner.borrow();
        inner
            .data
            .get(index)
            .copied()
            .ok_or_else(|| TensorError::OutOfRange {
                index: vec![index],
                shape: inner.shape.clone(),
            })
    }

    /// Writes one element by flat offset.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if index >= inner.data.len() {
            return Err(TensorError::OutOfRange {
                index: vec![index],
                shape: inner.shape.clone(),
            });
        }
        inner.data[index] = value;
        Ok(())
    }

    /// Reads one element by multi-index, one component per dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::RankMismatch`] if the index arity differs from
    /// the tensor's rank, and [`TensorError::OutOfRange`] if any component
    /// exceeds its dimension.
    pub fn at(&self, indices: &[usize]) -> Result<T> {
        let inner = self.inner.borrow();
        let off = inner.offset(indices)?;
        Ok(inner.data[off])
    }

    /// Writes one element by multi-index.
    pub fn set_at(&self, indices: &[usize], value: T) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let off = inner.offset(indices)?;
        inner.data[off] = value;
        Ok(())
    }

    /// Overwrites every element with `value`.
    pub fn fill(&self, value: T) {
        self.inner.borrow_mut().data.fill(value);
    }

    /// Whether autograd tracks this tensor.
    pub fn requires_grad(&self) -> bool {
        self.inner.borrow().requires_grad
    }

    pub fn set_requires_grad(&self, flag: bool) {
        self.inner.borrow_mut().requires_grad = flag;
    }

    /// The accumulated gradient, if any backward pass has reached this tensor.
    pub fn grad(&self) -> Option<Tensor<T>> {
        self.inner.borrow().grad.clone()
    }

    /// Empties the gradient slot. The next accumulation starts from zeros.
    pub fn clear_grad(&self) {
        self.inner.borrow_mut().grad = None;
    }

    /// The graph node that produced this tensor, if any.
    pub fn grad_fn(&self) -> Option<Rc<dyn GradNode<T>>> {
        self.inner.borrow().grad_fn.clone()
    }

    /// A tensor is a leaf iff no graph node produced it.
    pub fn is_leaf(&self) -> bool {
        self.inner.borrow().grad_fn.is_none()
    }

    pub(crate) fn raw(&self) -> Ref<'_, TensorData<T>> {
        self.inner.borrow()
    }

    pub(crate) fn raw_mut(&self) -> RefMut<'_, TensorData<T>> {
        self.inner.borrow_mut()
    }

    /// Stable identity of the shared record, used by the backward traversal
    /// to deduplicate visits.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    pub(crate) fn set_grad_fn(&self, node: Rc<dyn GradNode<T>>) {
        self.inner.borrow_mut().grad_fn = Some(node);
    }

    /// Adds `values` into the flat buffer element-wise.
    pub(crate) fn add_assign_values(&self, values: &[T]) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        kernels::add_assign(&mut inner.data, values)?;
        Ok(())
    }
}

impl<T: TensorElem> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Tensor")
            .field("shape", &inner.shape)
            .field("requires_grad", &inner.requires_grad)
            .field("numel", &inner.data.len())
            .finish()
    }
}
