//! # tensorgrad
//!
//! `tensorgrad` is a small, pure Rust tensor library with reverse-mode
//! automatic differentiation: dense n-dimensional arrays plus a dynamically
//! built computation graph that records how each derived tensor was
//! produced, so gradients can be computed by a backward traversal.
//!
//! ## Modules
//!
//! - [`mod@tensor`]: the dense [`Tensor`] type, indexing and errors.
//! - [`autograd`]: graph nodes, operation dispatch and the backward engine.
//!
//! The numeric kernels live in the sibling `tensorgrad-kernels` crate and
//! operate on raw buffers; this crate holds the data model and the graph.
//!
//! ## Example
//!
//! ```rust
//! use tensorgrad::Tensor;
//!
//! let a = Tensor::from_data(&[2, 2], vec![1.0_f32, 2.0, 3.0, 4.0], true).unwrap();
//! let b = Tensor::from_data(&[2, 2], vec![5.0_f32, 6.0, 7.0, 8.0], true).unwrap();
//!
//! let c = a.matmul(&b).unwrap();
//! assert_eq!(c.to_vec(), vec![19.0, 22.0, 43.0, 50.0]);
//!
//! c.backward().unwrap();
//! assert_eq!(a.grad().unwrap().to_vec(), vec![11.0, 15.0, 11.0, 15.0]);
//! assert_eq!(b.grad().unwrap().to_vec(), vec![4.0, 4.0, 6.0, 6.0]);
//! ```

/// Macro for creating an untracked tensor with compile-time size checking.
///
/// The data length and the shape product are both constant-evaluated, so a
/// mismatch is a compile error rather than a runtime one.
///
/// # Examples
///
/// ```rust
/// use tensorgrad::tensor;
///
/// let t = tensor!([1.0_f32, 2.0, 3.0, 4.0], [2, 2]);
/// assert_eq!(t.shape(), vec![2, 2]);
///
/// // Fails to compile:
/// // let t = tensor!([1.0, 2.0, 3.0], [2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ($data:expr, $shape:expr) => {{
        const DATA_LEN: usize = $data.len();
        const SHAPE: [usize; $shape.len()] = $shape;
        const EXPECTED_SIZE: usize = {
            // The empty shape holds no elements; see `Tensor::numel`.
            if SHAPE.len() == 0 {
                0
            } else {
                let mut size = 1;
                let mut i = 0;
                while i < SHAPE.len() {
                    size *= SHAPE[i];
                    i += 1;
                }
                size
            }
        };

        // This assertion triggers a compile-time error if false
        const _: () = assert!(
            DATA_LEN == EXPECTED_SIZE,
            "tensor! data length does not match shape product"
        );

        // Safe to unwrap because the sizes were checked at compile time
        $crate::tensor::Tensor::from_data(&SHAPE, $data.to_vec(), false).unwrap()
    }};
}

pub mod autograd;
pub mod tensor;

pub use autograd::{accumulate, add, backward, matmul2d, multiply, GradNode};
pub use tensor::{Tensor, TensorElem, TensorError};
