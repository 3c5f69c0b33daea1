//! Closure-style differentiation helpers.
//!
//! These wrap the graph machinery for the common "gradient of a function at
//! a point" use: build a fresh tracked leaf, run the closure forward, run
//! backward with a ones seed, read the leaf's gradient.

use crate::tensor::{Result, Tensor, TensorElem};

/// Computes the gradient of `f` with respect to its input.
///
/// Returns a closure taking an input tensor and returning the gradient
/// tensor. If the output does not depend on the input, the gradient is
/// zeros.
///
/// # Example
///
/// ```rust
/// use tensorgrad::autograd::{functional::grad, multiply};
/// use tensorgrad::Tensor;
///
/// // f(x) = x^2, f'(3) = 6
/// let grad_square = grad(|x| multiply(Some(x), Some(x)));
/// let g = grad_square(Tensor::filled(&[1], 3.0_f32, true)).unwrap();
/// assert_eq!(g.to_vec(), vec![6.0]);
/// ```
pub fn grad<T, F>(f: F) -> impl Fn(Tensor<T>) -> Result<Tensor<T>>
where
    T: TensorElem,
    F: Fn(&Tensor<T>) -> Result<Tensor<T>>,
{
    move |x| {
        x.set_requires_grad(true);
        let y = f(&x)?;
        y.backward()?;
        Ok(match x.grad() {
            Some(g) => g,
            None => Tensor::zeros(&x.shape(), false),
        })
    }
}

/// Computes both the value and the gradient of `f` at the input.
pub fn value_and_grad<T, F>(f: F) -> impl Fn(Tensor<T>) -> Result<(Tensor<T>, Tensor<T>)>
where
    T: TensorElem,
    F: Fn(&Tensor<T>) -> Result<Tensor<T>>,
{
    move |x| {
        x.set_requires_grad(true);
        let y = f(&x)?;
        y.backward()?;
        let g = match x.grad() {
            Some(g) => g,
            None => Tensor::zeros(&x.shape(), false),
        };
        Ok((y, g))
    }
}
