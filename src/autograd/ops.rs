//! Graph nodes and operation dispatch.
//!
//! The dispatch functions [`add`], [`multiply`] and [`matmul2d`] validate
//! operands, compute the forward result through the kernel crate, decide
//! whether the result is gradient-tracked, and attach the matching node.
//! Operands are never mutated.
//!
//! Mul and MatMul nodes capture operand *values* at construction time, so a
//! later in-place edit of an operand does not change the gradients the node
//! produces. Gradients are taken against the value as of graph construction.

use std::ops::{Add, Mul};
use std::rc::Rc;

use tensorgrad_kernels as kernels;

use super::GradNode;
use crate::tensor::{Result, Tensor, TensorElem, TensorError};

// --- Add node ---

#[derive(Debug)]
struct AddNode<T: TensorElem> {
    inputs: [Tensor<T>; 2],
}

impl<T: TensorElem> AddNode<T> {
    fn new(a: Tensor<T>, b: Tensor<T>) -> Self {
        Self { inputs: [a, b] }
    }
}

impl<T: TensorElem> GradNode<T> for AddNode<T> {
    fn name(&self) -> &'static str {
        "AddNode"
    }

    fn inputs(&self) -> &[Tensor<T>] {
        &self.inputs
    }

    fn backward(&self, grad_output: &Tensor<T>) -> Result<Vec<Option<Tensor<T>>>> {
        // d(a+b)/da = 1 and d(a+b)/db = 1: each operand receives grad_output.
        Ok(self
            .inputs
            .iter()
            .map(|input| input.requires_grad().then(|| grad_output.clone()))
            .collect())
    }
}

// --- Mul node ---

#[derive(Debug)]
struct MulNode<T: TensorElem> {
    inputs: [Tensor<T>; 2],
    lhs_value: Vec<T>,
    rhs_value: Vec<T>,
    shape: Vec<usize>,
}

impl<T: TensorElem> MulNode<T> {
    fn new(a: Tensor<T>, b: Tensor<T>) -> Self {
        let lhs_value = a.to_vec();
        let rhs_value = b.to_vec();
        let shape = a.shape();
        Self {
            inputs: [a, b],
            lhs_value,
            rhs_value,
            shape,
        }
    }
}

impl<T: TensorElem> GradNode<T> for MulNode<T> {
    fn name(&self) -> &'static str {
        "MulNode"
    }

    fn inputs(&self) -> &[Tensor<T>] {
        &self.inputs
    }

    fn backward(&self, grad_output: &Tensor<T>) -> Result<Vec<Option<Tensor<T>>>> {
        let grad = grad_output.to_vec();
        let [a, b] = &self.inputs;

        // d(a*b)/da = b, so a receives grad_output (.) b, symmetrically for b.
        let ga = if a.requires_grad() {
            let values = kernels::elementwise_multiply(&grad, &self.rhs_value)?;
            Some(Tensor::from_data(&self.shape, values, false)?)
        } else {
            None
        };
        let gb = if b.requires_grad() {
            let values = kernels::elementwise_multiply(&grad, &self.lhs_value)?;
            Some(Tensor::from_data(&self.shape, values, false)?)
        } else {
            None
        };
        Ok(vec![ga, gb])
    }
}

// --- MatMul node ---

#[derive(Debug)]
struct MatMulNode<T: TensorElem> {
    inputs: [Tensor<T>; 2],
    lhs_value: Vec<T>,
    rhs_value: Vec<T>,
    m: usize,
    k: usize,
    n: usize,
}

impl<T: TensorElem> MatMulNode<T> {
    fn new(a: Tensor<T>, b: Tensor<T>, m: usize, k: usize, n: usize) -> Self {
        let lhs_value = a.to_vec();
        let rhs_value = b.to_vec();
        Self {
            inputs: [a, b],
            lhs_value,
            rhs_value,
            m,
            k,
            n,
        }
    }
}

impl<T: TensorElem> GradNode<T> for MatMulNode<T> {
    fn name(&self) -> &'static str {
        "MatMulNode"
    }

    fn inputs(&self) -> &[Tensor<T>] {
        &self.inputs
    }

    fn backward(&self, grad_output: &Tensor<T>) -> Result<Vec<Option<Tensor<T>>>> {
        let grad = grad_output.to_vec();
        let [a, b] = &self.inputs;

        // For C = A.B: grad_A = grad_C . B^T and grad_B = A^T . grad_C.
        let ga = if a.requires_grad() {
            let values =
                kernels::matmul2d_grad_lhs(&grad, &self.rhs_value, self.m, self.k, self.n)?;
            Some(Tensor::from_data(&[self.m, self.k], values, false)?)
        } else {
            None
        };
        let gb = if b.requires_grad() {
            let values =
                kernels::matmul2d_grad_rhs(&self.lhs_value, &grad, self.m, self.k, self.n)?;
            Some(Tensor::from_data(&[self.k, self.n], values, false)?)
        } else {
            None
        };
        Ok(vec![ga, gb])
    }
}

// --- Dispatch ---

fn require_operand<'a, T: TensorElem>(
    t: Option<&'a Tensor<T>>,
    op: &'static str,
) -> Result<&'a Tensor<T>> {
    t.ok_or(TensorError::NullOperand { op })
}

fn require_same_shape<T: TensorElem>(a: &Tensor<T>, b: &Tensor<T>) -> Result<Vec<usize>> {
    let expected = a.shape();
    let got = b.shape();
    if expected != got {
        return Err(TensorError::ShapeMismatch { expected, got });
    }
    Ok(expected)
}

fn require_rank2<T: TensorElem>(t: &Tensor<T>) -> Result<Vec<usize>> {
    let shape = t.shape();
    if shape.len() != 2 {
        return Err(TensorError::RankMismatch {
            expected: 2,
            got: shape.len(),
        });
    }
    Ok(shape)
}

/// Element-wise addition. Shapes must match exactly; there is no
/// broadcasting.
///
/// The result is gradient-tracked iff either operand is, and only then
/// carries a graph node.
///
/// # Errors
///
/// [`TensorError::NullOperand`] for an absent operand,
/// [`TensorError::ShapeMismatch`] for disagreeing shapes.
pub fn add<T: TensorElem>(a: Option<&Tensor<T>>, b: Option<&Tensor<T>>) -> Result<Tensor<T>> {
    let a = require_operand(a, "add")?;
    let b = require_operand(b, "add")?;
    let shape = require_same_shape(a, b)?;

    let data = {
        let lhs = a.raw();
        let rhs = b.raw();
        kernels::elementwise_add(&lhs.data, &rhs.data)?
    };

    let requires_grad = a.requires_grad() || b.requires_grad();
    let out = Tensor::from_data(&shape, data, requires_grad)?;
    if requires_grad {
        out.set_grad_fn(Rc::new(AddNode::new(a.clone(), b.clone())));
    }
    Ok(out)
}

/// Element-wise (Hadamard) multiplication. Same contract as [`add`].
pub fn multiply<T: TensorElem>(a: Option<&Tensor<T>>, b: Option<&Tensor<T>>) -> Result<Tensor<T>> {
    let a = require_operand(a, "multiply")?;
    let b = require_operand(b, "multiply")?;
    let shape = require_same_shape(a, b)?;

    let data = {
        let lhs = a.raw();
        let rhs = b.raw();
        kernels::elementwise_multiply(&lhs.data, &rhs.data)?
    };

    let requires_grad = a.requires_grad() || b.requires_grad();
    let out = Tensor::from_data(&shape, data, requires_grad)?;
    if requires_grad {
        out.set_grad_fn(Rc::new(MulNode::new(a.clone(), b.clone())));
    }
    Ok(out)
}

/// 2D matrix multiplication: `(m,k) x (k,n) -> (m,n)`.
///
/// # Errors
///
/// [`TensorError::NullOperand`] for an absent operand,
/// [`TensorError::RankMismatch`] if either operand is not rank 2,
/// [`TensorError::ShapeMismatch`] if the inner dimensions disagree.
pub fn matmul2d<T: TensorElem>(
    a: Option<&Tensor<T>>,
    b: Option<&Tensor<T>>,
) -> Result<Tensor<T>> {
    let a = require_operand(a, "matmul2d")?;
    let b = require_operand(b, "matmul2d")?;
    let a_shape = require_rank2(a)?;
    let b_shape = require_rank2(b)?;

    let (m, k) = (a_shape[0], a_shape[1]);
    let (k2, n) = (b_shape[0], b_shape[1]);
    if k != k2 {
        return Err(TensorError::ShapeMismatch {
            expected: a_shape,
            got: b_shape,
        });
    }

    let data = {
        let lhs = a.raw();
        let rhs = b.raw();
        kernels::matmul2d(&lhs.data, &rhs.data, m, k, n)?
    };

    let requires_grad = a.requires_grad() || b.requires_grad();
    let out = Tensor::from_data(&[m, n], data, requires_grad)?;
    if requires_grad {
        out.set_grad_fn(Rc::new(MatMulNode::new(a.clone(), b.clone(), m, k, n)));
    }
    Ok(out)
}

impl<T: TensorElem> Add for &Tensor<T> {
    type Output = Result<Tensor<T>>;

    fn add(self, rhs: Self) -> Self::Output {
        self::add(Some(self), Some(rhs))
    }
}

impl<T: TensorElem> Mul for &Tensor<T> {
    type Output = Result<Tensor<T>>;

    fn mul(self, rhs: Self) -> Self::Output {
        multiply(Some(self), Some(rhs))
    }
}

impl<T: TensorElem> Tensor<T> {
    /// 2D matrix multiplication, see [`matmul2d`].
    pub fn matmul(&self, rhs: &Tensor<T>) -> Result<Tensor<T>> {
        matmul2d(Some(self), Some(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_forward() {
        let a = Tensor::<f32>::filled(&[2, 3], 1.0, false);
        let b = Tensor::<f32>::filled(&[2, 3], 2.0, false);

        let c = add(Some(&a), Some(&b)).unwrap();
        assert_eq!(c.shape(), vec![2, 3]);
        assert_eq!(c.to_vec(), vec![3.0; 6]);
    }

    #[test]
    fn test_multiply_forward() {
        let a = Tensor::<f32>::from_data(&[2], vec![2.0, 3.0], false).unwrap();
        let b = Tensor::<f32>::from_data(&[2], vec![4.0, 5.0], false).unwrap();

        let c = (&a * &b).unwrap();
        assert_eq!(c.to_vec(), vec![8.0, 15.0]);
    }

    #[test]
    fn test_matmul_forward() {
        let a = Tensor::<f32>::from_data(&[2, 2], vec![1.0, 2.0, 3.0, 4.0], false).unwrap();
        let b = Tensor::<f32>::from_data(&[2, 2], vec![5.0, 6.0, 7.0, 8.0], false).unwrap();

        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape(), vec![2, 2]);
        assert_eq!(c.to_vec(), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_null_operand() {
        let b = Tensor::<f32>::ones(&[2], false);
        let err = add(None, Some(&b));
        assert!(matches!(err, Err(TensorError::NullOperand { op: "add" })));

        let err = matmul2d(Some(&b), None);
        assert!(matches!(
            err,
            Err(TensorError::NullOperand { op: "matmul2d" })
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Tensor::<f32>::ones(&[2, 3], false);
        let b = Tensor::<f32>::ones(&[3, 2], false);
        let err = add(Some(&a), Some(&b));
        assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_matmul_rank_and_inner_dim() {
        let vec2 = Tensor::<f32>::ones(&[2], false);
        let mat = Tensor::<f32>::ones(&[2, 2], false);
        let err = matmul2d(Some(&vec2), Some(&mat));
        assert!(matches!(
            err,
            Err(TensorError::RankMismatch { expected: 2, got: 1 })
        ));

        let a = Tensor::<f32>::ones(&[2, 3], false);
        let b = Tensor::<f32>::ones(&[4, 2], false);
        let err = matmul2d(Some(&a), Some(&b));
        assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_requires_grad_propagation() {
        let a = Tensor::<f32>::ones(&[2], true);
        let b = Tensor::<f32>::ones(&[2], false);

        let c = (&a + &b).unwrap();
        assert!(c.requires_grad());
        assert!(!c.is_leaf());
        assert_eq!(c.grad_fn().unwrap().name(), "AddNode");

        // Neither operand tracked: the result stays a plain leaf.
        let d = (&b + &b).unwrap();
        assert!(!d.requires_grad());
        assert!(d.is_leaf());
        assert!(d.grad_fn().is_none());
    }

    #[test]
    fn test_operands_not_mutated_and_idempotent() {
        let a = Tensor::<f32>::from_data(&[2], vec![1.0, 2.0], true).unwrap();
        let b = Tensor::<f32>::from_data(&[2], vec![3.0, 4.0], true).unwrap();

        let c1 = add(Some(&a), Some(&b)).unwrap();
        let c2 = add(Some(&a), Some(&b)).unwrap();

        assert_eq!(c1.to_vec(), c2.to_vec());
        assert_eq!(a.to_vec(), vec![1.0, 2.0]);
        assert_eq!(b.to_vec(), vec![3.0, 4.0]);
        assert!(a.is_leaf());
        assert!(b.is_leaf());
    }

    #[test]
    fn test_same_tensor_both_operands() {
        let a = Tensor::<f32>::from_data(&[2], vec![2.0, 3.0], true).unwrap();
        let c = (&a * &a).unwrap();
        assert_eq!(c.to_vec(), vec![4.0, 9.0]);
    }
}
