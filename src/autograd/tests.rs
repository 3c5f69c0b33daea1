use crate::autograd::{accumulate, add, backward, matmul2d};
use crate::tensor::{Tensor, TensorError};

#[test]
fn test_accumulate_materializes_lazily() {
    let t = Tensor::<f32>::zeros(&[2], true);
    assert!(t.grad().is_none());

    let g = Tensor::<f32>::from_data(&[2], vec![1.0, 2.0], false).unwrap();
    accumulate(&t, &g).unwrap();
    assert_eq!(t.grad().unwrap().to_vec(), vec![1.0, 2.0]);

    // Second contribution adds, never overwrites.
    accumulate(&t, &g).unwrap();
    assert_eq!(t.grad().unwrap().to_vec(), vec![2.0, 4.0]);

    t.clear_grad();
    assert!(t.grad().is_none());
}

#[test]
fn test_accumulate_rejects_wrong_shape() {
    let t = Tensor::<f32>::zeros(&[2], true);
    let g = Tensor::<f32>::zeros(&[3], false);
    assert!(matches!(
        accumulate(&t, &g),
        Err(TensorError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_gradient_slot_is_untracked() {
    let a = Tensor::<f32>::ones(&[2], true);
    let b = Tensor::<f32>::ones(&[2], true);
    let c = add(Some(&a), Some(&b)).unwrap();

    c.backward().unwrap();
    let grad = a.grad().unwrap();
    assert!(!grad.requires_grad());
    assert!(grad.is_leaf());
}

#[test]
fn test_autograd_matmul_vector_case() {
    // A: [[1, 2]], B: [[3], [4]], C = A.B = [[11]]
    // dC/dA = B^T = [[3, 4]], dC/dB = A^T = [[1], [2]]
    let a = Tensor::<f32>::from_data(&[1, 2], vec![1.0, 2.0], true).unwrap();
    let b = Tensor::<f32>::from_data(&[2, 1], vec![3.0, 4.0], true).unwrap();

    let c = matmul2d(Some(&a), Some(&b)).unwrap();
    assert_eq!(c.to_vec(), vec![11.0]);

    c.backward().unwrap();
    assert_eq!(a.grad().unwrap().to_vec(), vec![3.0, 4.0]);
    assert_eq!(b.grad().unwrap().to_vec(), vec![1.0, 2.0]);
}

#[test]
fn test_explicit_upstream_gradient() {
    let a = Tensor::<f32>::from_data(&[2], vec![1.0, 2.0], true).unwrap();
    let b = Tensor::<f32>::from_data(&[2], vec![3.0, 4.0], true).unwrap();
    let c = add(Some(&a), Some(&b)).unwrap();

    let upstream = Tensor::<f32>::from_data(&[2], vec![10.0, 20.0], false).unwrap();
    backward(&c, &upstream).unwrap();

    assert_eq!(a.grad().unwrap().to_vec(), vec![10.0, 20.0]);
    assert_eq!(b.grad().unwrap().to_vec(), vec![10.0, 20.0]);
    assert_eq!(c.grad().unwrap().to_vec(), vec![10.0, 20.0]);
}
