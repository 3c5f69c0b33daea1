use crate::{KernelElem, KernelError, Result};
use rayon::prelude::*;

fn check_len<T>(a: &[T], b: &[T]) -> Result<()> {
    if a.len() != b.len() {
        return Err(KernelError::ShapeMismatch {
            expected: vec![a.len()],
            got: vec![b.len()],
        });
    }
    Ok(())
}

/// Element-wise addition of two equally sized buffers.
pub fn elementwise_add<T: KernelElem>(a: &[T], b: &[T]) -> Result<Vec<T>> {
    check_len(a, b)?;
    let mut out = vec![T::zero(); a.len()];
    out.par_iter_mut()
        .zip(a.par_iter())
        .zip(b.par_iter())
        .for_each(|((o, x), y)| {
            *o = *x + *y;
        });
    Ok(out)
}

/// Element-wise (Hadamard) product of two equally sized buffers.
pub fn elementwise_multiply<T: KernelElem>(a: &[T], b: &[T]) -> Result<Vec<T>> {
    check_len(a, b)?;
    let mut out = vec![T::zero(); a.len()];
    out.par_iter_mut()
        .zip(a.par_iter())
        .zip(b.par_iter())
        .for_each(|((o, x), y)| {
            *o = *x * *y;
        });
    Ok(out)
}

/// In-place element-wise accumulation: `acc[i] += src[i]`.
///
/// This is the single kernel the gradient slots are built on, so it must
/// never overwrite: it only ever adds.
pub fn add_assign<T: KernelElem>(acc: &mut [T], src: &[T]) -> Result<()> {
    check_len(acc, src)?;
    acc.par_iter_mut().zip(src.par_iter()).for_each(|(a, s)| {
        *a += *s;
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KernelError;

    #[test]
    fn test_add() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![10.0, 20.0, 30.0];
        assert_eq!(elementwise_add(&a, &b).unwrap(), vec![11.0, 22.0, 33.0]);
    }

    #[test]
    fn test_multiply() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 5.0, 6.0];
        assert_eq!(
            elementwise_multiply(&a, &b).unwrap(),
            vec![4.0, 10.0, 18.0]
        );
    }

    #[test]
    fn test_add_assign_accumulates() {
        let mut acc = vec![1.0, 1.0];
        add_assign(&mut acc, &[2.0, 3.0]).unwrap();
        add_assign(&mut acc, &[2.0, 3.0]).unwrap();
        assert_eq!(acc, vec![5.0, 7.0]);
    }

    #[test]
    fn test_empty_buffers() {
        let a: Vec<f32> = vec![];
        let b: Vec<f32> = vec![];
        assert_eq!(elementwise_add(&a, &b).unwrap(), Vec::<f32>::new());
    }

    #[test]
    fn test_len_mismatch() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        let err = elementwise_add(&a, &b);
        assert!(matches!(err, Err(KernelError::ShapeMismatch { .. })));
    }
}
