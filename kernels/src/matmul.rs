use crate::{KernelElem, KernelError, Result};
use rayon::prelude::*;

fn check_len<T>(buf: &[T], expected: usize, dims: &[usize]) -> Result<()> {
    if buf.len() != expected {
        return Err(KernelError::ShapeMismatch {
            expected: dims.to_vec(),
            got: vec![buf.len()],
        });
    }
    Ok(())
}

/// Row-major 2D matrix multiplication: `(m,k) x (k,n) -> (m,n)`.
///
/// Parallelized over output rows. Zero-sized dimensions are legal and
/// produce a zero-filled (possibly empty) result.
pub fn matmul2d<T: KernelElem>(
    lhs: &[T],
    rhs: &[T],
    m: usize,
    k: usize,
    n: usize,
) -> Result<Vec<T>> {
    check_len(lhs, m * k, &[m, k])?;
    check_len(rhs, k * n, &[k, n])?;

    let mut out = vec![T::zero(); m * n];
    if m == 0 || n == 0 || k == 0 {
        return Ok(out);
    }

    out.par_chunks_mut(n).enumerate().for_each(|(i, out_row)| {
        let lhs_row = &lhs[i * k..(i + 1) * k];
        for (j, out_elem) in out_row.iter_mut().enumerate() {
            let mut sum = T::zero();
            for (p, &a) in lhs_row.iter().enumerate() {
                sum += a * rhs[p * n + j];
            }
            *out_elem = sum;
        }
    });
    Ok(out)
}

/// Gradient of `matmul2d` with respect to the left operand.
///
/// Computes `grad (m,n) x rhs^T (n,k) -> (m,k)` without materializing the
/// transpose: `out[i,p] = sum_j grad[i,j] * rhs[p,j]`. Reading `rhs` by rows
/// keeps the inner loop sequential over both buffers.
pub fn matmul2d_grad_lhs<T: KernelElem>(
    grad: &[T],
    rhs: &[T],
    m: usize,
    k: usize,
    n: usize,
) -> Result<Vec<T>> {
    check_len(grad, m * n, &[m, n])?;
    check_len(rhs, k * n, &[k, n])?;

    let mut out = vec![T::zero(); m * k];
    if m == 0 || k == 0 {
        return Ok(out);
    }

    out.par_chunks_mut(k).enumerate().for_each(|(i, out_row)| {
        let grad_row = &grad[i * n..(i + 1) * n];
        for (p, out_elem) in out_row.iter_mut().enumerate() {
            let rhs_row = &rhs[p * n..(p + 1) * n];
            let mut sum = T::zero();
            for (&g, &b) in grad_row.iter().zip(rhs_row.iter()) {
                sum += g * b;
            }
            *out_elem = sum;
        }
    });
    Ok(out)
}

/// Gradient of `matmul2d` with respect to the right operand.
///
/// Computes `lhs^T (k,m) x grad (m,n) -> (k,n)` without materializing the
/// transpose: `out[p,j] = sum_i lhs[i,p] * grad[i,j]`.
pub fn matmul2d_grad_rhs<T: KernelElem>(
    lhs: &[T],
    grad: &[T],
    m: usize,
    k: usize,
    n: usize,
) -> Result<Vec<T>> {
    check_len(lhs, m * k, &[m, k])?;
    check_len(grad, m * n, &[m, n])?;

    let mut out = vec![T::zero(); k * n];
    if k == 0 || n == 0 {
        return Ok(out);
    }

    out.par_chunks_mut(n).enumerate().for_each(|(p, out_row)| {
        for (j, out_elem) in out_row.iter_mut().enumerate() {
            let mut sum = T::zero();
            for i in 0..m {
                sum += lhs[i * k + p] * grad[i * n + j];
            }
            *out_elem = sum;
        }
    });
    Ok(out)
}
