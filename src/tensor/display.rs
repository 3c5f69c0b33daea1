//! Human-readable rendering of tensors.
//!
//! Diagnostics only: the output shows the shape and the values (nested for
//! rank 1 and 2, flat otherwise) and is not a stable format. Never compare
//! tensors through their rendered form; use [`Tensor::to_vec`] instead.

use std::fmt;

use super::{Tensor, TensorElem};

fn write_row<T: fmt::Debug>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{:?}", v)?;
    }
    write!(f, "]")
}

impl<T: TensorElem> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.raw();

        write!(f, "Tensor(shape=[")?;
        for (i, dim) in inner.shape.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        writeln!(f, "], requires_grad={}):", inner.requires_grad)?;

        match inner.shape.len() {
            2 => {
                let rows = inner.shape[0];
                let cols = inner.shape[1];
                write!(f, "[")?;
                for r in 0..rows {
                    if r > 0 {
                        write!(f, ",\n ")?;
                    }
                    write_row(f, &inner.data[r * cols..(r + 1) * cols])?;
                }
                write!(f, "]")
            }
            // Rank 1 and everything else render as a flat list.
            _ => write_row(f, &inner.data),
        }
    }
}
