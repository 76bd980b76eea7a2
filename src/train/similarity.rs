//! Pairwise similarity matrix over embedding rows

use crate::autograd::ops::{matmul_compute, transpose};
use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Compute the gram matrix S = E·Eᵀ of a rows×dim embedding matrix.
///
/// For L2-normalized rows every entry is a cosine similarity in [-1, 1] and
/// the diagonal is 1. The product accumulates in f64.
///
/// Backward: for upstream gradient G, dL/dE = (G + Gᵀ)·E.
pub fn gram(embeddings: &Tensor, rows: usize, dim: usize) -> Tensor {
    assert_eq!(embeddings.len(), rows * dim, "embedding size mismatch");

    let result_data = {
        let e_data = embeddings.data();
        let e = e_data.as_slice().expect("embeddings must be contiguous");
        let e_t = transpose(e, rows, dim);
        matmul_compute(e, &e_t, rows, dim, rows)
    };

    let requires_grad = embeddings.requires_grad();
    let mut result = Tensor::new(Array1::from(result_data), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(GramBackward {
            embeddings: embeddings.clone(),
            rows,
            dim,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct GramBackward {
    embeddings: Tensor,
    rows: usize,
    dim: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for GramBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            if self.embeddings.requires_grad() {
                let grad_e = {
                    let g = grad_output.as_slice().expect("gradient must be contiguous");

                    // S appears twice in E·Eᵀ, so both G and Gᵀ flow back.
                    let mut g_sym = transpose(g, self.rows, self.rows);
                    for (sym, &gi) in g_sym.iter_mut().zip(g.iter()) {
                        *sym += gi;
                    }

                    let e_data = self.embeddings.data();
                    let e = e_data.as_slice().expect("embeddings must be contiguous");
                    matmul_compute(&g_sym, e, self.rows, self.rows, self.dim)
                };
                self.embeddings.accumulate_grad(Array1::from(grad_e));
            }
            if let Some(op) = self.embeddings.backward_op() {
                op.backward();
            }
        }
    }
}
