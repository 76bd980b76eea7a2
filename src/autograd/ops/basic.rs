//! Basic autograd operations

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Add a bias row vector to every row of a flattened matrix.
///
/// `x` is rows×cols flattened; `bias` has length cols.
pub fn add_bias(x: &Tensor, bias: &Tensor, rows: usize, cols: usize) -> Tensor {
    assert_eq!(x.len(), rows * cols, "input size mismatch");
    assert_eq!(bias.len(), cols, "bias size mismatch");

    let data = {
        let x_data = x.data();
        let bias_data = bias.data();
        let mut out = x_data.to_vec();
        for r in 0..rows {
            for c in 0..cols {
                out[r * cols + c] += bias_data[c];
            }
        }
        Array1::from(out)
    };

    let requires_grad = x.requires_grad() || bias.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBiasBackward {
            x: x.clone(),
            bias: bias.clone(),
            rows,
            cols,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBiasBackward {
    x: Tensor,
    bias: Tensor,
    rows: usize,
    cols: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for AddBiasBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.accumulate_grad(grad.clone());
            }
            if self.bias.requires_grad() {
                // Bias gradient sums over the row axis.
                let mut grad_bias = vec![0.0f32; self.cols];
                for r in 0..self.rows {
                    for c in 0..self.cols {
                        grad_bias[c] += grad[r * self.cols + c];
                    }
                }
                self.bias.accumulate_grad(Array1::from(grad_bias));
            }

            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
            if let Some(op) = self.bias.backward_op() {
                op.backward();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_add_bias_forward() {
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], false);
        let b = Tensor::from_vec(vec![10.0, 20.0], false);
        let y = add_bias(&x, &b, 2, 2);
        assert_eq!(y.to_vec(), vec![11.0, 22.0, 13.0, 24.0]);
    }

    #[test]
    fn test_add_bias_backward_sums_rows() {
        let x = Tensor::from_vec(vec![0.0; 6], true);
        let b = Tensor::from_vec(vec![0.0; 2], true);
        let y = add_bias(&x, &b, 3, 2);
        y.set_grad(arr1(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        y.backward_op().unwrap().backward();
        assert_eq!(b.grad().unwrap().to_vec(), vec![9.0, 12.0]);
        assert_eq!(x.grad().unwrap().to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
