//! Activation autograd operations

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Rectified linear unit: max(0, x).
pub fn relu(x: &Tensor) -> Tensor {
    let data = x.data().mapv(|v| v.max(0.0));
    let requires_grad = x.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ReluBackward {
            x: x.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReluBackward {
    x: Tensor,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for ReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                let grad_x = {
                    let x_data = self.x.data();
                    let masked: Vec<f32> = grad
                        .iter()
                        .zip(x_data.iter())
                        .map(|(&g, &v)| if v > 0.0 { g } else { 0.0 })
                        .collect();
                    Array1::from(masked)
                };
                self.x.accumulate_grad(grad_x);
            }
            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
        }
    }
}
