//! Reduced-precision emulation of forward activations.

use super::conversions::{bf16_to_f32, f32_to_bf16, f32_to_fp16, fp16_to_f32};
use super::Precision;
use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Round activations through a reduced-precision representation.
///
/// The result is still f32 but carries fp16/bf16 rounding, so the forward
/// pass sees exactly the values a half-precision kernel would produce.
/// Gradients pass straight through unchanged. For [`Precision::Fp32`] this
/// is the identity and the input handle is returned as-is.
pub fn cast_activations(x: &Tensor, precision: Precision) -> Tensor {
    if !precision.is_reduced() {
        return x.clone();
    }

    let data = x.data().mapv(|v| match precision {
        Precision::Fp16 => fp16_to_f32(f32_to_fp16(v)),
        Precision::Bf16 => bf16_to_f32(f32_to_bf16(v)),
        Precision::Fp32 => v,
    });

    let requires_grad = x.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(CastBackward {
            x: x.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct CastBackward {
    x: Tensor,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for CastBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.accumulate_grad(grad.clone());
            }
            if let Some(op) = self.x.backward_op() {
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
    fn test_fp32_is_identity() {
        let x = Tensor::from_vec(vec![1.0 + 2.0f32.powi(-20)], false);
        let y = cast_activations(&x, Precision::Fp32);
        assert_eq!(y.to_vec(), x.to_vec());
    }

    #[test]
    fn test_bf16_rounds_forward_values() {
        let x = Tensor::from_vec(vec![1.0 + 2.0f32.powi(-9)], false);
        let y = cast_activations(&x, Precision::Bf16);
        assert_eq!(y.to_vec(), vec![1.0]);
    }

    #[test]
    fn test_gradient_passes_through() {
        let x = Tensor::from_vec(vec![0.3, -0.7], true);
        let y = cast_activations(&x, Precision::Fp16);
        y.set_grad(arr1(&[2.0, 4.0]));
        y.backward_op().unwrap().backward();
        assert_eq!(x.grad().unwrap().to_vec(), vec![2.0, 4.0]);
    }
}
