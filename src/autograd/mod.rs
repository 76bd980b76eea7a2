//! Tape-based autograd engine
//!
//! Provides automatic differentiation over flattened tensors using a
//! computational graph with gradient tape. Every differentiable operation
//! returns a tensor carrying a [`BackwardOp`] that knows how to push the
//! upstream gradient into its inputs and recurse.

pub mod ops;
pub mod precision;
mod tensor;

pub use precision::{GradScaler, LossScaler, MixedPrecisionConfig, NoopScaler, Precision};
pub use tensor::Tensor;

/// A node on the gradient tape.
///
/// Implementations read the upstream gradient from the result tensor's grad
/// cell, accumulate gradients into their inputs, and recursively invoke the
/// inputs' backward ops.
pub trait BackwardOp {
    fn backward(&self);
}

/// Perform a backward pass starting from `tensor`.
///
/// If `grad_output` is `None` the gradient is seeded with ones, the usual
/// seed for a scalar loss. The trainer seeds with the loss-scaling factor
/// instead, so the whole tape sees pre-scaled gradients.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    match grad_output {
        Some(grad) => tensor.set_grad(grad),
        None => tensor.set_grad(ndarray::Array1::ones(tensor.len())),
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_backward_seeds_ones_by_default() {
        let mut t = Tensor::from_vec(vec![3.0], true);
        backward(&mut t, None);
        assert_eq!(t.grad().unwrap()[0], 1.0);
    }

    #[test]
    fn test_backward_custom_seed() {
        let mut t = Tensor::from_vec(vec![3.0], true);
        backward(&mut t, Some(arr1(&[65536.0])));
        assert_eq!(t.grad().unwrap()[0], 65536.0);
    }
}
