//! Autograd operations with backward passes

mod activations;
mod basic;
mod matmul;
mod normalize;

pub use activations::relu;
pub use basic::add_bias;
pub use matmul::{matmul, matmul_compute, transpose};
pub use normalize::normalize_rows;
