//! Row-wise L2 normalization with gradient support

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Norm floor to keep zero rows from dividing by zero.
const EPS: f32 = 1e-12;

/// Project every row of a rows×dim flattened matrix onto the unit sphere.
///
/// Rows with norm below [`EPS`] are divided by the floor instead, matching
/// the usual epsilon-clamped formulation.
pub fn normalize_rows(x: &Tensor, rows: usize, dim: usize) -> Tensor {
    assert_eq!(x.len(), rows * dim, "input size mismatch");

    let mut norms = vec![0.0f32; rows];
    let data = {
        let x_data = x.data();
        let mut out = x_data.to_vec();
        for r in 0..rows {
            let row = &x_data.as_slice().expect("input must be contiguous")[r * dim..(r + 1) * dim];
            let norm_sq: f64 = row.iter().map(|&v| f64::from(v) * f64::from(v)).sum();
            let norm = (norm_sq.sqrt() as f32).max(EPS);
            norms[r] = norm;
            for c in 0..dim {
                out[r * dim + c] /= norm;
            }
        }
        Array1::from(out)
    };

    let requires_grad = x.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(NormalizeBackward {
            x: x.clone(),
            normalized: result.to_vec(),
            norms,
            rows,
            dim,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct NormalizeBackward {
    x: Tensor,
    normalized: Vec<f32>,
    norms: Vec<f32>,
    rows: usize,
    dim: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for NormalizeBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                // For y = x / ‖x‖ the Jacobian-vector product per row is
                // (g - (g·y) y) / ‖x‖.
                let mut grad_x = vec![0.0f32; self.rows * self.dim];
                for r in 0..self.rows {
                    let y = &self.normalized[r * self.dim..(r + 1) * self.dim];
                    let g = &grad.as_slice().expect("gradient must be contiguous")
                        [r * self.dim..(r + 1) * self.dim];
                    let dot: f64 = g
                        .iter()
                        .zip(y.iter())
                        .map(|(&gi, &yi)| f64::from(gi) * f64::from(yi))
                        .sum();
                    let dot = dot as f32;
                    for c in 0..self.dim {
                        grad_x[r * self.dim + c] = (g[c] - dot * y[c]) / self.norms[r];
                    }
                }
                self.x.accumulate_grad(Array1::from(grad_x));
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
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn test_rows_have_unit_norm() {
        let x = Tensor::from_vec(vec![3.0, 4.0, 1.0, 0.0], false);
        let y = normalize_rows(&x, 2, 2);
        let out = y.to_vec();
        assert_relative_eq!(out[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(out[1], 0.8, epsilon = 1e-6);
        assert_relative_eq!(out[2], 1.0, epsilon = 1e-6);
        assert_relative_eq!(out[3], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_row_stays_finite() {
        let x = Tensor::from_vec(vec![0.0, 0.0, 0.0], false);
        let y = normalize_rows(&x, 1, 3);
        for v in y.to_vec() {
            assert!(v.is_finite());
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_backward_orthogonal_to_output() {
        // Gradient of a unit-norm output must be tangent to the sphere, so
        // grad_x · y == 0 when the upstream gradient is arbitrary.
        let x = Tensor::from_vec(vec![3.0, 4.0], true);
        let y = normalize_rows(&x, 1, 2);
        y.set_grad(arr1(&[1.0, 2.0]));
        y.backward_op().unwrap().backward();

        let gx = x.grad().unwrap();
        let out = y.to_vec();
        let dot = gx[0] * out[0] + gx[1] * out[1];
        assert_relative_eq!(dot, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let base = vec![0.5f32, -1.2, 2.0];
        let upstream = [0.3f32, 0.7, -0.4];

        let x = Tensor::from_vec(base.clone(), true);
        let y = normalize_rows(&x, 1, 3);
        y.set_grad(arr1(&upstream));
        y.backward_op().unwrap().backward();
        let gx = x.grad().unwrap();

        let f = |v: &[f32]| -> f32 {
            let norm: f32 = v.iter().map(|&a| a * a).sum::<f32>().sqrt();
            v.iter()
                .zip(upstream.iter())
                .map(|(&a, &u)| u * a / norm)
                .sum()
        };

        let h = 1e-3f32;
        for i in 0..3 {
            let mut plus = base.clone();
            plus[i] += h;
            let mut minus = base.clone();
            minus[i] -= h;
            let numeric = (f(&plus) - f(&minus)) / (2.0 * h);
            assert_relative_eq!(gx[i], numeric, epsilon = 1e-2);
        }
    }
}
