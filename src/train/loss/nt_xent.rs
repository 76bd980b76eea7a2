//! Normalized temperature-scaled cross entropy (the plain SimCLR objective)

use super::{check_sims_shape, check_temperature, masked_softmax, ContrastiveLoss};
use crate::autograd::BackwardOp;
use crate::{Result, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// NT-Xent loss.
///
/// Each row's positive is its augmented twin at `(i + N) mod 2N`; every other
/// off-diagonal entry is a negative. Per row:
///
/// L_i = -log( exp(s_ip/τ) / Σ_{j≠i} exp(s_ij/τ) )
///
/// averaged over all 2N rows, computed with log-sum-exp max subtraction.
pub struct NtXentLoss {
    tau: f32,
}

impl NtXentLoss {
    /// Create the loss with temperature `tau`.
    pub fn new(tau: f32) -> Result<Self> {
        check_temperature("tau", tau)?;
        Ok(Self { tau })
    }

    /// Temperature hyperparameter
    pub fn tau(&self) -> f32 {
        self.tau
    }
}

impl ContrastiveLoss for NtXentLoss {
    fn compute(&self, sims: &Tensor, rows: usize, _labels: &[usize]) -> Result<Tensor> {
        check_sims_shape(sims, rows)?;
        let n = rows / 2;

        let (probs, log_sums) = masked_softmax(sims, rows, self.tau);

        let total: f64 = {
            let s = sims.data();
            (0..rows)
                .map(|i| {
                    let pos = (i + n) % rows;
                    log_sums[i] - f64::from(s[i * rows + pos] / self.tau)
                })
                .sum()
        };
        let loss_val = (total / rows as f64) as f32;

        let mut loss = Tensor::from_vec(vec![loss_val], sims.requires_grad());

        if sims.requires_grad() {
            // dL/ds_ij = (q_ij - 1{j = pos}) / (τ · rows), diagonal zero
            let mut grad = probs;
            for i in 0..rows {
                let pos = (i + n) % rows;
                grad[i * rows + pos] -= 1.0;
            }
            let denom = self.tau * rows as f32;
            for g in grad.iter_mut() {
                *g /= denom;
            }

            loss.set_backward_op(Rc::new(NtXentBackward {
                sims: sims.clone(),
                grad: Array1::from(grad),
                result_grad: loss.grad_cell(),
            }));
        }

        Ok(loss)
    }

    fn name(&self) -> &str {
        "NT-Xent"
    }
}

struct NtXentBackward {
    sims: Tensor,
    grad: Array1<f32>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for NtXentBackward {
    fn backward(&self) {
        if let Some(seed) = self.result_grad.borrow().as_ref() {
            let seed = seed[0];
            self.sims.accumulate_grad(&self.grad * seed);
            if let Some(op) = self.sims.backward_op() {
                op.backward();
            }
        }
    }
}
