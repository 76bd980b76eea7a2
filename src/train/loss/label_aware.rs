//! Label-aware contrastive objective (x-sample variant)

use super::{check_sims_shape, check_temperature, masked_softmax, ContrastiveLoss};
use crate::autograd::BackwardOp;
use crate::{Error, Result, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Label-aware contrastive loss.
///
/// Instead of a single hard positive per row, the target is a soft
/// distribution over the other rows derived from label agreement under a
/// second temperature τ_s:
///
/// p_ij ∝ exp(1[label_i = label_j] / τ_s),  j ≠ i
///
/// and the loss is the cross entropy between p and the similarity softmax
/// q = softmax_j(s_ij / τ). Labels cover the original N samples and are
/// broadcast to both augmented views. As τ_s → 0 with unique labels this
/// collapses onto the plain NT-Xent objective.
pub struct LabelAwareLoss {
    tau: f32,
    tau_s: f32,
    label_range: usize,
}

impl LabelAwareLoss {
    /// Create the loss with similarity temperature `tau`, label temperature
    /// `tau_s`, and the exclusive upper bound of the label universe.
    pub fn new(tau: f32, tau_s: f32, label_range: usize) -> Result<Self> {
        check_temperature("tau", tau)?;
        check_temperature("tau_s", tau_s)?;
        if label_range == 0 {
            return Err(Error::InvalidArgument(
                "label_range must be positive".to_string(),
            ));
        }
        Ok(Self { tau, tau_s, label_range })
    }

    /// Soft target distribution for all rows, diagonal zero.
    ///
    /// Agreement weights are max-subtracted before the exp so a small τ_s
    /// stays finite; the same-label weight becomes 1 and the different-label
    /// weight exp(-1/τ_s).
    fn soft_targets(&self, extended: &[usize], rows: usize) -> (Vec<f32>, usize) {
        let mut targets = vec![0.0f32; rows * rows];
        let mut counted_rows = 0usize;

        let off = f64::from(-1.0 / self.tau_s).exp();
        for i in 0..rows {
            let mut sum = 0.0f64;
            for j in 0..rows {
                if j != i {
                    let w = if extended[i] == extended[j] { 1.0 } else { off };
                    targets[i * rows + j] = w as f32;
                    sum += w;
                }
            }
            if sum > 0.0 {
                counted_rows += 1;
                let inv = (1.0 / sum) as f32;
                for j in 0..rows {
                    targets[i * rows + j] *= inv;
                }
            }
        }

        (targets, counted_rows)
    }
}

impl ContrastiveLoss for LabelAwareLoss {
    fn compute(&self, sims: &Tensor, rows: usize, labels: &[usize]) -> Result<Tensor> {
        check_sims_shape(sims, rows)?;
        let n = rows / 2;
        if labels.len() != n {
            return Err(Error::ShapeMismatch(format!(
                "{} labels for {} samples",
                labels.len(),
                n
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= self.label_range) {
            return Err(Error::InvalidArgument(format!(
                "label {bad} outside label_range {}",
                self.label_range
            )));
        }

        // Both augmented views of a sample carry its label
        let extended: Vec<usize> = (0..rows).map(|i| labels[i % n]).collect();

        let (targets, counted_rows) = self.soft_targets(&extended, rows);
        let (probs, log_sums) = masked_softmax(sims, rows, self.tau);

        // Cross entropy between targets and the similarity softmax. Rows with
        // an all-zero target distribution contribute nothing and are excluded
        // from the mean's denominator.
        let total: f64 = {
            let s = sims.data();
            let mut acc = 0.0f64;
            for i in 0..rows {
                for j in 0..rows {
                    let p = f64::from(targets[i * rows + j]);
                    if p > 0.0 {
                        let log_q = f64::from(s[i * rows + j] / self.tau) - log_sums[i];
                        acc -= p * log_q;
                    }
                }
            }
            acc
        };
        let loss_val = (total / counted_rows.max(1) as f64) as f32;

        let mut loss = Tensor::from_vec(vec![loss_val], sims.requires_grad());

        if sims.requires_grad() {
            // dL/ds_ij = (q_ij - p_ij) / (τ · counted_rows), diagonal zero
            let denom = self.tau * counted_rows.max(1) as f32;
            let grad: Vec<f32> = probs
                .iter()
                .zip(targets.iter())
                .map(|(&q, &p)| (q - p) / denom)
                .collect();

            loss.set_backward_op(Rc::new(LabelAwareBackward {
                sims: sims.clone(),
                grad: Array1::from(grad),
                result_grad: loss.grad_cell(),
            }));
        }

        Ok(loss)
    }

    fn name(&self) -> &str {
        "LabelAware"
    }
}

struct LabelAwareBackward {
    sims: Tensor,
    grad: Array1<f32>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for LabelAwareBackward {
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
