//! Contrastive objectives over similarity matrices

mod label_aware;
mod nt_xent;

pub use label_aware::LabelAwareLoss;
pub use nt_xent::NtXentLoss;

use crate::{Error, Result, Tensor};

/// Strategy trait for contrastive objectives.
///
/// `sims` is a rows×rows similarity matrix over a doubly-augmented batch, so
/// `rows` is twice the sample count and the augmented view of row `i` sits at
/// `(i + rows/2) % rows`. `labels` carries one label per original sample;
/// variants that do not use labels ignore it.
pub trait ContrastiveLoss {
    /// Compute the scalar loss and wire its backward pass into `sims`.
    fn compute(&self, sims: &Tensor, rows: usize, labels: &[usize]) -> Result<Tensor>;

    /// Name of the loss variant
    fn name(&self) -> &str;
}

/// Shared shape validation for similarity-matrix losses.
pub(crate) fn check_sims_shape(sims: &Tensor, rows: usize) -> Result<()> {
    if rows == 0 || rows % 2 != 0 {
        return Err(Error::ShapeMismatch(format!(
            "similarity matrix must cover an even, non-zero row count, got {rows}"
        )));
    }
    if sims.len() != rows * rows {
        return Err(Error::ShapeMismatch(format!(
            "similarity matrix has {} values, expected {}x{}",
            sims.len(),
            rows,
            rows
        )));
    }
    Ok(())
}

/// Validate a temperature hyperparameter at construction time.
pub(crate) fn check_temperature(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "{name} must be finite and positive, got {value}"
        )));
    }
    Ok(())
}

/// Row-wise masked softmax of `sims / tau` with the diagonal excluded.
///
/// Returns the probabilities (diagonal entries zero) and the per-row
/// log-sum-exp values, both needed by every variant's forward and backward.
pub(crate) fn masked_softmax(
    sims: &Tensor,
    rows: usize,
    tau: f32,
) -> (Vec<f32>, Vec<f64>) {
    let s = sims.data();
    let mut probs = vec![0.0f32; rows * rows];
    let mut log_sums = vec![0.0f64; rows];

    for i in 0..rows {
        let mut max = f32::NEG_INFINITY;
        for j in 0..rows {
            if j != i {
                max = max.max(s[i * rows + j] / tau);
            }
        }

        let mut sum = 0.0f64;
        for j in 0..rows {
            if j != i {
                let e = f64::from(s[i * rows + j] / tau - max).exp();
                probs[i * rows + j] = e as f32;
                sum += e;
            }
        }

        let inv = (1.0 / sum) as f32;
        for j in 0..rows {
            probs[i * rows + j] *= inv;
        }
        log_sums[i] = sum.ln() + f64::from(max);
    }

    (probs, log_sums)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_sims_shape_rejects_odd_rows() {
        let sims = Tensor::zeros(9, false);
        assert!(check_sims_shape(&sims, 3).is_err());
    }

    #[test]
    fn test_check_sims_shape_rejects_wrong_len() {
        let sims = Tensor::zeros(10, false);
        assert!(check_sims_shape(&sims, 4).is_err());
    }

    #[test]
    fn test_check_temperature() {
        assert!(check_temperature("tau", 0.1).is_ok());
        assert!(check_temperature("tau", 0.0).is_err());
        assert!(check_temperature("tau", -1.0).is_err());
        assert!(check_temperature("tau", f32::NAN).is_err());
    }

    #[test]
    fn test_masked_softmax_rows_sum_to_one() {
        let sims = Tensor::from_vec(vec![1.0, 0.3, 0.3, 1.0], false);
        let (probs, _) = masked_softmax(&sims, 2, 0.5);
        assert_eq!(probs[0], 0.0); // diagonal masked
        assert_eq!(probs[3], 0.0);
        assert!((probs[1] - 1.0).abs() < 1e-6);
        assert!((probs[2] - 1.0).abs() < 1e-6);
    }
}
