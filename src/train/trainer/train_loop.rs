//! Epoch and step loop for contrastive pretraining

use super::{ClrTrainer, TrainResult};
use crate::autograd::ops::normalize_rows;
use crate::autograd::precision::cast_activations;
use crate::optim::{CosineAnnealingLR, LRScheduler, Optimizer};
use crate::train::{gram, Batch, Prefetcher};
use crate::{Error, Result, Tensor};
use ndarray::{arr1, Array1};
use std::sync::Arc;
use std::time::Instant;

impl ClrTrainer {
    /// Run the full training loop.
    ///
    /// Per epoch: stream batches through the prefetcher, run one optimization
    /// step per batch, log the epoch average, persist encoder and optimizer
    /// state. Epochs past the warm-up advance the cosine schedule once each.
    /// The loss history is flushed to `losses.csv` after the last epoch.
    pub fn train(&mut self) -> Result<TrainResult> {
        let start = Instant::now();
        println!("Training on device: {}", self.config.device);
        let steps_per_epoch = self.data.num_batches();
        let mut scheduler =
            CosineAnnealingLR::new(self.config.lr, steps_per_epoch.max(1), self.config.lr_min);

        let mut best_loss = f32::INFINITY;
        let mut stopped_early = false;

        for epoch in 0..self.config.epochs {
            if self.stop_requested {
                stopped_early = true;
                break;
            }

            let epoch_start = Instant::now();
            let mut epoch_total = 0.0f64;
            let mut steps = 0usize;

            let prefetcher = Prefetcher::new(
                Arc::clone(&self.data),
                self.config.num_workers,
                self.config.prefetch_depth,
            );
            for (step, batch) in prefetcher.enumerate() {
                let loss = self.train_step(&batch?, epoch, step)?;
                epoch_total += f64::from(loss);
                steps += 1;
            }

            let avg_loss = (epoch_total / steps.max(1) as f64) as f32;
            self.epoch_losses.push(avg_loss);
            best_loss = best_loss.min(avg_loss);

            println!(
                "Epoch {}/{} - Loss: {:.4} - Time Taken {:.2}",
                epoch + 1,
                self.config.epochs,
                avg_loss,
                epoch_start.elapsed().as_secs_f64()
            );

            let encoder_state = self.encoder.state_dict();
            self.checkpoints.save_state(&encoder_state, &self.optimizer.export_state())?;
            if let Some(k) = self.config.keep_every_kth {
                if (epoch + 1) % k == 0 {
                    self.checkpoints.save_epoch_snapshot(epoch + 1, &encoder_state)?;
                }
            }

            if epoch >= self.config.warmup_epochs {
                scheduler.step();
                scheduler.apply(&mut self.optimizer);
            }
        }

        self.checkpoints.save_history(&self.epoch_losses)?;

        Ok(TrainResult {
            final_epoch: self.epoch_losses.len(),
            final_loss: self.epoch_losses.last().copied().unwrap_or(f32::NAN),
            best_loss,
            stopped_early,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// One optimization step over a single batch.
    fn train_step(&mut self, batch: &Batch, epoch: usize, step: usize) -> Result<f32> {
        self.optimizer.zero_grad(&mut self.params);

        // Two augmented views concatenated along the sample axis: row i and
        // row i + N are views of the same sample.
        let rows = 2 * batch.shape.n;
        let images = {
            let first = (self.augment)(batch);
            let second = (self.augment)(batch);
            let mut data = Vec::with_capacity(first.len() + second.len());
            data.extend_from_slice(first.as_slice().expect("augmented batch is contiguous"));
            data.extend_from_slice(second.as_slice().expect("augmented batch is contiguous"));
            Tensor::new(Array1::from(data), false)
        };

        let embeddings = self.encoder.forward(&images, &batch.shape);
        let embeddings = cast_activations(&embeddings, self.config.precision.compute_precision);
        let dim = self.encoder.out_features();
        let normalized = normalize_rows(&embeddings, rows, dim);
        let sims = gram(&normalized, rows, dim);

        let mut loss = self.loss_fn.compute(&sims, rows, &batch.labels)?;
        let loss_val = loss.data()[0];
        if !loss_val.is_finite() {
            return Err(Error::NonFiniteLoss { epoch, step, value: loss_val });
        }

        // Seed the backward pass with the loss scale so the whole tape sees
        // pre-scaled gradients, then divide back out before stepping.
        crate::autograd::backward(&mut loss, Some(arr1(&[self.scaler.scale()])));

        let grads_valid = self.scaler.unscale_params(&self.params);
        if grads_valid {
            self.optimizer.step(&mut self.params);
        }
        self.scaler.update(grads_valid);

        Ok(loss_val)
    }
}
