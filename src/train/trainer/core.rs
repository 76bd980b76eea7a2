//! Core ClrTrainer struct and construction

use crate::autograd::precision::{GradScaler, LossScaler, NoopScaler};
use crate::checkpoint::CheckpointManager;
use crate::optim::{AdamW, Optimizer};
use crate::train::{Augmentation, ClrConfig, ContrastiveLoss, DataSource, ImageEncoder};
use crate::{Error, Result, Tensor};
use std::sync::Arc;

/// Drives contrastive pretraining end to end: double augmentation, encoder
/// forward, similarity matrix, pluggable loss, scaled backward, AdamW step,
/// per-epoch checkpointing.
///
/// # Example
///
/// ```no_run
/// use contrastar::train::{
///     identity_augmentation, ClrConfig, ClrTrainer, InMemoryDataset, LinearEncoder, NtXentLoss,
/// };
/// use std::sync::Arc;
///
/// # fn main() -> contrastar::Result<()> {
/// let config = ClrConfig::default().with_epochs(1);
/// let data = Arc::new(InMemoryDataset::synthetic(4, config.batch_size, (3, 8, 8), 10, 42));
/// let encoder = LinearEncoder::new(3 * 8 * 8, 256, config.head_out_features, config.seed)?;
///
/// let mut trainer = ClrTrainer::new(
///     Box::new(encoder),
///     data,
///     Box::new(NtXentLoss::new(0.1)?),
///     identity_augmentation(),
///     config,
/// )?;
/// let result = trainer.train()?;
/// # Ok(())
/// # }
/// ```
pub struct ClrTrainer {
    pub(crate) encoder: Box<dyn ImageEncoder>,

    /// Shared handles to the encoder's parameters, kept alongside so the
    /// optimizer and scaler see the same storage the forward pass uses
    pub(crate) params: Vec<Tensor>,

    pub(crate) optimizer: AdamW,
    pub(crate) loss_fn: Box<dyn ContrastiveLoss>,
    pub(crate) scaler: Box<dyn LossScaler>,
    pub(crate) checkpoints: CheckpointManager,
    pub(crate) data: Arc<dyn DataSource>,
    pub(crate) augment: Augmentation,
    pub(crate) config: ClrConfig,

    /// Per-epoch average losses, flushed to losses.csv at the end of the run
    pub(crate) epoch_losses: Vec<f32>,

    pub(crate) stop_requested: bool,
}

impl ClrTrainer {
    /// Build a trainer, creating the run's checkpoint directory and loading
    /// prior encoder weights when a load path is configured and present.
    pub fn new(
        mut encoder: Box<dyn ImageEncoder>,
        data: Arc<dyn DataSource>,
        loss_fn: Box<dyn ContrastiveLoss>,
        augment: Augmentation,
        config: ClrConfig,
    ) -> Result<Self> {
        config.validate()?;
        if encoder.out_features() == 0 {
            return Err(Error::InvalidArgument(
                "encoder must produce a non-empty embedding".to_string(),
            ));
        }

        let checkpoints = CheckpointManager::create(&config.checkpoint_base)?;

        if let Some(path) = &config.encoder_load_path {
            if path.is_file() {
                let state = CheckpointManager::load_encoder_state(path)?;
                encoder.load_state_dict(&state)?;
            } else {
                println!("No pre-trained weights found. Training from scratch.");
            }
        }

        let params = encoder.parameters();
        let optimizer = AdamW::default_params(config.lr, config.weight_decay);
        let scaler: Box<dyn LossScaler> = if config.precision.is_mixed() {
            Box::new(GradScaler::from_config(&config.precision))
        } else {
            Box::new(NoopScaler)
        };

        Ok(Self {
            encoder,
            params,
            optimizer,
            loss_fn,
            scaler,
            checkpoints,
            data,
            augment,
            config,
            epoch_losses: Vec::new(),
            stop_requested: false,
        })
    }

    /// Current learning rate
    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }

    /// Directory this run's checkpoints are written into
    pub fn run_dir(&self) -> &std::path::Path {
        self.checkpoints.run_dir()
    }

    /// Average loss of each completed epoch so far
    pub fn epoch_losses(&self) -> &[f32] {
        &self.epoch_losses
    }

    /// The encoder being trained
    pub fn encoder(&self) -> &dyn ImageEncoder {
        self.encoder.as_ref()
    }

    /// Request a stop at the next epoch boundary.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::{identity_augmentation, InMemoryDataset, LinearEncoder, NtXentLoss};
    use tempfile::TempDir;

    fn small_config(base: &TempDir) -> ClrConfig {
        let mut config = ClrConfig::default()
            .with_epochs(1)
            .with_batch_size(4)
            .with_num_workers(2)
            .with_checkpoint_base(base.path());
        config.head_out_features = 6;
        config
    }

    fn small_trainer(config: ClrConfig) -> Result<ClrTrainer> {
        let data = Arc::new(InMemoryDataset::synthetic(2, config.batch_size, (1, 2, 2), 5, 3));
        let encoder = LinearEncoder::new(4, 8, config.head_out_features, config.seed)?;
        ClrTrainer::new(
            Box::new(encoder),
            data,
            Box::new(NtXentLoss::new(0.5)?),
            identity_augmentation(),
            config,
        )
    }

    #[test]
    fn test_new_creates_run_dir() {
        let base = TempDir::new().unwrap();
        let trainer = small_trainer(small_config(&base)).unwrap();
        assert!(trainer.run_dir().is_dir());
        assert!(trainer.run_dir().starts_with(base.path()));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let base = TempDir::new().unwrap();
        let config = small_config(&base).with_batch_size(0);
        assert!(small_trainer(config).is_err());
    }

    #[test]
    fn test_missing_prior_encoder_trains_from_scratch() {
        let base = TempDir::new().unwrap();
        let mut config = small_config(&base);
        config.encoder_load_path = Some(base.path().join("does-not-exist.pt"));
        let trainer = small_trainer(config).unwrap();
        assert_eq!(trainer.epoch_losses().len(), 0);
    }

    #[test]
    fn test_prior_encoder_is_loaded() {
        let base = TempDir::new().unwrap();

        // Save one encoder's weights, then construct a trainer pointed at them
        let donor = LinearEncoder::new(4, 8, 6, 123).unwrap();
        let path = base.path().join("encoder.pt");
        let json = serde_json::to_string(&donor.state_dict()).unwrap();
        std::fs::write(&path, json).unwrap();

        let mut config = small_config(&base);
        config.encoder_load_path = Some(path);
        let trainer = small_trainer(config).unwrap();

        let donor_state = donor.state_dict();
        let loaded_state = trainer.encoder().state_dict();
        assert_eq!(donor_state, loaded_state);
    }

    #[test]
    fn test_lr_comes_from_config() {
        let base = TempDir::new().unwrap();
        let mut config = small_config(&base);
        config.lr = 1e-3;
        let trainer = small_trainer(config).unwrap();
        assert_eq!(trainer.lr(), 1e-3);
    }
}
