//! Run configuration for contrastive pretraining

use crate::autograd::MixedPrecisionConfig;
use crate::{Error, Result};
use std::path::PathBuf;

/// Compute device. CPU only; the variant exists so configs stay stable when
/// accelerator backends land. Resolved by the caller (the CLI) and passed in,
/// never probed inside the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
}

impl Device {
    pub fn name(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable run configuration for [`crate::train::ClrTrainer`].
#[derive(Debug, Clone)]
pub struct ClrConfig {
    /// Samples per batch (before augmentation doubles the row count)
    pub batch_size: usize,
    pub device: Device,
    /// Embedding width produced by the encoder head
    pub head_out_features: usize,
    /// Prefetcher worker threads
    pub num_workers: usize,
    /// Bounded queue depth per prefetch worker
    pub prefetch_depth: usize,
    pub epochs: usize,
    /// Epochs before the cosine schedule starts stepping
    pub warmup_epochs: usize,
    pub lr: f32,
    pub weight_decay: f32,
    pub lr_min: f32,
    /// Prior encoder weights to resume from, if the file exists
    pub encoder_load_path: Option<PathBuf>,
    /// Base directory under which each run creates its timestamped dir
    pub checkpoint_base: PathBuf,
    /// Additionally keep a snapshot every Kth epoch instead of overwrite-only
    pub keep_every_kth: Option<usize>,
    pub precision: MixedPrecisionConfig,
    pub seed: u64,
}

impl Default for ClrConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            device: Device::Cpu,
            head_out_features: 128,
            num_workers: 8,
            prefetch_depth: 2,
            epochs: 100,
            warmup_epochs: 15,
            lr: 3e-4,
            weight_decay: 1e-4,
            lr_min: 0.0,
            encoder_load_path: None,
            checkpoint_base: PathBuf::from("checkpoints/encoders"),
            keep_every_kth: None,
            precision: MixedPrecisionConfig::fp32(),
            seed: 42,
        }
    }
}

impl ClrConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument("batch_size must be positive".to_string()));
        }
        if self.head_out_features == 0 {
            return Err(Error::InvalidArgument(
                "head_out_features must be positive".to_string(),
            ));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "lr must be finite and positive, got {}",
                self.lr
            )));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "weight_decay must be finite and non-negative, got {}",
                self.weight_decay
            )));
        }
        if let Some(0) = self.keep_every_kth {
            return Err(Error::InvalidArgument(
                "keep_every_kth must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_checkpoint_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.checkpoint_base = base.into();
        self
    }

    pub fn with_precision(mut self, precision: MixedPrecisionConfig) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }
}
