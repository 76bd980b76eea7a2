//! Contrastive pretraining loop
//!
//! This module provides the self-supervised training framework:
//! - Batches of augmented image pairs ([`Batch`], augmentation hooks)
//! - Similarity matrix construction over normalized embeddings
//! - Pluggable contrastive objectives ([`NtXentLoss`], [`LabelAwareLoss`])
//! - Trainer abstraction with loss scaling and per-epoch checkpointing
//!
//! # Example
//!
//! ```no_run
//! use contrastar::train::{
//!     identity_augmentation, ClrConfig, ClrTrainer, InMemoryDataset, LinearEncoder, NtXentLoss,
//! };
//! use std::sync::Arc;
//!
//! let config = ClrConfig::default();
//! let data = Arc::new(InMemoryDataset::synthetic(4, 8, (3, 8, 8), 10, 42));
//! let encoder = LinearEncoder::new(3 * 8 * 8, 64, config.head_out_features, config.seed).unwrap();
//! let loss = NtXentLoss::new(0.1).unwrap();
//!
//! let mut trainer = ClrTrainer::new(
//!     Box::new(encoder),
//!     data,
//!     Box::new(loss),
//!     identity_augmentation(),
//!     config,
//! )
//! .unwrap();
//! let result = trainer.train().unwrap();
//! println!("final loss {:.4}", result.final_loss);
//! ```

mod batch;
mod config;
mod dataset;
mod encoder;
pub mod loss;
mod similarity;
mod trainer;

pub use batch::{Batch, ImageShape};
pub use config::{ClrConfig, Device};
pub use dataset::{
    identity_augmentation, jitter_augmentation, Augmentation, DataSource, InMemoryDataset,
    Prefetcher,
};
pub use encoder::{ImageEncoder, LinearEncoder};
pub use loss::{ContrastiveLoss, LabelAwareLoss, NtXentLoss};
pub use similarity::gram;
pub use trainer::{ClrTrainer, TrainResult};
