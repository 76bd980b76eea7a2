//! Contrastive pretraining for visual representation encoders
//!
//! `contrastar` trains image encoders with self-supervised contrastive
//! objectives (SimCLR-style and label-aware X-CLR-style), then reuses the
//! frozen encoder to produce fixed-length feature vectors for downstream
//! linear classification.
//!
//! The crate is organised around:
//! - A tape-based autograd engine over flattened `ndarray` tensors
//! - Pluggable contrastive loss strategies over a pairwise similarity matrix
//! - A training loop driver with dynamic loss scaling and cosine annealing
//! - A checkpoint manager persisting encoder/optimiser state per epoch
//!
//! # Example
//!
//! ```no_run
//! use contrastar::train::{
//!     identity_augmentation, ClrConfig, ClrTrainer, InMemoryDataset, LinearEncoder, NtXentLoss,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> contrastar::Result<()> {
//! let config = ClrConfig::default().with_epochs(10).with_batch_size(64);
//! let dataset = Arc::new(InMemoryDataset::synthetic(16, 64, (3, 8, 8), 10, 42));
//! let encoder = LinearEncoder::new(3 * 8 * 8, 64, config.head_out_features, config.seed)?;
//! let loss = NtXentLoss::new(0.1)?;
//!
//! let mut trainer = ClrTrainer::new(
//!     Box::new(encoder),
//!     dataset,
//!     Box::new(loss),
//!     identity_augmentation(),
//!     config,
//! )?;
//! let result = trainer.train()?;
//! println!("final loss: {:.4}", result.final_loss);
//! # Ok(())
//! # }
//! ```

pub mod autograd;
pub mod checkpoint;
pub mod cli;
pub mod encode;
pub mod optim;
pub mod train;

pub use autograd::Tensor;

/// Errors produced by the trainer, losses, and checkpoint machinery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter or input value is outside its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A tensor or batch dimension disagrees with its counterpart.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The reduced scalar loss left the finite range and the run aborted.
    #[error("non-finite loss {value} at epoch {epoch}, step {step}")]
    NonFiniteLoss {
        epoch: usize,
        step: usize,
        value: f32,
    },

    /// Label-aware training was requested without a label range.
    #[error("label range is required for label-aware training")]
    MissingLabelRange,

    /// Checkpoint or dataset I/O failed.
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing or deserializing persisted state failed.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
