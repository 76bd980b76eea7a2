//! Optimizers and learning rate schedulers

mod adamw;
mod optimizer;
pub mod scheduler;

pub use adamw::{AdamW, AdamWState};
pub use optimizer::Optimizer;
pub use scheduler::{CosineAnnealingLR, LRScheduler};
