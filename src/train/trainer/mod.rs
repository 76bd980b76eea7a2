//! Trainer orchestrating the contrastive pretraining loop

mod core;
mod result;
mod train_loop;

pub use core::ClrTrainer;
pub use result::TrainResult;
