//! Mixed-precision training utilities
//!
//! Supports forward passes emulated in reduced precision (fp16/bf16) while
//! master weights stay fp32. Loss scaling guards the backward pass against
//! fp16 gradient underflow: the backward seed is multiplied by the scale,
//! gradients are divided back out before the optimizer step, and a step is
//! skipped whenever an unscaled gradient comes back non-finite.
//!
//! ## Example
//!
//! ```ignore
//! use contrastar::autograd::precision::{GradScaler, LossScaler, MixedPrecisionConfig};
//!
//! let config = MixedPrecisionConfig::fp16();
//! let mut scaler = GradScaler::from_config(&config);
//!
//! let mut loss = forward(&batch);
//! backward(&mut loss, Some(ndarray::arr1(&[scaler.scale()])));
//!
//! if scaler.unscale_params(&params) {
//!     optimizer.step(&mut params);
//!     scaler.update(true);
//! } else {
//!     scaler.update(false);
//! }
//! ```

mod cast;
mod config;
mod conversions;
mod precision_types;
mod scaler;

pub use cast::cast_activations;
pub use config::MixedPrecisionConfig;
pub use conversions::{bf16_to_f32, f32_to_bf16, f32_to_fp16, fp16_to_f32};
pub use precision_types::Precision;
pub use scaler::{GradScaler, LossScaler, NoopScaler};
