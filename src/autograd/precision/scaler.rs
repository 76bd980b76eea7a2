//! Loss scaling for mixed-precision training.

use super::MixedPrecisionConfig;
use crate::autograd::Tensor;

/// Default number of successful steps before the loss scale is increased
const DEFAULT_SCALE_GROWTH_INTERVAL: usize = 2000;

/// Strategy for scaling the loss and unscaling gradients.
///
/// The trainer seeds the backward pass with [`LossScaler::scale`], then calls
/// [`LossScaler::unscale_params`] before the optimizer step. A `false` return
/// means some unscaled gradient was non-finite and the step must be skipped.
pub trait LossScaler {
    /// Current loss scale used to seed the backward pass.
    fn scale(&self) -> f32;

    /// Divide every accumulated gradient by the scale in place.
    ///
    /// Returns `true` if all gradients are finite after unscaling.
    fn unscale_params(&self, params: &[Tensor]) -> bool;

    /// Adjust the scale after a step. Pass `true` if gradients were valid.
    fn update(&mut self, grads_valid: bool);
}

/// Dynamic gradient scaler for fp16 training.
///
/// Grows the scale after a run of successful steps and backs it off on
/// overflow, never dropping below 1.0.
#[derive(Debug)]
pub struct GradScaler {
    scale: f32,
    growth_factor: f32,
    backoff_factor: f32,
    growth_interval: usize,
    steps_since_growth: usize,
    dynamic: bool,
    overflow_count: usize,
    successful_steps: usize,
}

impl GradScaler {
    /// Create a new gradient scaler
    pub fn new(initial_scale: f32) -> Self {
        Self {
            scale: initial_scale,
            growth_factor: 2.0,
            backoff_factor: 0.5,
            growth_interval: DEFAULT_SCALE_GROWTH_INTERVAL,
            steps_since_growth: 0,
            dynamic: true,
            overflow_count: 0,
            successful_steps: 0,
        }
    }

    /// Create from config
    pub fn from_config(config: &MixedPrecisionConfig) -> Self {
        Self {
            scale: config.initial_scale,
            growth_factor: config.scale_growth_factor,
            backoff_factor: config.scale_backoff_factor,
            growth_interval: config.scale_growth_interval,
            steps_since_growth: 0,
            dynamic: config.dynamic_scaling,
            overflow_count: 0,
            successful_steps: 0,
        }
    }

    /// Number of overflows encountered so far
    pub fn overflow_count(&self) -> usize {
        self.overflow_count
    }

    /// Number of successful steps so far
    pub fn successful_steps(&self) -> usize {
        self.successful_steps
    }

    /// Check if dynamic scaling is enabled
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

impl LossScaler for GradScaler {
    fn scale(&self) -> f32 {
        self.scale
    }

    fn unscale_params(&self, params: &[Tensor]) -> bool {
        let inv_scale = 1.0 / self.scale;
        let mut all_finite = true;

        for param in params {
            let cell = param.grad_cell();
            let mut guard = cell.borrow_mut();
            if let Some(grad) = guard.as_mut() {
                grad.mapv_inplace(|g| g * inv_scale);
                if grad.iter().any(|g| !g.is_finite()) {
                    all_finite = false;
                }
            }
        }

        all_finite
    }

    fn update(&mut self, grads_valid: bool) {
        if !self.dynamic {
            return;
        }

        if grads_valid {
            self.successful_steps += 1;
            self.steps_since_growth += 1;

            if self.steps_since_growth >= self.growth_interval {
                self.scale *= self.growth_factor;
                self.steps_since_growth = 0;
            }
        } else {
            self.overflow_count += 1;
            self.scale *= self.backoff_factor;
            self.steps_since_growth = 0;

            // Floor so the scale can always recover
            self.scale = self.scale.max(1.0);
        }
    }
}

impl Default for GradScaler {
    fn default() -> Self {
        Self::new(65536.0)
    }
}

/// Pass-through scaler for full-precision training.
#[derive(Debug, Default)]
pub struct NoopScaler;

impl LossScaler for NoopScaler {
    fn scale(&self) -> f32 {
        1.0
    }

    fn unscale_params(&self, params: &[Tensor]) -> bool {
        params.iter().all(|param| {
            param
                .grad()
                .map_or(true, |grad| grad.iter().all(|g| g.is_finite()))
        })
    }

    fn update(&mut self, _grads_valid: bool) {}
}
