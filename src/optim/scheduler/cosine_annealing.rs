//! Cosine annealing learning rate scheduler

use super::LRScheduler;
use crate::optim::Optimizer;
use std::f32::consts::PI;

/// Cosine Annealing Learning Rate Scheduler
///
/// Decreases the learning rate following a cosine curve from lr_max to lr_min.
///
/// Formula: lr_t = lr_min + 0.5 * (lr_max - lr_min) * (1 + cos(pi * t / T))
///
/// Where:
/// - t is the current step
/// - T is the total number of steps
/// - lr_max is the initial learning rate
/// - lr_min is the minimum learning rate (default 0)
pub struct CosineAnnealingLR {
    lr_max: f32,
    lr_min: f32,
    t_max: usize,
    current_step: usize,
}

impl CosineAnnealingLR {
    /// Create a new cosine annealing scheduler
    ///
    /// # Arguments
    /// * `lr_max` - Initial (maximum) learning rate
    /// * `t_max` - Total number of steps for the schedule
    /// * `lr_min` - Minimum learning rate (default 0)
    pub fn new(lr_max: f32, t_max: usize, lr_min: f32) -> Self {
        Self { lr_max, lr_min, t_max, current_step: 0 }
    }

    /// Create scheduler with lr_min = 0
    pub fn default_min(lr_max: f32, t_max: usize) -> Self {
        Self::new(lr_max, t_max, 0.0)
    }

    /// Apply the current learning rate to an optimizer
    pub fn apply<O: Optimizer + ?Sized>(&self, optimizer: &mut O) {
        optimizer.set_lr(self.get_lr());
    }
}

impl LRScheduler for CosineAnnealingLR {
    fn get_lr(&self) -> f32 {
        if self.current_step >= self.t_max {
            return self.lr_min;
        }

        let progress = self.current_step as f32 / self.t_max as f32;
        let cosine_decay = 0.5 * (1.0 + (PI * progress).cos());
        self.lr_min + (self.lr_max - self.lr_min) * cosine_decay
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_starts_at_lr_max() {
        let sched = CosineAnnealingLR::new(0.1, 100, 0.0);
        assert_relative_eq!(sched.get_lr(), 0.1, epsilon = 1e-7);
    }

    #[test]
    fn test_midpoint_is_halfway() {
        let mut sched = CosineAnnealingLR::new(0.1, 100, 0.0);
        for _ in 0..50 {
            sched.step();
        }
        assert_relative_eq!(sched.get_lr(), 0.05, epsilon = 1e-6);
    }

    #[test]
    fn test_clamps_to_lr_min_past_t_max() {
        let mut sched = CosineAnnealingLR::new(0.1, 10, 0.001);
        for _ in 0..25 {
            sched.step();
        }
        assert_relative_eq!(sched.get_lr(), 0.001, epsilon = 1e-9);
    }

    #[test]
    fn test_monotone_decay() {
        let mut sched = CosineAnnealingLR::default_min(3e-4, 40);
        let mut prev = sched.get_lr();
        for _ in 0..40 {
            sched.step();
            let lr = sched.get_lr();
            assert!(lr <= prev + 1e-9);
            prev = lr;
        }
        assert_relative_eq!(prev, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_apply_sets_optimizer_lr() {
        use crate::optim::AdamW;

        let mut optimizer = AdamW::default_params(0.1, 0.0);
        let mut sched = CosineAnnealingLR::new(0.1, 2, 0.0);
        sched.step();
        sched.apply(&mut optimizer);
        assert_relative_eq!(optimizer.lr(), 0.05, epsilon = 1e-6);
    }
}
