//! Batch data structure

use crate::{Error, Result};
use ndarray::Array1;

/// Dimensions of an image batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    /// Samples in the batch
    pub n: usize,
    /// Channels
    pub c: usize,
    /// Height
    pub h: usize,
    /// Width
    pub w: usize,
}

impl ImageShape {
    pub fn new(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self { n, c, h, w }
    }

    /// Flattened length of one sample
    pub fn pixels(&self) -> usize {
        self.c * self.h * self.w
    }

    /// Flattened length of the whole batch
    pub fn flat_len(&self) -> usize {
        self.n * self.pixels()
    }
}

/// A batch of images with one label per sample.
///
/// Pixel data is flattened row-major, sample-first. Plain arrays rather than
/// tape tensors so batches can cross thread boundaries in the prefetcher; the
/// trainer wraps the data in a [`crate::Tensor`] on the driver thread.
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: Array1<f32>,
    pub shape: ImageShape,
    pub labels: Vec<usize>,
}

impl Batch {
    /// Create a new batch, validating dimensions against the shape.
    pub fn new(images: Array1<f32>, shape: ImageShape, labels: Vec<usize>) -> Result<Self> {
        if images.len() != shape.flat_len() {
            return Err(Error::ShapeMismatch(format!(
                "batch images have {} values, shape {}x{}x{}x{} needs {}",
                images.len(),
                shape.n,
                shape.c,
                shape.h,
                shape.w,
                shape.flat_len()
            )));
        }
        if labels.len() != shape.n {
            return Err(Error::ShapeMismatch(format!(
                "batch has {} labels for {} samples",
                labels.len(),
                shape.n
            )));
        }
        Ok(Self { images, shape, labels })
    }

    /// Number of samples in the batch
    pub fn size(&self) -> usize {
        self.shape.n
    }
}
