//! Dataset adapter and threaded batch prefetching

use crate::train::{Batch, ImageShape};
use crate::{Error, Result};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// A source of training batches.
///
/// Implementations must be cheap to index repeatedly: the prefetcher calls
/// `batch` from worker threads, one index stride per worker, every epoch.
pub trait DataSource: Send + Sync {
    /// Number of batches per epoch
    fn num_batches(&self) -> usize;

    /// Load the batch at `index`
    fn batch(&self, index: usize) -> Result<Batch>;

    /// Exclusive upper bound of the label universe, when known
    fn label_range(&self) -> Option<usize>;
}

/// Dataset held fully in memory as pre-built batches.
pub struct InMemoryDataset {
    batches: Vec<Batch>,
    label_range: Option<usize>,
}

impl InMemoryDataset {
    pub fn new(batches: Vec<Batch>, label_range: Option<usize>) -> Self {
        Self { batches, label_range }
    }

    /// Deterministic random dataset for demos and tests.
    pub fn synthetic(
        num_batches: usize,
        batch_size: usize,
        (c, h, w): (usize, usize, usize),
        label_range: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let shape = ImageShape::new(batch_size, c, h, w);
        let batches = (0..num_batches)
            .map(|_| {
                let images: Vec<f32> =
                    (0..shape.flat_len()).map(|_| rng.gen_range(-1.0..1.0)).collect();
                let labels: Vec<usize> =
                    (0..batch_size).map(|_| rng.gen_range(0..label_range)).collect();
                Batch { images: Array1::from(images), shape, labels }
            })
            .collect();
        Self { batches, label_range: Some(label_range) }
    }
}

impl DataSource for InMemoryDataset {
    fn num_batches(&self) -> usize {
        self.batches.len()
    }

    fn batch(&self, index: usize) -> Result<Batch> {
        self.batches.get(index).cloned().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "batch index {index} out of range for {} batches",
                self.batches.len()
            ))
        })
    }

    fn label_range(&self) -> Option<usize> {
        self.label_range
    }
}

/// Pluggable per-batch augmentation producing a new image buffer.
pub type Augmentation = Box<dyn FnMut(&Batch) -> Array1<f32>>;

/// Augmentation that returns the images unchanged.
pub fn identity_augmentation() -> Augmentation {
    Box::new(|batch: &Batch| batch.images.clone())
}

/// Additive uniform pixel jitter, the demo stand-in for real augmentation
/// recipes.
pub fn jitter_augmentation(strength: f32, seed: u64) -> Augmentation {
    let mut rng = StdRng::seed_from_u64(seed);
    Box::new(move |batch: &Batch| {
        batch.images.mapv(|v| v + rng.gen_range(-strength..=strength))
    })
}

/// Threaded batch prefetcher with a bounded queue per worker.
///
/// Worker `w` loads batch indices congruent to `w` modulo the worker count;
/// the consumer round-robins across the workers' channels, so batches come
/// out in exact dataset order regardless of per-worker timing. Dropping the
/// prefetcher mid-epoch closes the channels and the workers exit on their
/// next send.
pub struct Prefetcher {
    receivers: Vec<mpsc::Receiver<Result<Batch>>>,
    handles: Vec<thread::JoinHandle<()>>,
    num_batches: usize,
    next: usize,
}

impl Prefetcher {
    pub fn new(source: Arc<dyn DataSource>, num_workers: usize, depth: usize) -> Self {
        let workers = num_workers.max(1);
        let depth = depth.max(1);
        let num_batches = source.num_batches();

        let mut receivers = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for w in 0..workers {
            let (tx, rx) = mpsc::sync_channel(depth);
            let src = Arc::clone(&source);
            handles.push(thread::spawn(move || {
                let mut index = w;
                while index < num_batches {
                    if tx.send(src.batch(index)).is_err() {
                        break;
                    }
                    index += workers;
                }
            }));
            receivers.push(rx);
        }

        Self { receivers, handles, num_batches, next: 0 }
    }
}

impl Iterator for Prefetcher {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.num_batches {
            return None;
        }
        let worker = self.next % self.receivers.len();
        self.next += 1;
        self.receivers[worker].recv().ok()
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.receivers.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_is_deterministic() {
        let a = InMemoryDataset::synthetic(2, 4, (1, 2, 2), 5, 42);
        let b = InMemoryDataset::synthetic(2, 4, (1, 2, 2), 5, 42);
        for i in 0..2 {
            let (ba, bb) = (a.batch(i).unwrap(), b.batch(i).unwrap());
            assert_eq!(ba.images, bb.images);
            assert_eq!(ba.labels, bb.labels);
        }
    }

    #[test]
    fn test_synthetic_labels_in_range() {
        let data = InMemoryDataset::synthetic(3, 8, (1, 2, 2), 4, 7);
        assert_eq!(data.label_range(), Some(4));
        for i in 0..3 {
            for &label in &data.batch(i).unwrap().labels {
                assert!(label < 4);
            }
        }
    }

    #[test]
    fn test_batch_index_out_of_range_errors() {
        let data = InMemoryDataset::synthetic(2, 4, (1, 2, 2), 5, 42);
        let err = data.batch(2).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArgument(_)));
    }

    #[test]
    fn test_prefetcher_preserves_order() {
        let data: Arc<dyn DataSource> =
            Arc::new(InMemoryDataset::synthetic(11, 2, (1, 2, 2), 3, 1));
        for workers in [1usize, 2, 4, 8] {
            let fetched: Vec<Batch> = Prefetcher::new(Arc::clone(&data), workers, 2)
                .map(|b| b.unwrap())
                .collect();
            assert_eq!(fetched.len(), 11);
            for (i, batch) in fetched.iter().enumerate() {
                let direct = data.batch(i).unwrap();
                assert_eq!(batch.images, direct.images);
                assert_eq!(batch.labels, direct.labels);
            }
        }
    }

    #[test]
    fn test_prefetcher_early_drop_joins_workers() {
        let data: Arc<dyn DataSource> =
            Arc::new(InMemoryDataset::synthetic(64, 2, (1, 2, 2), 3, 1));
        let mut prefetcher = Prefetcher::new(data, 4, 1);
        let _ = prefetcher.next();
        drop(prefetcher); // must not deadlock on blocked senders
    }

    #[test]
    fn test_identity_augmentation_copies() {
        let data = InMemoryDataset::synthetic(1, 2, (1, 2, 2), 3, 1);
        let batch = data.batch(0).unwrap();
        let mut aug = identity_augmentation();
        assert_eq!(aug(&batch), batch.images);
    }

    #[test]
    fn test_jitter_stays_within_strength() {
        let data = InMemoryDataset::synthetic(1, 4, (1, 2, 2), 3, 1);
        let batch = data.batch(0).unwrap();
        let mut aug = jitter_augmentation(0.05, 9);
        let jittered = aug(&batch);
        for (j, orig) in jittered.iter().zip(batch.images.iter()) {
            assert!((j - orig).abs() <= 0.05 + 1e-6);
        }
    }

    #[test]
    fn test_jitter_differs_between_calls() {
        let data = InMemoryDataset::synthetic(1, 4, (1, 2, 2), 3, 1);
        let batch = data.batch(0).unwrap();
        let mut aug = jitter_augmentation(0.1, 9);
        let first = aug(&batch);
        let second = aug(&batch);
        assert_ne!(first, second);
    }
}
