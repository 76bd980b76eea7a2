//! Frozen-encoder dataset encoding
//!
//! After pretraining, the encoder is swept once over a dataset to produce the
//! fixed-length feature artifact the downstream linear classifier consumes:
//! a `{ encodings, dim, labels }` record per split, written as JSON.

use crate::train::{DataSource, ImageEncoder};
use crate::{Error, Result, Tensor};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Encoded split artifact: `encodings` is row-major `len(labels) x dim`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedDataset {
    pub encodings: Vec<f32>,
    pub dim: usize,
    pub labels: Vec<usize>,
}

impl EncodedDataset {
    /// Number of encoded samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Load an artifact back from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Serialization(format!("encoded dataset parse failed: {e}")))
    }
}

/// Sweeps a frozen encoder over batches without augmentation or gradients.
pub struct DatasetEncoder<'a> {
    encoder: &'a dyn ImageEncoder,
}

impl<'a> DatasetEncoder<'a> {
    pub fn new(encoder: &'a dyn ImageEncoder) -> Self {
        Self { encoder }
    }

    /// Encode every batch of `data` in order.
    pub fn encode(&self, data: &dyn DataSource) -> Result<EncodedDataset> {
        let dim = self.encoder.out_features();
        let mut encodings = Vec::new();
        let mut labels = Vec::new();

        for index in 0..data.num_batches() {
            let batch = data.batch(index)?;
            let images = Tensor::new(batch.images.clone(), false);
            let output = self.encoder.forward(&images, &batch.shape);
            encodings.extend_from_slice(
                output.data().as_slice().expect("encoder output is contiguous"),
            );
            labels.extend_from_slice(&batch.labels);
        }

        Ok(EncodedDataset { encodings, dim, labels })
    }

    /// Encode a split and write it as JSON to `path`.
    pub fn encode_to_file(&self, data: &dyn DataSource, path: impl AsRef<Path>) -> Result<()> {
        let encoded = self.encode(data)?;
        let json = serde_json::to_string(&encoded)
            .map_err(|e| Error::Serialization(format!("encoded dataset write failed: {e}")))?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
