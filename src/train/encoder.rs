//! Encoder trait and the minimal linear reference encoder

use crate::autograd::ops::{add_bias, matmul, relu};
use crate::checkpoint::StateDict;
use crate::train::ImageShape;
use crate::{Error, Result, Tensor};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A trainable image encoder.
///
/// The trainer only sees this trait: a forward pass over a flattened image
/// tensor, shared parameter handles for the optimizer, and a state dict for
/// checkpointing. `images` may hold more rows than `shape.n` — the trainer
/// passes the doubly-augmented batch with `2N` rows.
pub trait ImageEncoder {
    /// Encode a batch of flattened images into `rows * out_features` values.
    fn forward(&self, images: &Tensor, shape: &ImageShape) -> Tensor;

    /// Width of the embedding produced per sample
    fn out_features(&self) -> usize;

    /// Shared handles to every trainable parameter
    fn parameters(&self) -> Vec<Tensor>;

    /// Named parameter snapshot for persistence
    fn state_dict(&self) -> StateDict;

    /// Restore parameters from a snapshot
    fn load_state_dict(&mut self, state: &StateDict) -> Result<()>;
}

/// Two-layer perceptron encoder: flatten, linear, relu, linear.
///
/// The minimal reference collaborator for the contrastive loop; real encoder
/// architectures plug in through [`ImageEncoder`].
pub struct LinearEncoder {
    in_features: usize,
    hidden_features: usize,
    out_features: usize,
    w1: Tensor,
    b1: Tensor,
    w2: Tensor,
    b2: Tensor,
}

impl LinearEncoder {
    /// Create an encoder with uniform fan-in scaled initialization.
    pub fn new(
        in_features: usize,
        hidden_features: usize,
        out_features: usize,
        seed: u64,
    ) -> Result<Self> {
        if in_features == 0 || hidden_features == 0 || out_features == 0 {
            return Err(Error::InvalidArgument(format!(
                "encoder dimensions must be positive, got {in_features}x{hidden_features}x{out_features}"
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut init = |len: usize, fan_in: usize| -> Tensor {
            let bound = 1.0 / (fan_in as f32).sqrt();
            let data: Vec<f32> = (0..len).map(|_| rng.gen_range(-bound..bound)).collect();
            Tensor::new(Array1::from(data), true)
        };

        Ok(Self {
            in_features,
            hidden_features,
            out_features,
            w1: init(in_features * hidden_features, in_features),
            b1: init(hidden_features, in_features),
            w2: init(hidden_features * out_features, hidden_features),
            b2: init(out_features, hidden_features),
        })
    }

    fn entries(&self) -> [(&'static str, &Tensor); 4] {
        [("w1", &self.w1), ("b1", &self.b1), ("w2", &self.w2), ("b2", &self.b2)]
    }
}

impl ImageEncoder for LinearEncoder {
    fn forward(&self, images: &Tensor, shape: &ImageShape) -> Tensor {
        let pixels = shape.pixels();
        assert_eq!(pixels, self.in_features, "image pixels do not match encoder input width");
        assert_eq!(images.len() % pixels, 0, "image tensor is not a whole number of samples");
        let rows = images.len() / pixels;

        let h = matmul(images, &self.w1, rows, self.in_features, self.hidden_features);
        let h = relu(&add_bias(&h, &self.b1, rows, self.hidden_features));
        let out = matmul(&h, &self.w2, rows, self.hidden_features, self.out_features);
        add_bias(&out, &self.b2, rows, self.out_features)
    }

    fn out_features(&self) -> usize {
        self.out_features
    }

    fn parameters(&self) -> Vec<Tensor> {
        self.entries().iter().map(|(_, t)| (*t).clone()).collect()
    }

    fn state_dict(&self) -> StateDict {
        self.entries().iter().map(|(name, t)| ((*name).to_string(), t.to_vec())).collect()
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        for (name, values) in state {
            let target = match name.as_str() {
                "w1" => &self.w1,
                "b1" => &self.b1,
                "w2" => &self.w2,
                "b2" => &self.b2,
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "unknown parameter {other} in encoder state"
                    )))
                }
            };
            if values.len() != target.len() {
                return Err(Error::ShapeMismatch(format!(
                    "parameter {name} has {} values, expected {}",
                    values.len(),
                    target.len()
                )));
            }
            target.data_mut().assign(&Array1::from(values.clone()));
        }
        Ok(())
    }
}
