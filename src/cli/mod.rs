//! CLI for contrastar
//!
//! Two commands: `train` runs contrastive pretraining, `encode` sweeps a
//! trained encoder over a dataset to produce the downstream artifact.

mod commands;

pub use commands::run_command;

use crate::autograd::MixedPrecisionConfig;
use crate::train::Device;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "contrastar", version, about = "Contrastive representation pretraining")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pretrain an encoder with a contrastive objective
    Train(TrainArgs),
    /// Encode a dataset with a trained encoder
    Encode(EncodeArgs),
}

/// Contrastive objective variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// Plain NT-Xent over augmented pairs
    Simclr,
    /// Label-aware soft targets (requires --label-range)
    Xclr,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Algorithm::Simclr => "simclr",
            Algorithm::Xclr => "xclr",
        })
    }
}

/// Compute device, resolved here and passed into the trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    Cpu,
}

impl DeviceArg {
    pub fn to_device(self) -> Device {
        match self {
            DeviceArg::Cpu => Device::Cpu,
        }
    }
}

impl std::fmt::Display for DeviceArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_device().name())
    }
}

/// Forward-pass precision policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrecisionArg {
    Fp32,
    Fp16,
    Bf16,
}

impl PrecisionArg {
    pub fn to_config(self) -> MixedPrecisionConfig {
        match self {
            PrecisionArg::Fp32 => MixedPrecisionConfig::fp32(),
            PrecisionArg::Fp16 => MixedPrecisionConfig::fp16(),
            PrecisionArg::Bf16 => MixedPrecisionConfig::bf16(),
        }
    }
}

impl std::fmt::Display for PrecisionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PrecisionArg::Fp32 => "fp32",
            PrecisionArg::Fp16 => "fp16",
            PrecisionArg::Bf16 => "bf16",
        })
    }
}

/// Shape of the synthetic demo dataset
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Batches per epoch
    #[arg(long, default_value_t = 16)]
    pub num_batches: usize,

    /// Image channels
    #[arg(long, default_value_t = 3)]
    pub channels: usize,

    /// Image height
    #[arg(long, default_value_t = 32)]
    pub height: usize,

    /// Image width
    #[arg(long, default_value_t = 32)]
    pub width: usize,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Contrastive objective to train with
    #[arg(long, value_enum, default_value_t = Algorithm::Simclr)]
    pub alg: Algorithm,

    /// Samples per batch
    #[arg(long)]
    pub batch_size: usize,

    /// Similarity temperature
    #[arg(long, default_value_t = 0.1)]
    pub tau: f32,

    /// Label temperature for the label-aware objective
    #[arg(long, default_value_t = 0.1)]
    pub tau_s: f32,

    /// Exclusive upper bound of the label universe
    #[arg(long)]
    pub label_range: Option<usize>,

    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Embedding width of the encoder head
    #[arg(long, default_value_t = 128)]
    pub head_out_features: usize,

    /// Hidden width of the reference encoder
    #[arg(long, default_value_t = 256)]
    pub hidden_features: usize,

    /// Prefetcher worker threads
    #[arg(long, default_value_t = 8)]
    pub num_workers: usize,

    /// Prior encoder weights to resume from
    #[arg(long)]
    pub encoder_load_path: Option<PathBuf>,

    /// Base directory for run checkpoint directories
    #[arg(long, default_value = "checkpoints/encoders")]
    pub checkpoint_base: PathBuf,

    /// Additionally keep an encoder snapshot every Kth epoch
    #[arg(long)]
    pub keep_every_kth: Option<usize>,

    #[arg(long, value_enum, default_value_t = PrecisionArg::Fp32)]
    pub precision: PrecisionArg,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,

    /// Augmentation jitter strength
    #[arg(long, default_value_t = 0.1)]
    pub jitter: f32,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Trained encoder state to load (encoder.pt)
    #[arg(long)]
    pub encoder_path: PathBuf,

    /// Directory the train.pt/test.pt artifacts are written into
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Samples per batch
    #[arg(long)]
    pub batch_size: usize,

    /// Exclusive upper bound of the label universe
    #[arg(long, default_value_t = 50)]
    pub label_range: usize,

    /// Embedding width of the encoder head
    #[arg(long, default_value_t = 128)]
    pub head_out_features: usize,

    /// Hidden width of the reference encoder
    #[arg(long, default_value_t = 256)]
    pub hidden_features: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_train_defaults() {
        let cli = Cli::parse_from(["contrastar", "train", "--batch-size", "64"]);
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.batch_size, 64);
                assert_eq!(args.alg, Algorithm::Simclr);
                assert_eq!(args.tau, 0.1);
                assert_eq!(args.epochs, 100);
                assert!(args.label_range.is_none());
            }
            Command::Encode(_) => panic!("expected train command"),
        }
    }

    #[test]
    fn test_parse_xclr_with_label_range() {
        let cli = Cli::parse_from([
            "contrastar",
            "train",
            "--alg",
            "xclr",
            "--batch-size",
            "32",
            "--label-range",
            "50",
            "--precision",
            "fp16",
        ]);
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.alg, Algorithm::Xclr);
                assert_eq!(args.label_range, Some(50));
                assert_eq!(args.precision, PrecisionArg::Fp16);
                assert_eq!(args.device, DeviceArg::Cpu);
                assert_eq!(args.device.to_device(), Device::Cpu);
            }
            Command::Encode(_) => panic!("expected train command"),
        }
    }

    #[test]
    fn test_parse_encode() {
        let cli = Cli::parse_from([
            "contrastar",
            "encode",
            "--encoder-path",
            "run/encoder.pt",
            "--batch-size",
            "16",
        ]);
        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.encoder_path, PathBuf::from("run/encoder.pt"));
                assert_eq!(args.batch_size, 16);
            }
            Command::Train(_) => panic!("expected encode command"),
        }
    }

    #[test]
    fn test_batch_size_is_required() {
        assert!(Cli::try_parse_from(["contrastar", "train"]).is_err());
    }
}
