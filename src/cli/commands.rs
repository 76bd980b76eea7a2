//! Command dispatch for the contrastar binary

use super::{Algorithm, Cli, Command, DatasetArgs, EncodeArgs, TrainArgs};
use crate::checkpoint::CheckpointManager;
use crate::encode::DatasetEncoder;
use crate::train::{
    jitter_augmentation, ClrConfig, ClrTrainer, ContrastiveLoss, ImageEncoder, InMemoryDataset,
    LabelAwareLoss, LinearEncoder, NtXentLoss,
};
use crate::{Error, Result};
use std::sync::Arc;

/// Execute the parsed command.
pub fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train(args) => run_train(&args),
        Command::Encode(args) => run_encode(&args),
    }
}

fn image_pixels(dataset: &DatasetArgs) -> usize {
    dataset.channels * dataset.height * dataset.width
}

fn run_train(args: &TrainArgs) -> Result<()> {
    let label_range = match args.alg {
        Algorithm::Simclr => args.label_range.unwrap_or(10),
        Algorithm::Xclr => args.label_range.ok_or(Error::MissingLabelRange)?,
    };

    let loss: Box<dyn ContrastiveLoss> = match args.alg {
        Algorithm::Simclr => Box::new(NtXentLoss::new(args.tau)?),
        Algorithm::Xclr => Box::new(LabelAwareLoss::new(args.tau, args.tau_s, label_range)?),
    };

    let mut config = ClrConfig::default()
        .with_epochs(args.epochs)
        .with_batch_size(args.batch_size)
        .with_num_workers(args.num_workers)
        .with_checkpoint_base(&args.checkpoint_base)
        .with_precision(args.precision.to_config());
    config.head_out_features = args.head_out_features;
    config.device = args.device.to_device();
    config.encoder_load_path = args.encoder_load_path.clone();
    config.keep_every_kth = args.keep_every_kth;
    config.seed = args.seed;

    let data = Arc::new(InMemoryDataset::synthetic(
        args.dataset.num_batches,
        args.batch_size,
        (args.dataset.channels, args.dataset.height, args.dataset.width),
        label_range,
        args.seed,
    ));
    let encoder = LinearEncoder::new(
        image_pixels(&args.dataset),
        args.hidden_features,
        args.head_out_features,
        args.seed,
    )?;

    println!(
        "Training {} for {} epochs ({} batches/epoch, batch size {})",
        loss.name(),
        args.epochs,
        args.dataset.num_batches,
        args.batch_size
    );

    let mut trainer = ClrTrainer::new(
        Box::new(encoder),
        data,
        loss,
        jitter_augmentation(args.jitter, args.seed),
        config,
    )?;
    let run_dir = trainer.run_dir().to_path_buf();
    let result = trainer.train()?;

    println!(
        "Done: final loss {:.4}, best loss {:.4}, {:.2}s",
        result.final_loss, result.best_loss, result.elapsed_secs
    );
    println!("Checkpoints written to {}", run_dir.display());
    Ok(())
}

fn run_encode(args: &EncodeArgs) -> Result<()> {
    let mut encoder = LinearEncoder::new(
        image_pixels(&args.dataset),
        args.hidden_features,
        args.head_out_features,
        args.seed,
    )?;
    let state = CheckpointManager::load_encoder_state(&args.encoder_path)?;
    encoder.load_state_dict(&state)?;

    // Disjoint seeds so the two splits draw different samples
    let train_split = InMemoryDataset::synthetic(
        args.dataset.num_batches,
        args.batch_size,
        (args.dataset.channels, args.dataset.height, args.dataset.width),
        args.label_range,
        args.seed,
    );
    let test_split = InMemoryDataset::synthetic(
        args.dataset.num_batches,
        args.batch_size,
        (args.dataset.channels, args.dataset.height, args.dataset.width),
        args.label_range,
        args.seed.wrapping_add(1),
    );

    std::fs::create_dir_all(&args.output_dir)?;
    let sweep = DatasetEncoder::new(&encoder);
    let train_path = args.output_dir.join("train.pt");
    let test_path = args.output_dir.join("test.pt");
    sweep.encode_to_file(&train_split, &train_path)?;
    sweep.encode_to_file(&test_split, &test_path)?;

    println!("Wrote {} and {}", train_path.display(), test_path.display());
    Ok(())
}
