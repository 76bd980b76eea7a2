//! End-to-end tests of the public pretraining API: train, checkpoint,
//! resume, and encode, the way the binary drives it.

use contrastar::checkpoint::CheckpointManager;
use contrastar::encode::DatasetEncoder;
use contrastar::train::{
    gram, identity_augmentation, jitter_augmentation, ClrConfig, ClrTrainer, ContrastiveLoss,
    ImageEncoder, InMemoryDataset, LabelAwareLoss, LinearEncoder, NtXentLoss,
};
use contrastar::Tensor;
use ndarray::arr1;
use std::sync::Arc;
use tempfile::TempDir;

fn small_config(base: &TempDir, epochs: usize) -> ClrConfig {
    let mut config = ClrConfig::default()
        .with_epochs(epochs)
        .with_batch_size(4)
        .with_num_workers(2)
        .with_checkpoint_base(base.path());
    config.head_out_features = 6;
    config
}

fn small_trainer(config: ClrConfig, seed: u64) -> ClrTrainer {
    let data = Arc::new(InMemoryDataset::synthetic(3, config.batch_size, (1, 2, 2), 5, seed));
    let encoder = LinearEncoder::new(4, 8, config.head_out_features, seed).unwrap();
    ClrTrainer::new(
        Box::new(encoder),
        data,
        Box::new(NtXentLoss::new(0.5).unwrap()),
        jitter_augmentation(0.05, seed),
        config,
    )
    .unwrap()
}

#[test]
fn test_train_then_encode_pipeline() {
    let base = TempDir::new().unwrap();
    let mut trainer = small_trainer(small_config(&base, 2), 11);
    let result = trainer.train().unwrap();
    assert_eq!(result.final_epoch, 2);
    assert!(result.final_loss.is_finite());

    // Reload the checkpointed encoder and sweep a fresh split with it
    let state = CheckpointManager::load_encoder_state(trainer.run_dir().join("encoder.pt")).unwrap();
    let mut encoder = LinearEncoder::new(4, 8, 6, 99).unwrap();
    encoder.load_state_dict(&state).unwrap();
    assert_eq!(encoder.state_dict(), trainer.encoder().state_dict());

    let split = InMemoryDataset::synthetic(2, 4, (1, 2, 2), 5, 23);
    let encoded = DatasetEncoder::new(&encoder).encode(&split).unwrap();
    assert_eq!(encoded.len(), 8);
    assert_eq!(encoded.dim, 6);
    assert!(encoded.encodings.iter().all(|v| v.is_finite()));
}

#[test]
fn test_resumed_run_starts_from_checkpointed_weights() {
    let base = TempDir::new().unwrap();
    let mut first = small_trainer(small_config(&base, 1), 7);
    first.train().unwrap();
    let saved = first.encoder().state_dict();

    let mut config = small_config(&base, 1);
    config.encoder_load_path = Some(first.run_dir().join("encoder.pt"));
    let data = Arc::new(InMemoryDataset::synthetic(3, 4, (1, 2, 2), 5, 7));
    let encoder = LinearEncoder::new(4, 8, 6, 1234).unwrap();
    let resumed = ClrTrainer::new(
        Box::new(encoder),
        data,
        Box::new(NtXentLoss::new(0.5).unwrap()),
        identity_augmentation(),
        config,
    )
    .unwrap();

    assert_eq!(resumed.encoder().state_dict(), saved);
}

#[test]
fn test_loss_history_matches_csv() {
    let base = TempDir::new().unwrap();
    let mut trainer = small_trainer(small_config(&base, 3), 5);
    trainer.train().unwrap();

    let csv = std::fs::read_to_string(trainer.run_dir().join("losses.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Loss"));
    let recorded: Vec<f32> = lines.map(|l| l.parse().unwrap()).collect();
    assert_eq!(recorded.len(), 3);
    for (csv_loss, epoch_loss) in recorded.iter().zip(trainer.epoch_losses()) {
        assert!((csv_loss - epoch_loss).abs() < 1e-4);
    }
}

#[test]
fn test_plain_loss_ignores_labels() {
    // Same similarities, different label assignments: NT-Xent must not care.
    let sims: Vec<f32> = (0..64).map(|i| ((i * 13 % 17) as f32) / 17.0).collect();
    let loss_fn = NtXentLoss::new(0.5).unwrap();

    let a = loss_fn
        .compute(&Tensor::new(arr1(&sims), false), 8, &[0, 1, 2, 3])
        .unwrap();
    let b = loss_fn
        .compute(&Tensor::new(arr1(&sims), false), 8, &[3, 3, 0, 1])
        .unwrap();
    assert_eq!(a.data()[0].to_bits(), b.data()[0].to_bits());
}

#[test]
fn test_label_aware_training_separates_from_plain() {
    // Both objectives run on the same data; they must produce different
    // gradients, hence different weights after one epoch.
    let run = |loss: Box<dyn ContrastiveLoss>| -> Vec<(String, Vec<f32>)> {
        let base = TempDir::new().unwrap();
        let config = small_config(&base, 1);
        let data = Arc::new(InMemoryDataset::synthetic(3, 4, (1, 2, 2), 5, 31));
        let encoder = LinearEncoder::new(4, 8, 6, 31).unwrap();
        let mut trainer =
            ClrTrainer::new(Box::new(encoder), data, loss, identity_augmentation(), config)
                .unwrap();
        trainer.train().unwrap();
        trainer.encoder().state_dict()
    };

    let plain = run(Box::new(NtXentLoss::new(0.5).unwrap()));
    let aware = run(Box::new(LabelAwareLoss::new(0.5, 0.1, 5).unwrap()));
    assert_ne!(plain, aware);
}

#[test]
fn test_similarity_matrix_of_normalized_embeddings() {
    // Hand-built unit-norm embeddings: the similarity matrix must be the
    // symmetric Gram matrix with a unit diagonal.
    let dim = 2;
    let rows = 4;
    let data = vec![1.0, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, -1.0];
    let embeddings = Tensor::new(arr1(&data), false);
    let sims = gram(&embeddings, rows, dim);
    let s = sims.data();

    for i in 0..rows {
        assert!((s[i * rows + i] - 1.0).abs() < 1e-6);
        for j in 0..rows {
            assert!((s[i * rows + j] - s[j * rows + i]).abs() < 1e-6);
            assert!(s[i * rows + j].abs() <= 1.0 + 1e-6);
        }
    }
    assert!((s[1] - 0.0).abs() < 1e-6);
    assert!((s[2] + 1.0).abs() < 1e-6);
}
