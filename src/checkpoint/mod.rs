//! Run-directory checkpoint persistence
//!
//! Each training run gets its own directory under a base path, named by local
//! timestamp. Encoder and optimizer state are JSON state dicts overwritten
//! every epoch; the loss history is flushed once at the end of the run.

use crate::optim::AdamWState;
use crate::{Error, Result};
use chrono::Local;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Named flat parameter buffers, the persistence form of encoder weights.
pub type StateDict = Vec<(String, Vec<f32>)>;

/// Manages one run's checkpoint directory.
pub struct CheckpointManager {
    run_dir: PathBuf,
}

impl CheckpointManager {
    /// Create a timestamp-named run directory under `base`.
    ///
    /// Two runs started within the same second share a directory; the later
    /// one simply overwrites.
    pub fn create(base: impl AsRef<Path>) -> Result<Self> {
        let run_dir = base.as_ref().join(Local::now().format("%b%d-%H:%M:%S").to_string());
        fs::create_dir_all(&run_dir)?;
        Ok(Self { run_dir })
    }

    /// The run directory files are written into
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Overwrite `encoder.pt` and `optimiser.pt` with the current state.
    pub fn save_state(&self, encoder: &StateDict, optimiser: &AdamWState) -> Result<()> {
        write_json(&self.run_dir.join("encoder.pt"), encoder)?;
        write_json(&self.run_dir.join("optimiser.pt"), optimiser)?;
        Ok(())
    }

    /// Keep an additional immutable snapshot of the encoder for one epoch.
    pub fn save_epoch_snapshot(&self, epoch: usize, encoder: &StateDict) -> Result<()> {
        write_json(&self.run_dir.join(format!("encoder-epoch{epoch}.pt")), encoder)
    }

    /// Write the per-epoch loss history as `losses.csv`.
    pub fn save_history(&self, losses: &[f32]) -> Result<()> {
        let mut file = File::create(self.run_dir.join("losses.csv"))?;
        writeln!(file, "Loss")?;
        for loss in losses {
            writeln!(file, "{loss}")?;
        }
        Ok(())
    }

    /// Read an encoder state dict back from disk.
    pub fn load_encoder_state(path: impl AsRef<Path>) -> Result<StateDict> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Serialization(format!("encoder state parse failed: {e}")))
    }

    /// Read an optimizer snapshot back from disk.
    pub fn load_optimiser_state(path: impl AsRef<Path>) -> Result<AdamWState> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Serialization(format!("optimiser state parse failed: {e}")))
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string(value)
        .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    Ok(())
}
