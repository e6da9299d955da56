use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::math::init::InitSampling;

/// What `train_batch` does with the samples left over after the last full
/// mini-batch of an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Skip them; they are reported in `EpochStats::dropped_samples`.
    #[default]
    Drop,
    /// Train them as one short mini-batch averaged over its own length.
    Partial,
}

/// Hyperparameters for a `train_batch` run.
///
/// # Fields
/// - `epochs`          — full passes over the training samples
/// - `mini_batch_size` — samples per weight update
/// - `learning_rate`   — step size of the first epoch
/// - `decay_factor`    — the learning rate is multiplied by this after every epoch
/// - `activation`      — activation used by the CLI driver for both layers
/// - `remainder`       — handling of a trailing partial mini-batch
/// - `parallel`        — compute per-sample gradients on the rayon pool
/// - `track_metrics`   — evaluate error and accuracy after every epoch
/// - `seed`            — seed for weight initialisation; `None` draws from entropy
/// - `init`            — how initial weights are sampled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub mini_batch_size: usize,
    pub learning_rate: f64,
    pub decay_factor: f64,
    pub activation: ActivationFunction,
    pub remainder: RemainderPolicy,
    pub parallel: bool,
    pub track_metrics: bool,
    pub seed: Option<u64>,
    pub init: InitSampling,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 4,
            mini_batch_size: 50,
            learning_rate: 0.7,
            decay_factor: 0.9,
            activation: ActivationFunction::ReLU,
            remainder: RemainderPolicy::Drop,
            parallel: false,
            track_metrics: true,
            seed: None,
            init: InitSampling::Continuous,
        }
    }
}

impl TrainConfig {
    /// Creates a config with the given schedule and defaults for everything else.
    pub fn new(epochs: usize, mini_batch_size: usize, learning_rate: f64, decay_factor: f64) -> Self {
        TrainConfig {
            epochs,
            mini_batch_size,
            learning_rate,
            decay_factor,
            ..TrainConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mini_batch_size == 0 {
            return Err(Error::InvalidHyperparameter {
                name: "mini_batch_size",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidHyperparameter {
                name: "learning_rate",
                reason: format!("{} is not a positive finite number", self.learning_rate),
            });
        }
        if !(self.decay_factor.is_finite() && self.decay_factor > 0.0) {
            return Err(Error::InvalidHyperparameter {
                name: "decay_factor",
                reason: format!("{} is not a positive finite number", self.decay_factor),
            });
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Reads a config from JSON; missing fields take their default values.
    pub fn load_json(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
