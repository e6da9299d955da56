use serde::{Deserialize, Serialize};

/// Per-epoch training statistics returned by `train_batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Learning rate used for every update of this epoch (before decay).
    pub learning_rate: f64,
    /// Weight updates applied during the epoch.
    pub batches: usize,
    /// Samples that contributed to a weight update.
    pub samples_seen: usize,
    /// Trailing samples skipped because they did not fill a mini-batch.
    pub dropped_samples: usize,
    /// Mean squared output error over the training set after the epoch;
    /// only set when metrics are tracked.
    pub mean_output_error: Option<f64>,
    /// Training accuracy in [0, 1] after the epoch; only set when metrics are tracked.
    pub accuracy: Option<f64>,
    /// Wall-clock duration of the epoch's updates in milliseconds.
    pub elapsed_ms: u64,
}
