pub mod accumulator;
pub mod epoch_stats;
pub mod train_config;
pub mod trainer;

pub use accumulator::GradientAccumulator;
pub use epoch_stats::EpochStats;
pub use train_config::{RemainderPolicy, TrainConfig};
