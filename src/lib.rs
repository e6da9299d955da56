pub mod activation;
pub mod data;
pub mod error;
pub mod math;
pub mod network;
pub mod train;

// Convenience re-exports
pub use activation::activation::ActivationFunction;
pub use data::sample::LabeledSample;
pub use error::{Error, Result};
pub use math::element::Element;
pub use math::init::InitSampling;
pub use math::matrix::Matrix;
pub use math::vector::Vector;
pub use network::network::NeuralNetwork;
pub use train::{EpochStats, GradientAccumulator, RemainderPolicy, TrainConfig};
