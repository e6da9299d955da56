pub mod network;
mod persistence;

pub use network::NeuralNetwork;
