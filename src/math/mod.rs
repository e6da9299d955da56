pub mod element;
pub mod init;
pub mod matrix;
pub mod vector;

pub use element::Element;
pub use init::InitSampling;
pub use matrix::Matrix;
pub use vector::Vector;
