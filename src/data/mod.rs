pub mod csv;
pub mod sample;

pub use self::csv::{load_samples, parse_samples, CsvOptions};
pub use sample::LabeledSample;
