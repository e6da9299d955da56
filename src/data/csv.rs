/// CSV ingestion for labeled samples.
///
/// Each record is `label, f_1, ..., f_N`: the class index first, then exactly
/// `N` numeric features (the MNIST CSV layout). Features are divided by
/// `CsvOptions::input_scale` while parsing, so raw 0–255 pixels can be fed in
/// as-is with a scale of 255.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::sample::LabeledSample;
use crate::error::{Error, Result};
use crate::math::element::Element;
use crate::math::vector::Vector;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Skip the first record.
    pub has_header: bool,
    /// Every feature is divided by this value.
    pub input_scale: f64,
    /// Stop after this many samples.
    pub limit: Option<usize>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            has_header: false,
            input_scale: 1.0,
            limit: None,
        }
    }
}

/// Opens `path` and parses every record into a sample.
pub fn load_samples<T: Element, const N: usize>(
    path: impl AsRef<Path>,
    options: &CsvOptions,
) -> Result<Vec<LabeledSample<T, N>>> {
    let path = path.as_ref();
    debug!("loading samples from {}", path.display());
    let file = File::open(path)?;
    parse_samples(BufReader::new(file), options)
}

/// Parses samples from any reader. Record numbers in errors are 1-based
/// and do not count the header.
pub fn parse_samples<T: Element, const N: usize, Rd: Read>(
    reader: Rd,
    options: &CsvOptions,
) -> Result<Vec<LabeledSample<T, N>>> {
    if options.input_scale == 0.0 || !options.input_scale.is_finite() {
        return Err(Error::InvalidHyperparameter {
            name: "input_scale",
            reason: format!("{} is not a usable divisor", options.input_scale),
        });
    }

    let mut records = csv::ReaderBuilder::new()
        .has_headers(options.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (idx, record) in records.records().enumerate() {
        if options.limit.is_some_and(|limit| samples.len() >= limit) {
            break;
        }
        let record = record?;
        let number = idx + 1;

        let label_cell = record.get(0).unwrap_or_default();
        let label = label_cell.parse::<usize>().map_err(|_| Error::Parse {
            record: number,
            message: format!("label '{label_cell}' is not a non-negative integer"),
        })?;

        let n_features = record.len().saturating_sub(1);
        if n_features != N {
            return Err(Error::dimension(
                format!("{N} features in record {number}"),
                format!("{n_features} features"),
            ));
        }

        let input = record
            .iter()
            .skip(1)
            .map(|cell| {
                cell.parse::<f64>()
                    .map(|x| T::from_f64(x / options.input_scale))
                    .map_err(|_| Error::Parse {
                        record: number,
                        message: format!("feature '{cell}' is not a number"),
                    })
            })
            .collect::<Result<Vec<T>>>()?;

        samples.push(LabeledSample::new(Vector::from_vec(input)?, label));
    }

    debug!("parsed {} samples of {N} features", samples.len());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_label_then_scaled_features() {
        let data = "7, 0, 255, 51\n2, 255, 0, 0\n";
        let options = CsvOptions { input_scale: 255.0, ..CsvOptions::default() };
        let samples: Vec<LabeledSample<f32, 3>> = parse_samples(data.as_bytes(), &options).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, 7);
        assert_eq!(samples[0].input.as_slice(), &[0.0, 1.0, 0.2]);
        assert_eq!(samples[1].label, 2);
    }

    #[test]
    fn header_and_limit_are_honoured() {
        let data = "label,a,b\n0,1,2\n1,3,4\n0,5,6\n";
        let options = CsvOptions { has_header: true, limit: Some(2), ..CsvOptions::default() };
        let samples: Vec<LabeledSample<f64, 2>> = parse_samples(data.as_bytes(), &options).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].input.as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn wrong_feature_count_is_a_dimension_error() {
        let data = "0,1,2\n1,3\n";
        let err = parse_samples::<f32, 2, _>(data.as_bytes(), &CsvOptions::default()).unwrap_err();
        match err {
            Error::DimensionMismatch { expected, .. } => assert!(expected.contains("record 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_cells_report_the_record() {
        let err = parse_samples::<f32, 2, _>("x,1,2\n".as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { record: 1, .. }));

        let err = parse_samples::<f32, 2, _>("0,1,2\n1,1,oops\n".as_bytes(), &CsvOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Parse { record: 2, .. }));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let options = CsvOptions { input_scale: 0.0, ..CsvOptions::default() };
        assert!(parse_samples::<f32, 1, _>("0,1\n".as_bytes(), &options).is_err());
    }
}
