use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;

use crate::error::Result;
use crate::math::element::Element;
use crate::math::matrix::Matrix;
use crate::network::network::NeuralNetwork;

impl<T: Element, const INPUT: usize, const HIDDEN: usize, const OUTPUT: usize>
    NeuralNetwork<T, INPUT, HIDDEN, OUTPUT>
{
    /// Writes the hidden weight matrix blob followed by the output weight
    /// matrix blob. There is no header or version tag.
    pub fn write_binary<W: Write>(&self, out: &mut W) -> Result<()> {
        self.hidden_weights.write_binary(out)?;
        self.output_weights.write_binary(out)
    }

    /// Reads weights written by [`NeuralNetwork::write_binary`]. Each matrix
    /// header must match this network's shape.
    pub fn read_binary<R: Read>(input: &mut R) -> Result<Self> {
        let hidden_weights = Matrix::read_binary(input)?;
        let output_weights = Matrix::read_binary(input)?;
        Ok(NeuralNetwork::from_weights(hidden_weights, output_weights))
    }

    /// Writes the binary weight blob to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_binary(&mut writer)?;
        writer.flush()?;
        debug!(
            "saved {INPUT}x{HIDDEN}x{OUTPUT} network to {}",
            path.display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let net = Self::read_binary(&mut reader)?;
        debug!(
            "loaded {INPUT}x{HIDDEN}x{OUTPUT} network from {}",
            path.display()
        );
        Ok(net)
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    /// Every row and column count is checked against the network's shape.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
