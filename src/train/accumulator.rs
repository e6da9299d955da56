use crate::math::element::Element;
use crate::math::matrix::Matrix;

/// Running sums of per-sample weight deltas for one mini-batch.
///
/// Starts at zero; the network's weights are only touched once the whole
/// batch has been folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientAccumulator<T, const INPUT: usize, const HIDDEN: usize, const OUTPUT: usize> {
    hidden: Matrix<T, HIDDEN, INPUT>,
    output: Matrix<T, OUTPUT, HIDDEN>,
    samples: usize,
}

impl<T: Element, const INPUT: usize, const HIDDEN: usize, const OUTPUT: usize>
    GradientAccumulator<T, INPUT, HIDDEN, OUTPUT>
{
    pub fn new() -> Self {
        GradientAccumulator {
            hidden: Matrix::zeros(),
            output: Matrix::zeros(),
            samples: 0,
        }
    }

    /// An accumulator holding a single sample's deltas.
    pub fn from_sample(hidden: Matrix<T, HIDDEN, INPUT>, output: Matrix<T, OUTPUT, HIDDEN>) -> Self {
        GradientAccumulator {
            hidden,
            output,
            samples: 1,
        }
    }

    pub fn add(&mut self, hidden: &Matrix<T, HIDDEN, INPUT>, output: &Matrix<T, OUTPUT, HIDDEN>) {
        self.hidden += hidden;
        self.output += output;
        self.samples += 1;
    }

    /// Combines two partial sums; used as the reduction step of the parallel path.
    pub fn merge(mut self, other: Self) -> Self {
        self.hidden += other.hidden;
        self.output += other.output;
        self.samples += other.samples;
        self
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn hidden_sum(&self) -> &Matrix<T, HIDDEN, INPUT> {
        &self.hidden
    }

    pub fn output_sum(&self) -> &Matrix<T, OUTPUT, HIDDEN> {
        &self.output
    }

    /// `(hidden_sum, output_sum)`
    pub fn into_sums(self) -> (Matrix<T, HIDDEN, INPUT>, Matrix<T, OUTPUT, HIDDEN>) {
        (self.hidden, self.output)
    }
}

impl<T: Element, const INPUT: usize, const HIDDEN: usize, const OUTPUT: usize> Default
    for GradientAccumulator<T, INPUT, HIDDEN, OUTPUT>
{
    fn default() -> Self {
        Self::new()
    }
}
