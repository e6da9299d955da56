use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::sample::LabeledSample;
use crate::error::{Error, Result};
use crate::math::element::Element;
use crate::math::init::InitSampling;
use crate::math::matrix::Matrix;
use crate::math::vector::Vector;

/// A two-layer perceptron `INPUT → HIDDEN → OUTPUT` without biases.
///
/// The two weight matrices are the only state. Activations, errors and
/// deltas are recomputed for every sample and never stored here, so every
/// method except the mini-batch update (see `train`) borrows the network
/// immutably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetwork<T, const INPUT: usize, const HIDDEN: usize, const OUTPUT: usize> {
    pub(crate) hidden_weights: Matrix<T, HIDDEN, INPUT>,
    pub(crate) output_weights: Matrix<T, OUTPUT, HIDDEN>,
}

impl<T: Element, const INPUT: usize, const HIDDEN: usize, const OUTPUT: usize>
    NeuralNetwork<T, INPUT, HIDDEN, OUTPUT>
{
    /// Fresh weights drawn from a continuous uniform distribution scaled by
    /// each layer's fan-in.
    pub fn new<G: Rng + ?Sized>(rng: &mut G) -> Result<Self> {
        Self::new_with(rng, InitSampling::Continuous)
    }

    pub fn new_with<G: Rng + ?Sized>(rng: &mut G, sampling: InitSampling) -> Result<Self> {
        Ok(NeuralNetwork {
            hidden_weights: Matrix::random(INPUT, rng, sampling)?,
            output_weights: Matrix::random(HIDDEN, rng, sampling)?,
        })
    }

    pub fn from_weights(
        hidden_weights: Matrix<T, HIDDEN, INPUT>,
        output_weights: Matrix<T, OUTPUT, HIDDEN>,
    ) -> Self {
        NeuralNetwork {
            hidden_weights,
            output_weights,
        }
    }

    pub fn hidden_weights(&self) -> &Matrix<T, HIDDEN, INPUT> {
        &self.hidden_weights
    }

    pub fn output_weights(&self) -> &Matrix<T, OUTPUT, HIDDEN> {
        &self.output_weights
    }

    /// Forward pass. Returns the activated hidden layer and the activated
    /// output layer.
    pub fn feed_forward<A>(
        &self,
        input: &Vector<T, INPUT>,
        activation: A,
    ) -> (Vector<T, HIDDEN>, Vector<T, OUTPUT>)
    where
        A: Fn(T) -> T,
    {
        let hidden_unactivated = self.hidden_weights.dot_vector(input);
        let hidden = hidden_unactivated.apply(&activation);
        let output_unactivated = self.output_weights.dot_vector(&hidden);
        let output = output_unactivated.apply(&activation);
        (hidden, output)
    }

    /// Output error `expected - actual`, and the hidden error obtained by
    /// sending it back through the current output weights.
    ///
    /// Returns `(hidden_error, output_error)`.
    pub fn find_errors(
        &self,
        expected: &Vector<T, OUTPUT>,
        actual: &Vector<T, OUTPUT>,
    ) -> (Vector<T, HIDDEN>, Vector<T, OUTPUT>) {
        let output_error = expected - actual;
        let hidden_error = self.output_weights.transpose().dot_vector(&output_error);
        (hidden_error, output_error)
    }

    /// Weight delta for one layer:
    /// `(layer_error ⊙ activation_prime(layer_output)) ⊗ layer_input`.
    ///
    /// `layer_output` is the *activated* output of the layer. The result has
    /// the shape of the layer's weight matrix.
    pub fn back_propagate_core<const ROWS: usize, const COLS: usize, P>(
        layer_output: &Vector<T, ROWS>,
        layer_error: &Vector<T, ROWS>,
        layer_input: &Vector<T, COLS>,
        activation_prime: P,
    ) -> Matrix<T, ROWS, COLS>
    where
        P: Fn(T) -> T,
    {
        let primed = layer_output.apply(activation_prime);
        (layer_error * &primed).outer(layer_input)
    }

    /// Both weight deltas for one sample, as `(hidden_delta, output_delta)`.
    pub fn back_propagate<P>(
        hidden_error: &Vector<T, HIDDEN>,
        output_error: &Vector<T, OUTPUT>,
        hidden_output: &Vector<T, HIDDEN>,
        final_output: &Vector<T, OUTPUT>,
        input: &Vector<T, INPUT>,
        activation_prime: P,
    ) -> (Matrix<T, HIDDEN, INPUT>, Matrix<T, OUTPUT, HIDDEN>)
    where
        P: Fn(T) -> T,
    {
        let output_delta =
            Self::back_propagate_core(final_output, output_error, hidden_output, &activation_prime);
        let hidden_delta =
            Self::back_propagate_core(hidden_output, hidden_error, input, &activation_prime);
        (hidden_delta, output_delta)
    }

    /// Forward pass, errors and backpropagation for a single sample.
    ///
    /// Does not touch the weights; returns `(hidden_delta, output_delta)`.
    pub fn train<A, P>(
        &self,
        input: &Vector<T, INPUT>,
        expected: &Vector<T, OUTPUT>,
        activation: A,
        activation_prime: P,
    ) -> (Matrix<T, HIDDEN, INPUT>, Matrix<T, OUTPUT, HIDDEN>)
    where
        A: Fn(T) -> T,
        P: Fn(T) -> T,
    {
        let (hidden_output, final_output) = self.feed_forward(input, activation);
        let (hidden_error, output_error) = self.find_errors(expected, &final_output);
        Self::back_propagate(
            &hidden_error,
            &output_error,
            &hidden_output,
            &final_output,
            input,
            activation_prime,
        )
    }

    /// Softmax over the activated output layer.
    pub fn predict<A>(&self, input: &Vector<T, INPUT>, activation: A) -> Vector<T, OUTPUT>
    where
        A: Fn(T) -> T,
    {
        let (_, output) = self.feed_forward(input, activation);
        output.softmax()
    }

    /// Predicted class of one sample.
    pub fn predict_sample<A>(&self, sample: &LabeledSample<T, INPUT>, activation: A) -> Result<usize>
    where
        A: Fn(T) -> T,
    {
        self.predict(&sample.input, activation).argmax()
    }

    /// Fraction of `samples` whose predicted class equals their label.
    pub fn predict_samples<A>(&self, samples: &[LabeledSample<T, INPUT>], activation: A) -> Result<f64>
    where
        A: Fn(T) -> T,
    {
        if samples.is_empty() {
            return Err(Error::EmptyDataset);
        }
        let mut correct = 0usize;
        for sample in samples {
            if self.predict_sample(sample, &activation)? == sample.label {
                correct += 1;
            }
        }
        Ok(correct as f64 / samples.len() as f64)
    }

    /// Mean over `samples` of the mean squared difference between the one-hot
    /// target and the activated output layer.
    pub fn mean_output_error<A>(&self, samples: &[LabeledSample<T, INPUT>], activation: A) -> Result<f64>
    where
        A: Fn(T) -> T,
    {
        if samples.is_empty() {
            return Err(Error::EmptyDataset);
        }
        let mut total = 0.0;
        for sample in samples {
            let expected = sample.one_hot::<OUTPUT>()?;
            let (_, output) = self.feed_forward(&sample.input, &activation);
            let diff = &expected - &output;
            let squared = (&diff * &diff).sum().to_f64();
            total += if OUTPUT == 0 { 0.0 } else { squared / OUTPUT as f64 };
        }
        Ok(total / samples.len() as f64)
    }
}
