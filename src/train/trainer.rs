use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::data::sample::LabeledSample;
use crate::error::{Error, Result};
use crate::math::element::Element;
use crate::math::matrix::Matrix;
use crate::math::vector::Vector;
use crate::network::network::NeuralNetwork;
use crate::train::accumulator::GradientAccumulator;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::{RemainderPolicy, TrainConfig};

type Deltas<T, const INPUT: usize, const HIDDEN: usize, const OUTPUT: usize> =
    (Matrix<T, HIDDEN, INPUT>, Matrix<T, OUTPUT, HIDDEN>);

impl<T: Element, const INPUT: usize, const HIDDEN: usize, const OUTPUT: usize>
    NeuralNetwork<T, INPUT, HIDDEN, OUTPUT>
{
    /// Sums the weight deltas of the first `batch_size` samples.
    ///
    /// Each sample's expected output is the one-hot vector of its label. The
    /// result is the plain sum, not the average; returns
    /// `(hidden_delta_sum, output_delta_sum)`.
    pub fn train_mini_batch<A, P>(
        &self,
        samples: &[LabeledSample<T, INPUT>],
        activation: A,
        activation_prime: P,
        batch_size: usize,
    ) -> Result<Deltas<T, INPUT, HIDDEN, OUTPUT>>
    where
        A: Fn(T) -> T,
        P: Fn(T) -> T,
    {
        self.train_mini_batch_with(samples, activation, activation_prime, batch_size, |_, _, _| {})
    }

    /// Same as [`train_mini_batch`](Self::train_mini_batch), calling
    /// `observer(network, expected, accumulator)` after each sample has been
    /// folded into the accumulator.
    pub fn train_mini_batch_with<A, P, O>(
        &self,
        samples: &[LabeledSample<T, INPUT>],
        activation: A,
        activation_prime: P,
        batch_size: usize,
        mut observer: O,
    ) -> Result<Deltas<T, INPUT, HIDDEN, OUTPUT>>
    where
        A: Fn(T) -> T,
        P: Fn(T) -> T,
        O: FnMut(&Self, &Vector<T, OUTPUT>, &GradientAccumulator<T, INPUT, HIDDEN, OUTPUT>),
    {
        let batch = batch_window(samples, batch_size)?;
        let mut acc = GradientAccumulator::new();
        for sample in batch {
            let expected = sample.one_hot::<OUTPUT>()?;
            let (hidden_delta, output_delta) =
                self.train(&sample.input, &expected, &activation, &activation_prime);
            acc.add(&hidden_delta, &output_delta);
            observer(self, &expected, &acc);
        }
        Ok(acc.into_sums())
    }

    /// Parallel version of [`train_mini_batch`](Self::train_mini_batch).
    ///
    /// Per-sample deltas are computed on the rayon pool against the current
    /// weights and summed by a reduction; the network is only borrowed.
    pub fn train_mini_batch_par<A, P>(
        &self,
        samples: &[LabeledSample<T, INPUT>],
        activation: A,
        activation_prime: P,
        batch_size: usize,
    ) -> Result<Deltas<T, INPUT, HIDDEN, OUTPUT>>
    where
        A: Fn(T) -> T + Sync,
        P: Fn(T) -> T + Sync,
    {
        let batch = batch_window(samples, batch_size)?;
        let acc = batch
            .par_iter()
            .map(|sample| -> Result<GradientAccumulator<T, INPUT, HIDDEN, OUTPUT>> {
                let expected = sample.one_hot::<OUTPUT>()?;
                let (hidden_delta, output_delta) =
                    self.train(&sample.input, &expected, &activation, &activation_prime);
                Ok(GradientAccumulator::from_sample(hidden_delta, output_delta))
            })
            .try_reduce(GradientAccumulator::new, |a, b| Ok(a.merge(b)))?;
        Ok(acc.into_sums())
    }

    /// Trains one mini-batch and applies the averaged update
    /// `weights += delta_sum * (learning_rate / batch_size)`.
    ///
    /// With `parallel` the per-sample deltas come from
    /// [`train_mini_batch_par`](Self::train_mini_batch_par). This is the only
    /// place the weights change; on error they are left untouched.
    pub fn train_batch_inner<A, P>(
        &mut self,
        samples: &[LabeledSample<T, INPUT>],
        learning_rate: T,
        activation: A,
        activation_prime: P,
        batch_size: usize,
        parallel: bool,
    ) -> Result<()>
    where
        A: Fn(T) -> T + Sync,
        P: Fn(T) -> T + Sync,
    {
        let (hidden_sum, output_sum) = if parallel {
            self.train_mini_batch_par(samples, activation, activation_prime, batch_size)?
        } else {
            self.train_mini_batch(samples, activation, activation_prime, batch_size)?
        };
        let scale = learning_rate / T::from_f64(batch_size as f64);
        self.hidden_weights += hidden_sum * scale;
        self.output_weights += output_sum * scale;
        Ok(())
    }

    /// Runs `config.epochs` passes over `samples`.
    ///
    /// Every epoch walks consecutive, non-overlapping windows of
    /// `config.mini_batch_size` samples and applies one update per window;
    /// afterwards the learning rate is multiplied by `config.decay_factor`.
    /// A trailing window shorter than the mini-batch size is handled by
    /// `config.remainder`. Returns one `EpochStats` per epoch.
    pub fn train_batch<A, P>(
        &mut self,
        samples: &[LabeledSample<T, INPUT>],
        config: &TrainConfig,
        activation: A,
        activation_prime: P,
    ) -> Result<Vec<EpochStats>>
    where
        A: Fn(T) -> T + Sync,
        P: Fn(T) -> T + Sync,
    {
        config.validate()?;
        if samples.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let size = config.mini_batch_size;
        let leftover = samples.len() % size;
        let train_leftover = leftover > 0 && config.remainder == RemainderPolicy::Partial;
        let n_batches = samples.len() / size + usize::from(train_leftover);
        let dropped_samples = if train_leftover { 0 } else { leftover };
        if n_batches == 0 {
            warn!(
                "{} samples do not fill a single mini-batch of {size}; no updates will be made",
                samples.len()
            );
        } else if dropped_samples > 0 {
            debug!("dropping the last {dropped_samples} samples of every epoch");
        }

        let mut learning_rate = config.learning_rate;
        let mut history = Vec::new();

        for epoch in 1..=config.epochs {
            let t_start = Instant::now();
            let mut batches = 0;
            let mut samples_seen = 0;

            for window in samples.chunks(size) {
                if window.len() < size && !train_leftover {
                    break;
                }
                debug!(
                    "epoch {epoch}/{}, mini-batch {}/{n_batches}",
                    config.epochs,
                    batches + 1
                );
                self.train_batch_inner(
                    window,
                    T::from_f64(learning_rate),
                    &activation,
                    &activation_prime,
                    window.len(),
                    config.parallel,
                )?;
                batches += 1;
                samples_seen += window.len();
            }
            let elapsed_ms = t_start.elapsed().as_millis() as u64;

            let (mean_output_error, accuracy) = if config.track_metrics {
                (
                    Some(self.mean_output_error(samples, &activation)?),
                    Some(self.predict_samples(samples, &activation)?),
                )
            } else {
                (None, None)
            };

            let stats = EpochStats {
                epoch,
                total_epochs: config.epochs,
                learning_rate,
                batches,
                samples_seen,
                dropped_samples,
                mean_output_error,
                accuracy,
                elapsed_ms,
            };
            log_epoch(&stats);
            history.push(stats);

            learning_rate *= config.decay_factor;
        }

        Ok(history)
    }
}

/// The first `batch_size` samples, or a dimension error if there are fewer.
fn batch_window<S>(samples: &[S], batch_size: usize) -> Result<&[S]> {
    if batch_size == 0 {
        return Err(Error::InvalidHyperparameter {
            name: "batch_size",
            reason: "must be at least 1".into(),
        });
    }
    samples.get(..batch_size).ok_or_else(|| {
        Error::dimension(
            format!("at least {batch_size} samples"),
            format!("{} samples", samples.len()),
        )
    })
}

fn log_epoch(stats: &EpochStats) {
    match (stats.mean_output_error, stats.accuracy) {
        (Some(error), Some(accuracy)) => info!(
            "epoch {}/{}: lr = {:.5}, {} batches, error = {:.6}, accuracy = {:.2}%, {} ms",
            stats.epoch,
            stats.total_epochs,
            stats.learning_rate,
            stats.batches,
            error,
            accuracy * 100.0,
            stats.elapsed_ms
        ),
        _ => info!(
            "epoch {}/{}: lr = {:.5}, {} batches, {} ms",
            stats.epoch, stats.total_epochs, stats.learning_rate, stats.batches, stats.elapsed_ms
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Net = NeuralNetwork<f64, 2, 3, 2>;

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    fn sigmoid_prime(y: f64) -> f64 {
        (1.0 - y) * y
    }

    fn net() -> Net {
        Net::from_weights(
            Matrix::from_rows(vec![vec![0.1, -0.2], vec![0.3, 0.05], vec![-0.15, 0.25]]).unwrap(),
            Matrix::from_rows(vec![vec![0.2, -0.1, 0.05], vec![-0.3, 0.2, 0.1]]).unwrap(),
        )
    }

    fn samples() -> Vec<LabeledSample<f64, 2>> {
        [([1.0, 0.1], 0), ([0.1, 1.0], 1), ([0.9, 0.0], 0), ([0.0, 0.8], 1), ([1.0, 0.2], 0)]
            .into_iter()
            .map(|(x, label)| LabeledSample::new(Vector::from_slice(&x).unwrap(), label))
            .collect()
    }

    #[test]
    fn mini_batch_sum_equals_sum_of_single_sample_deltas() {
        let net = net();
        let samples = samples();
        let (hidden_sum, output_sum) =
            net.train_mini_batch(&samples, sigmoid, sigmoid_prime, 3).unwrap();

        let mut expected_hidden = Matrix::zeros();
        let mut expected_output = Matrix::zeros();
        for sample in &samples[..3] {
            let target = sample.one_hot::<2>().unwrap();
            let (h, o) = net.train(&sample.input, &target, sigmoid, sigmoid_prime);
            expected_hidden += h;
            expected_output += o;
        }
        assert_eq!(hidden_sum, expected_hidden);
        assert_eq!(output_sum, expected_output);
    }

    #[test]
    fn window_shorter_than_batch_is_rejected() {
        let err = net().train_mini_batch(&samples(), sigmoid, sigmoid_prime, 6).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        let err = net().train_mini_batch(&samples(), sigmoid, sigmoid_prime, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidHyperparameter { .. }));
    }

    #[test]
    fn inner_step_averages_over_the_batch() {
        let mut trained = net();
        let before = trained.clone();
        let samples = samples();
        let (hidden_sum, output_sum) =
            before.train_mini_batch(&samples, sigmoid, sigmoid_prime, 4).unwrap();

        trained.train_batch_inner(&samples, 0.5, sigmoid, sigmoid_prime, 4, false).unwrap();

        let expected_hidden = before.hidden_weights() + &(hidden_sum * 0.125);
        let expected_output = before.output_weights() + &(output_sum * 0.125);
        for (a, b) in trained.hidden_weights().elements().zip(expected_hidden.elements()) {
            assert!((a - b).abs() < 1e-12);
        }
        for (a, b) in trained.output_weights().elements().zip(expected_output.elements()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn epoch_loop_applies_one_inner_step_per_window() {
        let samples = samples();
        let config = TrainConfig {
            remainder: RemainderPolicy::Partial,
            track_metrics: false,
            ..TrainConfig::new(1, 2, 0.6, 1.0)
        };
        let mut looped = net();
        looped.train_batch(&samples, &config, sigmoid, sigmoid_prime).unwrap();

        let mut stepped = net();
        for window in samples.chunks(2) {
            stepped
                .train_batch_inner(window, 0.6, sigmoid, sigmoid_prime, window.len(), false)
                .unwrap();
        }
        assert_eq!(looped, stepped);
    }

    #[test]
    fn parallel_inner_step_matches_sequential() {
        let samples = samples();
        let mut sequential = net();
        let mut parallel = net();
        sequential.train_batch_inner(&samples, 0.3, sigmoid, sigmoid_prime, 5, false).unwrap();
        parallel.train_batch_inner(&samples, 0.3, sigmoid, sigmoid_prime, 5, true).unwrap();
        for (a, b) in sequential.hidden_weights().elements().zip(parallel.hidden_weights().elements()) {
            assert!((a - b).abs() < 1e-12);
        }
        for (a, b) in sequential.output_weights().elements().zip(parallel.output_weights().elements()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn out_of_range_label_aborts_the_batch() {
        let mut samples = samples();
        samples[1].label = 2;
        let mut net = net();
        let before = net.clone();
        let err = net.train_batch_inner(&samples, 0.5, sigmoid, sigmoid_prime, 3, true).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(net, before);
    }

    #[test]
    fn remainder_policy_controls_the_short_window() {
        let samples = samples();

        let mut dropped = net();
        let config = TrainConfig { track_metrics: false, ..TrainConfig::new(2, 2, 0.1, 1.0) };
        let stats = dropped.train_batch(&samples, &config, sigmoid, sigmoid_prime).unwrap();
        assert_eq!(stats[0].batches, 2);
        assert_eq!(stats[0].samples_seen, 4);
        assert_eq!(stats[0].dropped_samples, 1);

        let mut partial = net();
        let config = TrainConfig { remainder: RemainderPolicy::Partial, ..config };
        let stats = partial.train_batch(&samples, &config, sigmoid, sigmoid_prime).unwrap();
        assert_eq!(stats[1].batches, 3);
        assert_eq!(stats[1].samples_seen, 5);
        assert_eq!(stats[1].dropped_samples, 0);
        assert_ne!(partial, dropped);
    }

    #[test]
    fn learning_rate_decays_after_every_epoch() {
        let mut net = net();
        let config = TrainConfig { track_metrics: false, ..TrainConfig::new(3, 5, 0.8, 0.5) };
        let stats = net.train_batch(&samples(), &config, sigmoid, sigmoid_prime).unwrap();
        let rates: Vec<f64> = stats.iter().map(|s| s.learning_rate).collect();
        assert_eq!(rates, vec![0.8, 0.4, 0.2]);
        assert!(stats.iter().all(|s| s.mean_output_error.is_none()));
    }

    #[test]
    fn batch_larger_than_dataset_makes_no_updates_when_dropping() {
        let mut net = net();
        let before = net.clone();
        let config = TrainConfig::new(1, 10, 0.5, 1.0);
        let stats = net.train_batch(&samples(), &config, sigmoid, sigmoid_prime).unwrap();
        assert_eq!(stats[0].batches, 0);
        assert_eq!(stats[0].dropped_samples, 5);
        assert_eq!(net, before);
    }
}
