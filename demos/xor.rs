use ferrum_mlp::{ActivationFunction, LabeledSample, NeuralNetwork, TrainConfig, Vector};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> ferrum_mlp::Result<()> {
    env_logger::init();

    let samples = vec![
        LabeledSample::new(Vector::from_slice(&[1.0, 0.0])?, 1),
        LabeledSample::new(Vector::from_slice(&[1.0, 1.0])?, 0),
        LabeledSample::new(Vector::from_slice(&[0.0, 1.0])?, 1),
        LabeledSample::new(Vector::from_slice(&[0.0, 0.0])?, 0),
    ];

    let mut rng = StdRng::seed_from_u64(7);
    let mut network = NeuralNetwork::<f64, 2, 8, 2>::new(&mut rng)?;

    let config = TrainConfig {
        activation: ActivationFunction::Sigmoid,
        track_metrics: false,
        ..TrainConfig::new(5000, 4, 2.0, 1.0)
    };
    let (activation, prime) = config.activation.pair::<f64>();

    for round in 0..5 {
        network.train_batch(&samples, &config, &activation, &prime)?;
        let error = network.mean_output_error(&samples, &activation)?;
        println!("Round {round}: error = {error:.6}");
    }

    for sample in &samples {
        let probabilities = network.predict(&sample.input, &activation);
        println!(
            "Input: {} -> class {} {}",
            sample.input,
            probabilities.argmax()?,
            probabilities
        );
    }
    Ok(())
}
