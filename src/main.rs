use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use ferrum_mlp::data::{load_samples, CsvOptions};
use ferrum_mlp::{ActivationFunction, LabeledSample, NeuralNetwork, TrainConfig};

const INPUT: usize = 784;
const HIDDEN: usize = 300;
const OUTPUT: usize = 10;

type Mnist = NeuralNetwork<f32, INPUT, HIDDEN, OUTPUT>;

/// Everything a `train` run needs: the hyperparameters plus where the data
/// comes from and where the weights go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RunConfig {
    #[serde(flatten)]
    train: TrainConfig,
    train_data: Option<PathBuf>,
    test_data: Option<PathBuf>,
    train_limit: Option<usize>,
    test_limit: Option<usize>,
    has_header: bool,
    input_scale: f64,
    output_file: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            train: TrainConfig::default(),
            train_data: None,
            test_data: None,
            train_limit: None,
            test_limit: None,
            has_header: false,
            input_scale: 255.0,
            output_file: PathBuf::from("weights.bin"),
        }
    }
}

impl RunConfig {
    fn from_arguments(path: &Path, matches: &ArgMatches) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open config {}", path.display()))?;
        let mut config: RunConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid config {}", path.display()))?;

        if let Some(train_data) = matches.get_one::<PathBuf>("train_data") {
            config.train_data = Some(train_data.clone());
        }
        if let Some(output_file) = matches.get_one::<PathBuf>("output_file") {
            config.output_file = output_file.clone();
        }
        Ok(config)
    }

    fn csv_options(&self, limit: Option<usize>) -> CsvOptions {
        CsvOptions {
            has_header: self.has_header,
            input_scale: self.input_scale,
            limit,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("FERRUM_LOG", "warn,ferrum_mlp=info"))
        .init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("evaluate", sub_m)) => handle_evaluate(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn cli() -> Command {
    Command::new("ferrum-mlp")
        .version(clap::crate_version!())
        .about("Two-layer perceptron trained with mini-batch gradient descent")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train a network from a CSV data set and write its weights")
                .arg(
                    Arg::new("config")
                        .help("Path to the JSON training configuration")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('d')
                        .long("train_data")
                        .help("Training CSV. Overrides `train_data` from the configuration file.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output_file")
                        .help("Where the binary weights are written. Overrides `output_file`.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Report the accuracy of saved weights on a CSV data set")
                .arg(
                    Arg::new("weights")
                        .help("Binary weights written by `train`")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("test_data")
                        .help("Test CSV")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("activation")
                        .short('a')
                        .long("activation")
                        .help("Activation the weights were trained with")
                        .value_parser(["sigmoid", "relu", "tanh", "identity"])
                        .default_value("relu"),
                )
                .arg(
                    Arg::new("input_scale")
                        .long("input_scale")
                        .help("Every feature is divided by this value")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("255"),
                )
                .arg(
                    Arg::new("has_header")
                        .long("has_header")
                        .help("Skip the first record of the test CSV")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .context("missing configuration path")?;
    log::info!("training from config {}", config_path.display());
    let config = RunConfig::from_arguments(config_path, matches)?;
    config.train.validate()?;

    let Some(train_path) = config.train_data.as_deref() else {
        bail!("no training data: set `train_data` in the config or pass --train_data");
    };
    let train: Vec<LabeledSample<f32, INPUT>> =
        load_samples(train_path, &config.csv_options(config.train_limit))
            .with_context(|| format!("cannot load training data {}", train_path.display()))?;
    log::info!("loaded {} training samples", train.len());

    let mut rng = match config.train.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut network = Mnist::new_with(&mut rng, config.train.init)?;

    let (activation, prime) = config.train.activation.pair::<f32>();
    let history = network.train_batch(&train, &config.train, &activation, &prime)?;
    let total_ms: u64 = history.iter().map(|stats| stats.elapsed_ms).sum();
    log::info!("finished {} epochs in {total_ms} ms", history.len());

    network
        .save(&config.output_file)
        .with_context(|| format!("cannot write weights to {}", config.output_file.display()))?;
    log::info!("weights written to {}", config.output_file.display());

    if let Some(test_path) = config.test_data.as_deref() {
        let test: Vec<LabeledSample<f32, INPUT>> =
            load_samples(test_path, &config.csv_options(config.test_limit))
                .with_context(|| format!("cannot load test data {}", test_path.display()))?;
        let accuracy = network.predict_samples(&test, &activation)?;
        log::info!("test accuracy: {:.2}% on {} samples", accuracy * 100.0, test.len());
    }
    Ok(())
}

fn handle_evaluate(matches: &ArgMatches) -> Result<()> {
    let weights_path = matches
        .get_one::<PathBuf>("weights")
        .context("missing weights path")?;
    let test_path = matches
        .get_one::<PathBuf>("test_data")
        .context("missing test data path")?;
    let activation = match matches.get_one::<String>("activation").map(String::as_str) {
        Some("sigmoid") => ActivationFunction::Sigmoid,
        Some("tanh") => ActivationFunction::Tanh,
        Some("identity") => ActivationFunction::Identity,
        _ => ActivationFunction::ReLU,
    };

    let network = Mnist::load(weights_path)
        .with_context(|| format!("cannot read weights from {}", weights_path.display()))?;
    let options = evaluate_options(matches);
    let test: Vec<LabeledSample<f32, INPUT>> = load_samples(test_path, &options)
        .with_context(|| format!("cannot load test data {}", test_path.display()))?;

    let (activation_fn, _) = activation.pair::<f32>();
    let accuracy = network.predict_samples(&test, &activation_fn)?;
    println!("accuracy: {:.2}% ({} samples)", accuracy * 100.0, test.len());
    Ok(())
}

fn evaluate_options(matches: &ArgMatches) -> CsvOptions {
    CsvOptions {
        has_header: matches.get_flag("has_header"),
        input_scale: matches.get_one::<f64>("input_scale").copied().unwrap_or(255.0),
        limit: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate_matches(args: &[&str]) -> ArgMatches {
        let matches = cli()
            .try_get_matches_from(["ferrum-mlp", "evaluate", "weights.bin", "test.csv"].iter().chain(args).copied())
            .unwrap();
        matches.subcommand_matches("evaluate").unwrap().clone()
    }

    #[test]
    fn evaluate_reads_headerless_csv_by_default() {
        let options = evaluate_options(&evaluate_matches(&[]));
        assert!(!options.has_header);
        assert_eq!(options.input_scale, 255.0);
    }

    #[test]
    fn evaluate_header_flag_reaches_csv_options() {
        let options = evaluate_options(&evaluate_matches(&["--has_header", "--input_scale", "1"]));
        assert!(options.has_header);
        assert_eq!(options.input_scale, 1.0);
    }

    #[test]
    fn run_config_flattens_training_fields() {
        let config: RunConfig =
            serde_json::from_str(r#"{ "epochs": 2, "train_data": "train.csv", "has_header": true }"#).unwrap();
        assert_eq!(config.train.epochs, 2);
        assert_eq!(config.train_data, Some(PathBuf::from("train.csv")));
        assert!(config.csv_options(None).has_header);
        assert_eq!(config.output_file, PathBuf::from("weights.bin"));
    }
}
