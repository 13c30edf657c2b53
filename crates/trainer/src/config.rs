use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::TrainError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    /// Epsilon value for the Adam optimizer.
    pub epsilon: f64,
    /// Gradients are clipped to this L2 norm, per parameter.
    pub max_grad_norm: f64,
    /// Validate every this many epochs.
    pub evaluation_interval: usize,
    pub batch_size: usize,
    pub feature_size: usize,
    /// Memory addressing rounds.
    pub hops: usize,
    pub epochs: usize,
    pub embedding_size: usize,
    /// Upper bound on memory slots; the corpus may need fewer.
    pub memory_size: usize,
    /// bAbI task, 1..=20.
    pub task_id: u32,
    /// Seeds the split, the batch order and libtorch. Unseeded runs differ.
    pub random_state: Option<u64>,
    pub data_dir: String,
    /// Use CUDA when available, otherwise fall back to CPU.
    pub allow_soft_placement: bool,
    pub log_device_placement: bool,
    pub learning_rate: f64,
    /// Learning rate is multiplied by `decay_rate` every `decay_steps` updates.
    pub decay_steps: u64,
    pub decay_rate: f64,
    pub gradient_noise_stddev: f64,
    /// Share of the training file held out for validation (rounded up).
    pub validation_fraction: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            max_grad_norm: 40.0,
            evaluation_interval: 50,
            batch_size: 32,
            feature_size: 30,
            hops: 3,
            epochs: 200,
            embedding_size: 20,
            memory_size: 30,
            task_id: 1,
            random_state: None,
            data_dir: "data/tasks_1-20_v1-2/en/".to_string(),
            allow_soft_placement: true,
            log_device_placement: false,
            learning_rate: 0.01,
            decay_steps: 2000,
            decay_rate: 0.96,
            gradient_noise_stddev: 1e-3,
            validation_fraction: 0.1,
        }
    }
}

/// Command line of `babi-train`. Every flag overrides the config file, which
/// overrides the built-in defaults.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Train a key-value memory network on one bAbI task", long_about = None)]
pub struct Cli {
    /// YAML file with base settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Epsilon value for the Adam optimizer [default: 1]
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Clip gradients to this norm [default: 40.0]
    #[arg(long)]
    pub max_grad_norm: Option<f64>,

    /// Evaluate and print results every x epochs [default: 50]
    #[arg(long)]
    pub evaluation_interval: Option<usize>,

    /// Batch size for training [default: 32]
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Feature size [default: 30]
    #[arg(long)]
    pub feature_size: Option<usize>,

    /// Number of hops in the memory network [default: 3]
    #[arg(long)]
    pub hops: Option<usize>,

    /// Number of epochs to train for [default: 200]
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Embedding size for embedding matrices [default: 20]
    #[arg(long)]
    pub embedding_size: Option<usize>,

    /// Maximum size of memory [default: 30]
    #[arg(long)]
    pub memory_size: Option<usize>,

    /// bAbI task id, 1 <= id <= 20 [default: 1]
    #[arg(long)]
    pub task_id: Option<u32>,

    /// Random state
    #[arg(long)]
    pub random_state: Option<u64>,

    /// Directory containing bAbI tasks [default: data/tasks_1-20_v1-2/en/]
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Allow soft device placement [default: true]
    #[arg(long)]
    pub allow_soft_placement: Option<bool>,

    /// Log placement of parameters on devices [default: false]
    #[arg(long)]
    pub log_device_placement: Option<bool>,
}

impl TrainerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {:?}", path))?
            }
            None => TrainerConfig::default(),
        };

        macro_rules! override_with {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = cli.$field.clone() {
                    config.$field = value;
                })*
            };
        }
        override_with!(
            epsilon,
            max_grad_norm,
            evaluation_interval,
            batch_size,
            feature_size,
            hops,
            epochs,
            embedding_size,
            memory_size,
            task_id,
            data_dir,
            allow_soft_placement,
            log_device_placement,
        );
        if cli.random_state.is_some() {
            config.random_state = cli.random_state;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), TrainError> {
        let positive = [
            ("batch_size", self.batch_size),
            ("epochs", self.epochs),
            ("evaluation_interval", self.evaluation_interval),
            ("hops", self.hops),
            ("embedding_size", self.embedding_size),
            ("feature_size", self.feature_size),
            ("memory_size", self.memory_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(TrainError::Config(format!("{} must be at least 1", name)));
            }
        }
        if !(self.max_grad_norm > 0.0) {
            return Err(TrainError::Config("max_grad_norm must be positive".into()));
        }
        if !(self.epsilon > 0.0) {
            return Err(TrainError::Config("epsilon must be positive".into()));
        }
        if !(1..=20).contains(&self.task_id) {
            return Err(TrainError::Config(format!(
                "task_id must be in 1..=20, got {}",
                self.task_id
            )));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(TrainError::Config(
                "validation_fraction must be in [0, 1)".into(),
            ));
        }
        if self.decay_steps == 0 {
            return Err(TrainError::Config("decay_steps must be at least 1".into()));
        }
        Ok(())
    }
}
