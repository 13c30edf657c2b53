use anyhow::Result;
use clap::Parser;

use trainer::learner::select_device;
use trainer::{Cli, PreparedData, TchLearner, Trainer, TrainerConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = TrainerConfig::from_cli(&cli)?;
    log::debug!("Configuration: {:?}", config);
    log::info!("Started Task: {}", config.task_id);

    // 1. Vocabulary, sizes and vectorized splits
    let data = PreparedData::load(&config)?;

    // 2. Model and optimizer
    let device = select_device(&config);
    log::info!("Using device: {:?}", device);
    let learner = TchLearner::new(data.model_config(&config), &config, device)?;

    // 3. Train, validate, test
    let mut trainer = Trainer::new(&config, learner);
    let report = trainer.run(&data.splits)?;

    if let Some(last) = report.epochs.last() {
        log::info!(
            "Finished {} epochs, final training accuracy {:.4}, testing accuracy {:.4}",
            last.epoch,
            last.train_accuracy,
            report.test_accuracy
        );
    }
    Ok(())
}
