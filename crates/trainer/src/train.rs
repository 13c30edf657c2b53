use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use babi::Vectorized;

use crate::batch::{make_batches, rng_from};
use crate::config::TrainerConfig;
use crate::dataset::Splits;
use crate::error::TrainError;
use crate::learner::Learner;
use crate::metrics::accuracy;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Training(usize),
    Validation(usize),
    FinalTest,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub train_accuracy: f64,
    /// Set on epochs that ran a validation pass.
    pub validation_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub epochs: Vec<EpochReport>,
    pub test_accuracy: f64,
}

/// Drives a [`Learner`] through the epochs, validation passes and the
/// final test pass.
pub struct Trainer<'a, L: Learner> {
    config: &'a TrainerConfig,
    learner: L,
    rng: StdRng,
    phase: Phase,
}

impl<'a, L: Learner> Trainer<'a, L> {
    pub fn new(config: &'a TrainerConfig, learner: L) -> Self {
        Self {
            config,
            learner,
            rng: rng_from(config.random_state),
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    pub fn run(&mut self, splits: &Splits) -> Result<TrainReport> {
        let n_train = splits.train.len();
        let mut batches = make_batches(n_train, self.config.batch_size);
        if batches.is_empty() {
            return Err(TrainError::Config(format!(
                "batch_size {} exceeds the {} training rows",
                self.config.batch_size, n_train
            ))
            .into());
        }
        let dropped = n_train - batches.len() * self.config.batch_size;
        if dropped > 0 {
            log::warn!(
                "{} trailing training rows do not fill a batch and are never trained on",
                dropped
            );
        }

        let mut epochs = Vec::with_capacity(self.config.epochs);
        for epoch in 1..=self.config.epochs {
            self.enter(Phase::Training(epoch));
            let train_accuracy = self
                .train_epoch(&splits.train, &mut batches)
                .with_context(|| format!("Training failed in epoch {}", epoch))?;
            log::info!("-----------------------");
            log::info!("Epoch {}", epoch);
            log::info!("Training Accuracy: {:.4}", train_accuracy);
            log::info!("-----------------------");

            let mut validation_accuracy = None;
            if epoch % self.config.evaluation_interval == 0 {
                self.enter(Phase::Validation(epoch));
                if splits.validation.is_empty() {
                    log::warn!("Validation split is empty, skipping validation");
                } else {
                    let val_accuracy = self
                        .evaluate(&splits.validation)
                        .with_context(|| format!("Validation failed in epoch {}", epoch))?;
                    log::info!("-----------------------");
                    log::info!("Epoch {}", epoch);
                    log::info!("Validation Accuracy: {:.4}", val_accuracy);
                    log::info!("-----------------------");
                    validation_accuracy = Some(val_accuracy);
                }
            }

            epochs.push(EpochReport {
                epoch,
                train_accuracy,
                validation_accuracy,
            });
        }

        self.enter(Phase::FinalTest);
        let test_accuracy = self.evaluate(&splits.test).context("Test evaluation failed")?;
        log::info!("Testing Accuracy: {:.4}", test_accuracy);
        self.enter(Phase::Done);

        Ok(TrainReport {
            epochs,
            test_accuracy,
        })
    }

    /// One pass over `batches` in a fresh random order. Returns the accuracy
    /// over the rows that were trained on.
    pub fn train_epoch(&mut self, train: &Vectorized, batches: &mut [(usize, usize)]) -> Result<f64> {
        batches.shuffle(&mut self.rng);

        let mut predicted = Vec::with_capacity(batches.len() * self.config.batch_size);
        let mut labels = Vec::with_capacity(predicted.capacity());
        for &(start, end) in batches.iter() {
            let batch = train.rows(start..end);
            let batch_predicted = self.learner.train_step(&batch)?;
            log::debug!("Step {} on rows {}..{}", self.learner.global_step(), start, end);
            predicted.extend(batch_predicted);
            labels.extend(batch.labels());
        }

        Ok(accuracy(&predicted, &labels)?)
    }

    /// Accuracy of the learner's predictions over `data`, without training.
    pub fn evaluate(&self, data: &Vectorized) -> Result<f64> {
        let predicted = self.learner.predict(data)?;
        log::debug!("Predictions: {:?}", predicted);
        Ok(accuracy(&predicted, &data.labels())?)
    }
}
