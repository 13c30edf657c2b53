use anyhow::{Context, Result};
use babi::{load_task, vectorize, CorpusStats, Example, Vectorized, Vocab};
use memn2n_kv::ModelConfig;

use crate::batch::split;
use crate::config::TrainerConfig;

/// The three vectorized partitions of one task.
#[derive(Debug, Clone)]
pub struct Splits {
    pub train: Vectorized,
    pub validation: Vectorized,
    pub test: Vectorized,
}

/// Vocabulary, sizes and splits, fixed for the whole run.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub vocab: Vocab,
    pub stats: CorpusStats,
    pub splits: Splits,
}

impl PreparedData {
    pub fn load(config: &TrainerConfig) -> Result<Self> {
        let (train, test) = load_task(&config.data_dir, config.task_id)
            .with_context(|| format!("Failed to load bAbI task {} from {}", config.task_id, config.data_dir))?;
        Self::from_examples(&train, &test, config)
    }

    /// Vocabulary and sizes come from train and test together; the training
    /// file is then split into train and validation.
    pub fn from_examples(train: &[Example], test: &[Example], config: &TrainerConfig) -> Result<Self> {
        let vocab = Vocab::build(train.iter().chain(test));
        let stats = CorpusStats::compute(train.iter().chain(test), &vocab, config.memory_size)?;

        let vectorized = vectorize(train, &vocab, stats.sentence_size, stats.memory_size)
            .context("Failed to vectorize training examples")?;
        let (train_split, validation) = split(&vectorized, config.validation_fraction, config.random_state);
        let test_split = vectorize(test, &vocab, stats.sentence_size, stats.memory_size)
            .context("Failed to vectorize test examples")?;

        log::info!(
            "Training set shape [{}, {}, {}]",
            train_split.len(),
            train_split.memory_size(),
            train_split.sentence_size()
        );
        log::info!("Training Size {}", train_split.len());
        log::info!("Validation Size {}", validation.len());
        log::info!("Testing Size {}", test_split.len());

        Ok(Self {
            vocab,
            stats,
            splits: Splits {
                train: train_split,
                validation,
                test: test_split,
            },
        })
    }

    pub fn model_config(&self, config: &TrainerConfig) -> ModelConfig {
        ModelConfig {
            batch_size: config.batch_size as i64,
            vocab_size: self.stats.vocab_size as i64,
            note_size: self.stats.sentence_size as i64,
            doc_size: self.stats.sentence_size as i64,
            memory_key_size: self.stats.memory_size as i64,
            memory_value_size: self.stats.memory_size as i64,
            feature_size: config.feature_size as i64,
            embedding_size: config.embedding_size as i64,
            hops: config.hops as i64,
            ..Default::default()
        }
    }
}
