use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Rows per training batch.
    pub batch_size: i64,
    /// Number of token ids, including the nil id 0.
    pub vocab_size: i64,
    /// Tokens per key sentence.
    pub note_size: i64,
    /// Tokens per query and per value sentence.
    pub doc_size: i64,
    /// Memory slots addressed by key.
    pub memory_key_size: i64,
    /// Memory slots read as values.
    pub memory_value_size: i64,
    /// Width of the space keys and queries are compared in.
    pub feature_size: i64,
    /// Width of the token embeddings.
    pub embedding_size: i64,
    /// Rounds of memory addressing.
    pub hops: i64,
    /// Standard deviation of the normal initializer.
    pub init_stddev: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            vocab_size: 1,
            note_size: 1,
            doc_size: 1,
            memory_key_size: 1,
            memory_value_size: 1,
            feature_size: 30,
            embedding_size: 20,
            hops: 3,
            init_stddev: 0.1,
        }
    }
}
