use std::collections::HashSet;
use tch::{nn, Kind, Tensor};

use crate::config::ModelConfig;

/// Names every trainable tensor of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// Token embedding shared by queries and memory keys.
    KeyEmbedding,
    /// Token embedding for memory values and answer candidates.
    ValueEmbedding,
    /// Embedding space -> feature space.
    FeatureProjection,
    /// Feature space -> embedding space, before candidate scoring.
    OutputProjection,
    /// Query update matrix of one hop.
    Hop(usize),
}

/// Key-value memory network over bag-of-words sentences.
pub struct MemN2NKV {
    key_embedding: Tensor,
    value_embedding: Tensor,
    feature_projection: Tensor,
    output_projection: Tensor,
    hop_rotations: Vec<Tensor>,
    nil_params: HashSet<ParamId>,
    pub config: ModelConfig,
}

impl MemN2NKV {
    pub fn new(vs: &nn::Path, config: &ModelConfig) -> Self {
        let init = nn::Init::Randn {
            mean: 0.0,
            stdev: config.init_stddev,
        };
        let (v, e, f) = (config.vocab_size, config.embedding_size, config.feature_size);

        let key_embedding = vs.var("key_embedding", &[v, e], init);
        let value_embedding = vs.var("value_embedding", &[v, e], init);
        let feature_projection = vs.var("feature_projection", &[f, e], init);
        let output_projection = vs.var("output_projection", &[f, e], init);
        let hop_rotations = (0..config.hops)
            .map(|i| vs.var(&format!("hop_{}", i), &[f, f], init))
            .collect();

        // Row 0 of both embeddings is the nil word and starts at zero.
        tch::no_grad(|| {
            let _ = key_embedding.narrow(0, 0, 1).zero_();
            let _ = value_embedding.narrow(0, 0, 1).zero_();
        });

        Self {
            key_embedding,
            value_embedding,
            feature_projection,
            output_projection,
            hop_rotations,
            nil_params: [ParamId::KeyEmbedding, ParamId::ValueEmbedding]
                .into_iter()
                .collect(),
            config: config.clone(),
        }
    }

    /// stories: [batch, memory, sentence] int64
    /// queries: [batch, sentence] int64
    /// Returns: candidate logits [batch, vocab_size]
    pub fn forward(&self, stories: &Tensor, queries: &Tensor) -> Tensor {
        let to_features = self.feature_projection.transpose(0, 1);

        let q = bag_of_words(&self.key_embedding, queries, 1);
        let keys = bag_of_words(&self.key_embedding, stories, 2).matmul(&to_features);
        let values = bag_of_words(&self.value_embedding, stories, 2).matmul(&to_features);

        let mut u = q.matmul(&to_features);
        for rotation in &self.hop_rotations {
            let scores = (&keys * u.unsqueeze(1)).sum_dim_intlist(Some(&[2i64][..]), false, Kind::Float);
            let probs = scores.softmax(-1, Kind::Float);
            let read = (&values * probs.unsqueeze(-1)).sum_dim_intlist(Some(&[1i64][..]), false, Kind::Float);
            u = (&u + read).matmul(&rotation.transpose(0, 1));
        }

        u.matmul(&self.output_projection)
            .matmul(&self.value_embedding.transpose(0, 1))
    }

    /// Summed softmax cross-entropy against one-hot `answers` [batch, vocab_size].
    pub fn loss(&self, stories: &Tensor, queries: &Tensor, answers: &Tensor) -> Tensor {
        Self::cross_entropy(&self.forward(stories, queries), answers)
    }

    pub fn cross_entropy(logits: &Tensor, answers: &Tensor) -> Tensor {
        let log_probs = logits.log_softmax(-1, Kind::Float);
        (answers * log_probs).sum(Kind::Float).neg()
    }

    /// Predicted answer id per row, [batch] int64.
    pub fn predict(&self, stories: &Tensor, queries: &Tensor) -> Tensor {
        self.forward(stories, queries).argmax(-1, false)
    }

    pub fn parameters(&self) -> Vec<(ParamId, &Tensor)> {
        let mut params = vec![
            (ParamId::KeyEmbedding, &self.key_embedding),
            (ParamId::ValueEmbedding, &self.value_embedding),
            (ParamId::FeatureProjection, &self.feature_projection),
            (ParamId::OutputProjection, &self.output_projection),
        ];
        params.extend(
            self.hop_rotations
                .iter()
                .enumerate()
                .map(|(i, t)| (ParamId::Hop(i), t)),
        );
        params
    }

    /// Parameters whose row 0 is the nil word and must never be updated.
    pub fn nil_params(&self) -> &HashSet<ParamId> {
        &self.nil_params
    }
}

/// Embeds `ids` and sums over dimension `dim` (the token axis).
fn bag_of_words(embedding: &Tensor, ids: &Tensor, dim: i64) -> Tensor {
    Tensor::embedding(embedding, ids, -1, false, false).sum_dim_intlist(Some(&[dim][..]), false, Kind::Float)
}
