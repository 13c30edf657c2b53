use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{BabiError, Result};
use crate::loader::Example;

/// Id reserved for padding and empty memory slots.
pub const NIL_ID: i64 = 0;

/// Word index over a closed corpus. Ids start at 1 in lexicographic token order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vocab {
    token_to_id: BTreeMap<String, i64>,
    #[serde(skip)]
    id_to_token: HashMap<i64, String>,
}

impl Vocab {
    /// Builds the index from every story, query and answer token of `examples`.
    pub fn build<'a, I>(examples: I) -> Self
    where
        I: IntoIterator<Item = &'a Example>,
    {
        let tokens: BTreeSet<&str> = examples
            .into_iter()
            .flat_map(|ex| ex.tokens())
            .map(String::as_str)
            .collect();

        let mut token_to_id = BTreeMap::new();
        let mut id_to_token = HashMap::new();
        for (i, token) in tokens.into_iter().enumerate() {
            let id = i as i64 + 1;
            token_to_id.insert(token.to_string(), id);
            id_to_token.insert(id, token.to_string());
        }

        Self {
            token_to_id,
            id_to_token,
        }
    }

    pub fn get_id(&self, token: &str) -> Option<i64> {
        self.token_to_id.get(token).copied()
    }

    /// Like `get_id`, but a missing token is an error.
    pub fn id(&self, token: &str) -> Result<i64> {
        self.get_id(token)
            .ok_or_else(|| BabiError::UnknownToken(token.to_string()))
    }

    pub fn get_token(&self, id: i64) -> Option<&String> {
        self.id_to_token.get(&id)
    }

    /// `(token, id)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.token_to_id.iter().map(|(token, &id)| (token.as_str(), id))
    }

    /// Number of real tokens, not counting nil.
    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }

    /// Width of one-hot answers and embedding tables: tokens plus the nil slot.
    pub fn vocab_size(&self) -> usize {
        self.len() + 1
    }
}

/// Size parameters fixed once from the combined train and test corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub max_story_size: usize,
    pub mean_story_size: usize,
    /// Longest story sentence or query, in tokens.
    pub sentence_size: usize,
    pub query_size: usize,
    /// `min(memory cap, max_story_size)`.
    pub memory_size: usize,
    pub vocab_size: usize,
}

impl CorpusStats {
    /// Sizes over `examples`, which should be the train and test sets together.
    pub fn compute<'a, I>(examples: I, vocab: &Vocab, memory_cap: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Example>,
    {
        let examples: Vec<&Example> = examples.into_iter().collect();
        if examples.is_empty() {
            return Err(BabiError::EmptyCorpus);
        }

        let story_lens = examples.iter().map(|ex| ex.story.len());
        let max_story_size = story_lens.clone().max().unwrap_or(0);
        let mean_story_size = story_lens.sum::<usize>() / examples.len();

        let longest_sentence = examples
            .iter()
            .flat_map(|ex| ex.story.iter().map(Vec::len))
            .max()
            .unwrap_or(0);
        let query_size = examples.iter().map(|ex| ex.query.len()).max().unwrap_or(0);

        let stats = Self {
            max_story_size,
            mean_story_size,
            sentence_size: longest_sentence.max(query_size),
            query_size,
            memory_size: memory_cap.min(max_story_size),
            vocab_size: vocab.vocab_size(),
        };
        log::info!("Longest sentence length {}", stats.sentence_size);
        log::info!("Longest story length {}", stats.max_story_size);
        log::info!("Average story length {}", stats.mean_story_size);
        Ok(stats)
    }
}
