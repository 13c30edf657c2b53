use std::ops::Range;

use crate::error::{BabiError, Result};
use crate::loader::Example;
use crate::vocab::{Vocab, NIL_ID};

/// Fixed-shape integer encoding of a set of examples.
///
/// Buffers are row-major:
/// stories: [len, memory_size, sentence_size]
/// queries: [len, sentence_size]
/// answers: [len, vocab_size] (one-hot)
#[derive(Debug, Clone, PartialEq)]
pub struct Vectorized {
    len: usize,
    memory_size: usize,
    sentence_size: usize,
    vocab_size: usize,
    stories: Vec<i64>,
    queries: Vec<i64>,
    answers: Vec<f32>,
}

/// Encodes `examples` with a fixed vocabulary and fixed sizes.
///
/// Sentences and queries keep their first `sentence_size` tokens and are
/// padded with leading zeros, so real ids are right-aligned. Stories keep
/// their last `memory_size` sentences; missing slots are all-zero rows in
/// front of the real sentences. Every answer must be exactly one token.
pub fn vectorize(
    examples: &[Example],
    vocab: &Vocab,
    sentence_size: usize,
    memory_size: usize,
) -> Result<Vectorized> {
    let vocab_size = vocab.vocab_size();
    let mut out = Vectorized {
        len: examples.len(),
        memory_size,
        sentence_size,
        vocab_size,
        stories: Vec::with_capacity(examples.len() * memory_size * sentence_size),
        queries: Vec::with_capacity(examples.len() * sentence_size),
        answers: Vec::with_capacity(examples.len() * vocab_size),
    };

    for (row, example) in examples.iter().enumerate() {
        let answer = match example.answer.as_slice() {
            [token] => vocab.id(token)?,
            tokens => {
                return Err(BabiError::InvalidAnswer {
                    row,
                    tokens: tokens.len(),
                })
            }
        };

        let kept = example.story.len().min(memory_size);
        let empty_slots = memory_size - kept;
        out.stories
            .extend(std::iter::repeat(NIL_ID).take(empty_slots * sentence_size));
        for sentence in &example.story[example.story.len() - kept..] {
            encode_sentence(sentence, vocab, sentence_size, &mut out.stories)?;
        }

        encode_sentence(&example.query, vocab, sentence_size, &mut out.queries)?;

        let offset = out.answers.len();
        out.answers.resize(offset + vocab_size, 0.0);
        out.answers[offset + answer as usize] = 1.0;
    }

    Ok(out)
}

fn encode_sentence(
    tokens: &[String],
    vocab: &Vocab,
    sentence_size: usize,
    out: &mut Vec<i64>,
) -> Result<()> {
    let kept = tokens.len().min(sentence_size);
    out.extend(std::iter::repeat(NIL_ID).take(sentence_size - kept));
    for token in &tokens[..kept] {
        out.push(vocab.id(token)?);
    }
    Ok(())
}

impl Vectorized {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    pub fn sentence_size(&self) -> usize {
        self.sentence_size
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn stories(&self) -> &[i64] {
        &self.stories
    }

    pub fn queries(&self) -> &[i64] {
        &self.queries
    }

    pub fn answers(&self) -> &[f32] {
        &self.answers
    }

    pub fn story(&self, row: usize) -> &[i64] {
        let width = self.memory_size * self.sentence_size;
        &self.stories[row * width..(row + 1) * width]
    }

    pub fn query(&self, row: usize) -> &[i64] {
        &self.queries[row * self.sentence_size..(row + 1) * self.sentence_size]
    }

    pub fn answer(&self, row: usize) -> &[f32] {
        &self.answers[row * self.vocab_size..(row + 1) * self.vocab_size]
    }

    /// Index of the answer's hot entry for every row (first maximum on ties).
    pub fn labels(&self) -> Vec<i64> {
        (0..self.len)
            .map(|row| {
                let answer = self.answer(row);
                let mut best = 0;
                for (i, &v) in answer.iter().enumerate() {
                    if v > answer[best] {
                        best = i;
                    }
                }
                best as i64
            })
            .collect()
    }

    /// Copy of the contiguous rows in `range`.
    pub fn rows(&self, range: Range<usize>) -> Vectorized {
        let indices: Vec<usize> = range.collect();
        self.select(&indices)
    }

    /// Copy of the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> Vectorized {
        let mut out = Vectorized {
            len: indices.len(),
            memory_size: self.memory_size,
            sentence_size: self.sentence_size,
            vocab_size: self.vocab_size,
            stories: Vec::with_capacity(indices.len() * self.memory_size * self.sentence_size),
            queries: Vec::with_capacity(indices.len() * self.sentence_size),
            answers: Vec::with_capacity(indices.len() * self.vocab_size),
        };
        for &row in indices {
            out.stories.extend_from_slice(self.story(row));
            out.queries.extend_from_slice(self.query(row));
            out.answers.extend_from_slice(self.answer(row));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn story_example(sentences: usize) -> Example {
        Example {
            story: (0..sentences).map(|i| words(&format!("s{} went west", i))).collect(),
            query: words("where s0"),
            answer: words("west"),
        }
    }

    fn vocab_for(examples: &[Example]) -> Vocab {
        Vocab::build(examples)
    }

    #[test]
    fn test_shapes_and_leading_zero_padding() {
        let data = vec![Example {
            story: vec![words("mary moved"), words("john went to the hallway")],
            query: words("where is mary"),
            answer: words("hallway"),
        }];
        let vocab = vocab_for(&data);
        let v = vectorize(&data, &vocab, 6, 3).unwrap();

        assert_eq!(v.len(), 1);
        assert_eq!(v.stories().len(), 3 * 6);
        assert_eq!(v.queries().len(), 6);
        assert_eq!(v.answers().len(), vocab.vocab_size());

        let id = |t: &str| vocab.get_id(t).unwrap();
        let story = v.story(0);
        // One empty memory slot in front.
        assert_eq!(&story[..6], &[0i64; 6]);
        assert_eq!(&story[6..12], &[0, 0, 0, 0, id("mary"), id("moved")]);
        assert_eq!(
            &story[12..18],
            &[0, id("john"), id("went"), id("to"), id("the"), id("hallway")]
        );
        assert_eq!(v.query(0), &[0, 0, 0, id("where"), id("is"), id("mary")]);

        let answer = v.answer(0);
        assert_eq!(answer.iter().filter(|&&x| x == 1.0).count(), 1);
        assert_eq!(answer[id("hallway") as usize], 1.0);
        assert_eq!(v.labels(), vec![id("hallway")]);
    }

    #[test]
    fn test_long_story_keeps_most_recent_sentences() {
        let memory_size = 4;
        let data = vec![story_example(memory_size + 5)];
        let vocab = vocab_for(&data);
        let v = vectorize(&data, &vocab, 3, memory_size).unwrap();

        let id = |t: &str| vocab.get_id(t).unwrap();
        let story = v.story(0);
        for slot in 0..memory_size {
            let sentence = &story[slot * 3..(slot + 1) * 3];
            let expected = format!("s{}", slot + 5);
            assert_eq!(sentence[0], id(&expected));
        }
    }

    #[test]
    fn test_long_sentence_keeps_first_tokens() {
        let data = vec![Example {
            story: vec![words("a b c d e")],
            query: words("a b c d e"),
            answer: words("e"),
        }];
        let vocab = vocab_for(&data);
        let v = vectorize(&data, &vocab, 2, 1).unwrap();
        let ids = [vocab.get_id("a").unwrap(), vocab.get_id("b").unwrap()];
        assert_eq!(v.story(0), &ids);
        assert_eq!(v.query(0), &ids);
    }

    #[test]
    fn test_round_trip_through_inverse_vocab() {
        let data = vec![story_example(3)];
        let vocab = vocab_for(&data);
        let v = vectorize(&data, &vocab, 5, 3).unwrap();

        let decoded: Vec<String> = v
            .story(0)
            .iter()
            .filter(|&&id| id != NIL_ID)
            .map(|&id| vocab.get_token(id).unwrap().clone())
            .collect();
        let original: Vec<String> = data[0].story.iter().flatten().cloned().collect();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_is_deterministic() {
        let data: Vec<Example> = (1..6).map(story_example).collect();
        let vocab = vocab_for(&data);
        let a = vectorize(&data, &vocab, 4, 3).unwrap();
        let b = vectorize(&data, &vocab, 4, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_token() {
        let data = vec![story_example(1)];
        let vocab = vocab_for(&data);
        let mut other = story_example(1);
        other.query = words("where is nobody");
        let err = vectorize(&[other], &vocab, 4, 1).unwrap_err();
        assert!(matches!(err, BabiError::UnknownToken(_)));
    }

    #[test]
    fn test_answer_must_be_one_token() {
        let data = vec![story_example(1)];
        let vocab = vocab_for(&data);

        let mut two = story_example(1);
        two.answer = words("west s0");
        let err = vectorize(&[data[0].clone(), two], &vocab, 4, 1).unwrap_err();
        assert!(matches!(err, BabiError::InvalidAnswer { row: 1, tokens: 2 }));

        let mut empty = story_example(1);
        empty.answer.clear();
        let err = vectorize(&[empty], &vocab, 4, 1).unwrap_err();
        assert!(matches!(err, BabiError::InvalidAnswer { row: 0, tokens: 0 }));
    }

    #[test]
    fn test_select_and_rows() {
        let data: Vec<Example> = (1..5).map(story_example).collect();
        let vocab = vocab_for(&data);
        let v = vectorize(&data, &vocab, 3, 4).unwrap();

        let picked = v.select(&[3, 0]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.story(0), v.story(3));
        assert_eq!(picked.story(1), v.story(0));

        let middle = v.rows(1..3);
        assert_eq!(middle.len(), 2);
        assert_eq!(middle.query(1), v.query(2));
        assert_eq!(middle.labels(), vec![v.labels()[1], v.labels()[2]]);
    }
}
