use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{BabiError, Result};

/// One question over the story that precedes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Statements seen so far in the story, oldest first.
    pub story: Vec<Vec<String>>,
    pub query: Vec<String>,
    pub answer: Vec<String>,
}

impl Example {
    /// Every token of the example: story sentences, then query, then answer.
    pub fn tokens(&self) -> impl Iterator<Item = &String> {
        self.story
            .iter()
            .flatten()
            .chain(self.query.iter())
            .chain(self.answer.iter())
    }
}

/// Loads the train and test examples of bAbI task `task_id` (1..=20) from `data_dir`.
pub fn load_task<P: AsRef<Path>>(data_dir: P, task_id: u32) -> Result<(Vec<Example>, Vec<Example>)> {
    if !(1..=20).contains(&task_id) {
        return Err(BabiError::InvalidTask(task_id));
    }
    let dir = data_dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| BabiError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let prefix = format!("qa{}_", task_id);
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.contains(&prefix))
        })
        .collect();
    files.sort();

    let pick = |kind: &'static str| -> Result<PathBuf> {
        files
            .iter()
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.contains(kind))
            })
            .cloned()
            .ok_or_else(|| BabiError::MissingFile {
                dir: dir.to_path_buf(),
                task_id,
                kind,
            })
    };

    let train_path = pick("train")?;
    let test_path = pick("test")?;
    log::debug!("Task {} train file {:?}, test file {:?}", task_id, train_path, test_path);

    let train = read_stories(&train_path)?;
    let test = read_stories(&test_path)?;
    Ok((train, test))
}

fn read_stories(path: &Path) -> Result<Vec<Example>> {
    let file = File::open(path).map_err(|source| BabiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_stories(BufReader::new(file), path)
}

/// Parses bAbI-formatted lines. `path` is only used in error messages.
pub fn parse_stories<R: BufRead>(reader: R, path: &Path) -> Result<Vec<Example>> {
    let splitter = word_splitter()?;
    let mut data = Vec::new();
    let mut story: Vec<Vec<String>> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line
            .map_err(|source| BabiError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .to_lowercase();
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let malformed = |reason: &str| BabiError::DataLoad {
            path: path.to_path_buf(),
            line: line_no,
            reason: reason.to_string(),
        };

        let (nid, text) = line
            .split_once(' ')
            .ok_or_else(|| malformed("expected '<id> <text>'"))?;
        let nid: u32 = nid.parse().map_err(|_| malformed("line id is not a number"))?;
        if nid == 1 {
            story.clear();
        }

        if text.contains('\t') {
            let mut fields = text.split('\t');
            let question = fields.next().unwrap_or_default();
            let answer = fields
                .next()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| malformed("question line without an answer"))?;

            let mut query = tokenize(&splitter, question);
            if query.last().map(String::as_str) == Some("?") {
                query.pop();
            }
            data.push(Example {
                story: story.clone(),
                query,
                answer: vec![answer.to_string()],
            });
        } else {
            let mut sentence = tokenize(&splitter, text);
            if sentence.last().map(String::as_str) == Some(".") {
                sentence.pop();
            }
            story.push(sentence);
        }
    }

    Ok(data)
}

pub fn word_splitter() -> Result<Regex> {
    Ok(Regex::new(r"\w+|[^\w\s]+")?)
}

/// Splits a sentence into word runs and punctuation runs.
pub fn tokenize(splitter: &Regex, sentence: &str) -> Vec<String> {
    splitter
        .find_iter(sentence)
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TASK: &str = "1 Mary moved to the bathroom.\n\
2 John went to the hallway.\n\
3 Where is Mary? \tbathroom\t1\n\
4 Daniel went back to the hallway.\n\
5 Where is Daniel? \thallway\t4\n\
1 Sandra journeyed to the office.\n\
2 Where is Sandra? \toffice\t1\n";

    fn parse(text: &str) -> Result<Vec<Example>> {
        parse_stories(text.as_bytes(), Path::new("inline"))
    }

    #[test]
    fn test_tokenize_keeps_punctuation() {
        let re = word_splitter().unwrap();
        assert_eq!(tokenize(&re, "Where is Mary?"), vec!["Where", "is", "Mary", "?"]);
        assert_eq!(tokenize(&re, "Bob's  apple."), vec!["Bob", "'", "s", "apple", "."]);
    }

    #[test]
    fn test_questions_snapshot_story() {
        let data = parse(TASK).unwrap();
        assert_eq!(data.len(), 3);

        assert_eq!(data[0].story.len(), 2);
        assert_eq!(data[0].story[0], vec!["mary", "moved", "to", "the", "bathroom"]);
        assert_eq!(data[0].query, vec!["where", "is", "mary"]);
        assert_eq!(data[0].answer, vec!["bathroom"]);

        // Question lines are not part of the story.
        assert_eq!(data[1].story.len(), 3);
        assert_eq!(data[1].answer, vec!["hallway"]);

        // Id 1 starts a fresh story.
        assert_eq!(data[2].story, vec![vec!["sandra", "journeyed", "to", "the", "office"]]);
    }

    #[test]
    fn test_malformed_lines() {
        let err = parse("x Mary moved.\n").unwrap_err();
        assert!(matches!(err, BabiError::DataLoad { line: 1, .. }));

        let err = parse("1 Mary moved.\n2 Where is Mary?\t\t1\n").unwrap_err();
        assert!(matches!(err, BabiError::DataLoad { line: 2, .. }));
    }

    #[test]
    fn test_load_task_finds_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["qa1_single-supporting-fact_train.txt", "qa1_single-supporting-fact_test.txt"] {
            let mut f = File::create(dir.path().join(name)).unwrap();
            f.write_all(TASK.as_bytes()).unwrap();
        }
        // Task 11 must not be picked up for task 1.
        File::create(dir.path().join("qa11_basic-coreference_train.txt")).unwrap();

        let (train, test) = load_task(dir.path(), 1).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(test.len(), 3);
    }

    #[test]
    fn test_load_task_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_task(dir.path(), 0), Err(BabiError::InvalidTask(0))));
        assert!(matches!(
            load_task(dir.path(), 2),
            Err(BabiError::MissingFile { kind: "train", .. })
        ));
        assert!(matches!(
            load_task(dir.path().join("nope"), 2),
            Err(BabiError::Io { .. })
        ));

        for err in [
            load_task(dir.path(), 21).unwrap_err(),
            load_task(dir.path(), 2).unwrap_err(),
            load_task(dir.path().join("nope"), 2).unwrap_err(),
            parse("x Mary moved.\n").unwrap_err(),
        ] {
            assert!(err.is_data_load(), "{}", err);
        }
        assert!(!BabiError::EmptyCorpus.is_data_load());
    }
}
