use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BabiError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Malformed dataset file {path:?} at line {line}: {reason}")]
    DataLoad {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("No {kind} file for task {task_id} in {dir:?}")]
    MissingFile {
        dir: PathBuf,
        task_id: u32,
        kind: &'static str,
    },

    #[error("Invalid bAbI task id {0}, expected 1..=20")]
    InvalidTask(u32),

    #[error("Empty corpus: no examples to derive sizes from")]
    EmptyCorpus,

    #[error("Token not found in vocabulary: {0}")]
    UnknownToken(String),

    #[error("Example {row} has a {tokens}-token answer, expected exactly one")]
    InvalidAnswer { row: usize, tokens: usize },
}

impl BabiError {
    /// True for failures to find, read or parse the dataset files.
    pub fn is_data_load(&self) -> bool {
        matches!(
            self,
            BabiError::Io { .. }
                | BabiError::DataLoad { .. }
                | BabiError::MissingFile { .. }
                | BabiError::InvalidTask(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BabiError>;
