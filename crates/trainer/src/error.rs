use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Cannot score {predicted} predictions against {labels} labels")]
    LengthMismatch { predicted: usize, labels: usize },

    #[error("Accuracy of an empty set is undefined")]
    EmptyEvaluation,
}
