pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod learner;
pub mod metrics;
pub mod train;

pub use config::{Cli, TrainerConfig};
pub use dataset::{PreparedData, Splits};
pub use error::TrainError;
pub use learner::{Learner, TchLearner};
pub use train::{Phase, TrainReport, Trainer};
