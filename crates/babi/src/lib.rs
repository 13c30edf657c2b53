pub mod error;
pub mod loader;
pub mod vectorize;
pub mod vocab;

pub use error::{BabiError, Result};
pub use loader::{load_task, parse_stories, Example};
pub use vectorize::{vectorize, Vectorized};
pub use vocab::{CorpusStats, Vocab};
