pub mod catalog;
pub mod cli;
pub mod config;
pub mod counter;
pub mod embedding;
pub mod error;
mod metrics;
pub mod pipeline;
pub mod recognition;
pub mod remote;
pub mod resolver;
mod server;
pub mod similarity;

pub use catalog::{CardRecord, CardSummary, Catalog};
pub use config::Opts;
pub use embedding::EmbeddingStore;
pub use error::{LoadError, NotFound};
pub use pipeline::{Pipeline, PipelineBuilder};
