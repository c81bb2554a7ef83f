pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;

pub use config::IngestConfig;
pub use error::IngestError;
pub use models::{RepoDescriptor, RunOutcome};
pub use services::pipeline::IngestPipeline;
