//! Error types for the template registry.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur when writing to the template registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("template does not contain a name")]
    InvalidName,

    #[error("template {0} does not contain any polling jobs")]
    NoPolls(String),

    #[error("template {template}: poll {job} does not contain a what value")]
    InvalidPoll { template: String, job: String },

    #[error(transparent)]
    Cache(#[from] pollaris_fabric::FabricError),
}
