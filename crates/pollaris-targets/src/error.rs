//! Error types for target lifecycle operations.

use thiserror::Error;

/// Result type alias for target operations.
pub type TargetResult<T> = Result<T, TargetError>;

/// Errors surfaced by target validation, CRUD, and dispatch.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("target {0} has no hosts")]
    NoHosts(String),

    #[error("target {0} has a host with no configs")]
    NoConfigs(String),

    #[error("address {0} already in use")]
    AddrInUse(String),

    #[error("unknown target {0}")]
    UnknownTarget(String),

    #[error("no link binding for links id {0}")]
    ServiceNotFound(String),

    #[error(transparent)]
    Store(#[from] pollaris_state::StoreError),

    #[error(transparent)]
    Dispatch(#[from] pollaris_fabric::FabricError),
}
