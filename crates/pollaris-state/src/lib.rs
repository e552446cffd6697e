//! pollaris-state — target domain types and persistence.
//!
//! Targets are the devices enrolled for polling. This crate owns their
//! domain types and the durable `TargetStore`, a redb-backed table with
//! JSON-serialized values. The store honours the paged-scan contract the
//! lifecycle core relies on (`limit N page P`, key-ordered iteration) and
//! batched patch writes; the query dialect of the upstream relational
//! deployment is deliberately not part of this surface.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::TargetStore;
pub use types::*;
