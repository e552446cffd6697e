//! pollaris-fabric — service fabric interfaces for the Pollaris platform.
//!
//! The real fabric (membership, leader election, wire transport, replicated
//! key/value caches) lives outside this repository. This crate defines the
//! surface the core consumes:
//!
//! - **`dispatch`** — `ServiceId`, dispatch verbs, the `ServiceFabric` trait
//!   (unicast / multicast / round-robin plus membership and leadership
//!   queries) and the `RoundRobin` cursor
//! - **`replicated`** — the `ReplicatedMap` trait for per-key convergent
//!   caches and the notification-write discipline
//! - **`error`** — `FabricError` / `FabricResult`
//!
//! In-process implementations (`InProcessFabric`, `InMemoryReplicatedMap`)
//! back tests and single-node deployments.

pub mod dispatch;
pub mod error;
pub mod replicated;

pub use dispatch::{
    body, InProcessFabric, NodeId, RoundRobin, Sent, SentKind, ServiceFabric, ServiceId, Verb,
};
pub use error::{FabricError, FabricResult};
pub use replicated::{InMemoryReplicatedMap, Keyed, ReplicatedMap};
