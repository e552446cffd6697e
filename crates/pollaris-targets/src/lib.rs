//! pollaris-targets — target lifecycle management.
//!
//! Targets are persisted through [`TargetService`], which wraps every write
//! with lifecycle hooks:
//!
//! - **Before** — address-uniqueness validation, batch flattening, and
//!   interception of bulk start/stop actions
//! - **After** — dispatch of up/down transitions to the collector fleet
//!   (round-robin for activation, multicast for deactivation)
//!
//! Two background operations run on the service leader only: the bulk
//! start/stop engine (paged scans + batched patches + paced fan-out) and
//! boot recovery (re-assertion of live target ownership after a restart).

pub mod address;
pub mod bulk;
pub mod callback;
pub mod error;
pub mod links;
pub mod recovery;
pub mod service;

pub use address::AddressIndex;
pub use callback::{BeforeOutcome, TargetCallback};
pub use error::{TargetError, TargetResult};
pub use links::{LinkBinding, LinkResolver};
pub use service::TargetService;

/// Registered name of the Targets service in the service fabric.
pub const SERVICE_NAME: &str = "Targets";
/// Service area of the Targets service. Area 91 is dedicated to target
/// management.
pub const SERVICE_AREA: u8 = 91;

/// Service identity of the Targets service.
pub fn service_id() -> pollaris_fabric::ServiceId {
    pollaris_fabric::ServiceId::new(SERVICE_NAME, SERVICE_AREA)
}
