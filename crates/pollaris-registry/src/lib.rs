//! pollaris-registry — the replicated polling-template catalogue.
//!
//! A *pollaris* is a named bundle of protocol probe definitions plus
//! inventory discriminators (vendor, series, family, software, hardware,
//! version) that determine where it applies. Templates live in a replicated
//! cache keyed by name; two local indexes — composite-key → name and
//! group → (composite-key → name) — make lookups strictly local after
//! warm-up.
//!
//! Consumers resolve the template for a device with a *hierarchical key
//! lookup* that degrades from the most specific discriminator match to the
//! bare name.

pub mod error;
pub mod keys;
pub mod registry;
pub mod types;

pub use error::{RegistryError, RegistryResult};
pub use keys::{composite_key, key_of};
pub use registry::PollarisRegistry;
pub use types::{Poll, Pollaris};

/// Registered name of the Pollaris service in the service fabric.
pub const SERVICE_NAME: &str = "Pollaris";
/// Service area of the Pollaris service (0 = default/global area).
pub const SERVICE_AREA: u8 = 0;

/// Service identity of the Pollaris service.
pub fn service_id() -> pollaris_fabric::ServiceId {
    pollaris_fabric::ServiceId::new(SERVICE_NAME, SERVICE_AREA)
}
