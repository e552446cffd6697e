//! Composite index keys.
//!
//! A template's key is its name followed by `+value` for each non-empty
//! discriminator in the fixed order vendor, series, family, software,
//! hardware, version. More specific templates carry longer keys, which is
//! what the hierarchical lookup peels back.

use crate::types::Pollaris;

/// Compose an index key from a name and discriminator values; empty
/// discriminators are skipped.
pub fn composite_key(name: &str, discriminators: &[&str]) -> String {
    let mut key = String::from(name);
    for value in discriminators {
        if !value.is_empty() {
            key.push('+');
            key.push_str(value);
        }
    }
    key
}

/// The composite key of a template.
pub fn key_of(pollaris: &Pollaris) -> String {
    composite_key(
        &pollaris.name,
        &[
            &pollaris.vendor,
            &pollaris.series,
            &pollaris.family,
            &pollaris.software,
            &pollaris.hardware,
            &pollaris.version,
        ],
    )
}
