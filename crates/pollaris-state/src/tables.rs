//! redb table definitions for the target store.
//!
//! One table, `&str` keys and `&[u8]` values (JSON-serialized targets).
//! Iteration order is key order, which is what gives paged scans a stable
//! page sequence.

use redb::TableDefinition;

/// Targets keyed by `{target_id}`.
pub const TARGETS: TableDefinition<&str, &[u8]> = TableDefinition::new("targets");
