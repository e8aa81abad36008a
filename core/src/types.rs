//! Shared primitive types used across the entire pipeline.

/// A stable, unique identifier for one raw input row.
pub type RecordId = i64;

/// A client identifier. Always resolvable to an integer after staging.
pub type ClientId = i64;

/// The canonical run identifier.
pub type RunId = String;
