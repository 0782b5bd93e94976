//! # Error Types
//!
//! Errors in this crate are confined to *construction time*. Comparing two
//! property specs, matching a pattern or applying a rule never fails: a
//! malformed spec is rejected when it is built, so every value that reaches
//! `is_satisfy` is well-formed.

use crate::expr::{ColumnRef, Expr};

/// Errors raised while building order or distribution specs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// A hash distribution must partition on at least one column.
    #[error("Hash distribution requires at least one partitioning column")]
    EmptyHashColumns,
    /// The same column appears twice in a hash distribution.
    #[error("Duplicate hash partitioning column: {0}")]
    DuplicateHashColumn(ColumnRef),
    /// The hash function name is not one the engine can execute.
    #[error("Unknown hash function: {0}")]
    UnknownHashFunction(String),
    /// The same expression appears twice in an ordering.
    #[error("Duplicate sort key: {0}")]
    DuplicateSortKey(Expr),
}

/// Errors raised while loading an [`OptimizerConfig`](crate::config::OptimizerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for the config schema.
    #[error("Invalid optimizer config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A rule name in the config does not name a known rule.
    #[error("Unknown rule: {0}")]
    UnknownRule(String),
}

pub type PropertyResult<T> = std::result::Result<T, PropertyError>;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
