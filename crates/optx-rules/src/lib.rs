//! # Built-in Optimization Rules
//!
//! The default rule set for the optimizer, in two categories.
//!
//! ## Transformation Rules (Logical -> Logical)
//!
//! - **`JoinCommutativityRule`**: Swaps the sides of inner and cross joins
//!   (A JOIN B -> B JOIN A), so the hash join build side can be chosen either way.
//!
//! ## Implementation Rules (Logical -> Physical)
//!
//! - **`ImplSeqScanRule`**: Scan as a sequential (full) table scan.
//! - **`ImplFilterRule`**, **`ImplProjectRule`**, **`ImplLimitRule`**: one-to-one mappings.
//! - **`ImplSortRule`**: Logical sort as a physical sort operator.
//! - **`ImplHashJoinRule`**: Hash join, build-right and build-left.
//! - **`ImplNestedLoopJoinRule`**: Nested loop join (universal fallback).
//! - **`CteConsumeInlineRule`**: Inlines a consumer of a CTE that is not forced to be
//!   materialized.
//! - **`CteConsumeReuseRule`**, **`CteProduceRule`**, **`CteAnchorRule`**,
//!   **`CteAnchorToNoCteRule`**: The rest of the CTE implementation, see [`impl_cte`].

pub mod enforcer;
pub mod impl_cte;
pub mod impl_join;
pub mod impl_scan;
pub mod impl_unary;
pub mod join_commutativity;

use optx_core::rule::RuleRegistry;

/// Create a default rule registry with all built-in rules.
///
/// Connector-specific rules can be added to the returned registry via
/// `add_source_rule_set()`.
pub fn default_rule_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();

    // Transformation rules
    registry.add_rule(Box::new(join_commutativity::JoinCommutativityRule::new()));

    // Implementation rules
    registry.add_rule(Box::new(impl_scan::ImplSeqScanRule::new()));
    registry.add_rule(Box::new(impl_unary::ImplFilterRule::new()));
    registry.add_rule(Box::new(impl_unary::ImplProjectRule::new()));
    registry.add_rule(Box::new(impl_unary::ImplLimitRule::new()));
    registry.add_rule(Box::new(enforcer::ImplSortRule::new()));
    registry.add_rule(Box::new(impl_join::ImplHashJoinRule::new()));
    registry.add_rule(Box::new(impl_join::ImplNestedLoopJoinRule::new()));
    registry.add_rule(Box::new(impl_cte::CteAnchorRule::new()));
    registry.add_rule(Box::new(impl_cte::CteAnchorToNoCteRule::new()));
    registry.add_rule(Box::new(impl_cte::CteProduceRule::new()));
    registry.add_rule(Box::new(impl_cte::CteConsumeReuseRule::new()));
    registry.add_rule(Box::new(impl_cte::CteConsumeInlineRule::new()));

    registry
}
