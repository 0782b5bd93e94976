//! # optx-core: Physical Properties and Rule Framework
//!
//! This crate implements the physical-property model and the rule framework of a
//! Cascades-style cost-based optimizer for a distributed SQL engine. The memo, search
//! loop and cost model are external: they call into this crate to match and fire
//! rules and to decide whether a subtree's delivered properties satisfy a parent's
//! requirement.
//!
//! ## Module Overview
//!
//! - **`expr`**: Operator types (logical, physical, scalar) and the immutable
//!   expression tree `OptExpr`.
//! - **`properties`**: Sort, distribution and CTE properties, the composite
//!   `PhysicalPropertySet` and its satisfaction predicate.
//! - **`pattern`**: Declarative structural patterns that pre-filter rule candidates.
//! - **`rule`**: The `Rule` trait (check + transform) and the `RuleRegistry`.
//! - **`context`**: Per-query `OptimizerContext` (forced CTE materializations, config).
//! - **`config`**: `OptimizerConfig`, which rules are active for a query.
//! - **`binder`**: Firing matched rules on a node; a greedy implementer for tracing.
//! - **`error`**: Construction-time errors for specs and configuration.

pub mod binder;
pub mod config;
pub mod context;
pub mod error;
pub mod expr;
pub mod pattern;
pub mod properties;
pub mod rule;
