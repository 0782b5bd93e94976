//! # Optimizer Context
//!
//! Per-query state handed explicitly to every `Rule::check` and `Rule::transform`.
//! The context lives exactly as long as one query's optimization and is read-only
//! while rules run: the forced-materialization set is decided by an earlier CTE
//! planning pass and frozen into the context before rule application starts. That
//! is what lets a driver evaluate independent rules or subtrees concurrently against
//! one shared `&OptimizerContext` without any locking.

use crate::config::OptimizerConfig;
use crate::expr::CteId;
use std::collections::BTreeSet;

/// CTE decisions made before rule application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CteContext {
    forced: BTreeSet<CteId>,
}

impl CteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context in which the given CTEs must be materialized once and shared by
    /// all of their consumers.
    pub fn with_forced(ids: impl IntoIterator<Item = CteId>) -> Self {
        Self {
            forced: ids.into_iter().collect(),
        }
    }

    /// Whether `id` was chosen to be materialized rather than inlined.
    pub fn is_force_cte(&self, id: CteId) -> bool {
        self.forced.contains(&id)
    }

    /// Forced CTEs in ascending id order.
    pub fn forced_ctes(&self) -> impl Iterator<Item = CteId> + '_ {
        self.forced.iter().copied()
    }
}

/// Read-mostly state of one query optimization.
#[derive(Debug, Clone, Default)]
pub struct OptimizerContext {
    config: OptimizerConfig,
    cte_context: CteContext,
}

impl OptimizerContext {
    pub fn new(config: OptimizerConfig, cte_context: CteContext) -> Self {
        Self {
            config,
            cte_context,
        }
    }

    /// Default configuration with the given CTE decisions.
    pub fn with_cte_context(cte_context: CteContext) -> Self {
        Self::new(OptimizerConfig::default(), cte_context)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn cte_context(&self) -> &CteContext {
        &self.cte_context
    }

    pub fn is_force_cte(&self, id: CteId) -> bool {
        self.cte_context.is_force_cte(id)
    }
}
