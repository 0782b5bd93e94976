//! # Rule System
//!
//! This module defines the rule trait and rule registry that all rewrites go through.
//!
//! ## Rule Categories
//!
//! - **Transformation rules** (`RuleCategory::Transformation`): rewrite a logical
//!   operator into an equivalent logical operator, e.g. join commutativity.
//! - **Implementation rules** (`RuleCategory::Implementation`): map a logical operator
//!   to one or more physical operators, e.g. a CTE consume to a no-CTE passthrough.
//!
//! ## Two-Phase Contract
//!
//! A rule is an immutable pair of a [`RuleType`] identifier and a [`Pattern`]. Once
//! the pattern has matched a node, the driver calls:
//!
//! 1. `check(expr, ctx)`: a cheap, deterministic eligibility test that may read the
//!    context but never changes it. `false` rejects the rule for this node.
//! 2. `transform(expr, ctx)`: produces zero or more equivalent alternatives. The input
//!    is never modified; alternatives are new nodes that share unchanged children
//!    through `Arc`. An empty result means "no improvement", not failure.
//!
//! `transform` may assume the pattern matched. Calling it on a node that does not
//! match is a driver bug and panics.
//!
//! Rules hold no mutable state, so one registry can serve concurrent optimizations
//! and concurrent rule invocations on different nodes of one query.
//!
//! ## Rule Registry
//!
//! The `RuleRegistry` collects all rules and can include connector-specific rule sets
//! keyed by source type. Which rules are active for a query is decided by its
//! [`OptimizerConfig`].

use crate::config::OptimizerConfig;
use crate::context::OptimizerContext;
use crate::expr::OptExpr;
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Classification of optimization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCategory {
    /// Logical → Logical transformation (e.g., join commutativity).
    Transformation,
    /// Logical → Physical implementation (e.g., join → hash join).
    Implementation,
}

/// Identifier of every built-in rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    TfJoinCommutativity,
    ImpSeqScan,
    ImpFilter,
    ImpProject,
    ImpLimit,
    ImpSort,
    ImpHashJoin,
    ImpNestedLoopJoin,
    ImpCteAnchor,
    ImpCteAnchorToNoCte,
    ImpCteProduce,
    ImpCteConsume,
    ImpCteConsumeInline,
}

impl RuleType {
    pub const ALL: [RuleType; 13] = [
        RuleType::TfJoinCommutativity,
        RuleType::ImpSeqScan,
        RuleType::ImpFilter,
        RuleType::ImpProject,
        RuleType::ImpLimit,
        RuleType::ImpSort,
        RuleType::ImpHashJoin,
        RuleType::ImpNestedLoopJoin,
        RuleType::ImpCteAnchor,
        RuleType::ImpCteAnchorToNoCte,
        RuleType::ImpCteProduce,
        RuleType::ImpCteConsume,
        RuleType::ImpCteConsumeInline,
    ];

    /// Stable name, used in configuration and logs.
    pub fn name(&self) -> &'static str {
        match self {
            RuleType::TfJoinCommutativity => "TF_JOIN_COMMUTATIVITY",
            RuleType::ImpSeqScan => "IMP_SEQ_SCAN",
            RuleType::ImpFilter => "IMP_FILTER",
            RuleType::ImpProject => "IMP_PROJECT",
            RuleType::ImpLimit => "IMP_LIMIT",
            RuleType::ImpSort => "IMP_SORT",
            RuleType::ImpHashJoin => "IMP_HASH_JOIN",
            RuleType::ImpNestedLoopJoin => "IMP_NESTED_LOOP_JOIN",
            RuleType::ImpCteAnchor => "IMP_CTE_ANCHOR",
            RuleType::ImpCteAnchorToNoCte => "IMP_CTE_ANCHOR_TO_NO_CTE",
            RuleType::ImpCteProduce => "IMP_CTE_PRODUCE",
            RuleType::ImpCteConsume => "IMP_CTE_CONSUME",
            RuleType::ImpCteConsumeInline => "IMP_CTE_CONSUME_INLINE",
        }
    }

    /// Look up a rule by its stable name (case-insensitive).
    pub fn from_name(name: &str) -> Option<RuleType> {
        RuleType::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }

    pub fn category(&self) -> RuleCategory {
        match self {
            RuleType::TfJoinCommutativity => RuleCategory::Transformation,
            _ => RuleCategory::Implementation,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rule transforms or implements expressions.
pub trait Rule: Send + Sync {
    /// Identifier of this rule.
    fn rule_type(&self) -> RuleType;

    /// Pattern that this rule matches against.
    fn pattern(&self) -> &Pattern;

    /// Unique name of this rule.
    fn name(&self) -> &str {
        self.rule_type().name()
    }

    /// Whether this rule is a transformation or implementation rule.
    fn category(&self) -> RuleCategory {
        self.rule_type().category()
    }

    /// Context-dependent eligibility of a node that already matched the pattern.
    fn check(&self, _expr: &OptExpr, _ctx: &OptimizerContext) -> bool {
        true
    }

    /// Produce the alternatives of a matching, eligible node.
    fn transform(&self, expr: &OptExpr, ctx: &OptimizerContext) -> Vec<OptExpr>;

    /// Hash for fingerprinting (to avoid re-applying rules).
    fn rule_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.name().hash(&mut hasher);
        hasher.finish()
    }
}

/// Panic raised when `transform` receives a node its pattern would have rejected.
///
/// Rules destructure their operator payload without re-checking it; reaching this
/// means the driver skipped the pattern match.
#[track_caller]
pub fn pattern_violation(rule: &dyn Rule, expr: &OptExpr) -> ! {
    panic!(
        "rule {} applied to non-matching operator {:?}",
        rule.name(),
        expr.kind()
    )
}

/// A named set of rules (e.g., for a specific connector).
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }
}

/// Registry of optimization rules.
pub struct RuleRegistry {
    pub base_rules: Vec<Box<dyn Rule>>,
    pub source_rules: HashMap<String, RuleSet>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            base_rules: Vec::new(),
            source_rules: HashMap::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.base_rules.push(rule);
    }

    pub fn add_source_rule_set(&mut self, name: impl Into<String>, rule_set: RuleSet) {
        self.source_rules.insert(name.into(), rule_set);
    }

    /// First registered base rule with the given identifier.
    pub fn get(&self, rule_type: RuleType) -> Option<&dyn Rule> {
        self.base_rules
            .iter()
            .find(|r| r.rule_type() == rule_type)
            .map(|r| r.as_ref())
    }

    /// Rules active under `config`: base rules plus the rule set of the configured
    /// source type, minus disabled rules, in registration order.
    pub fn active_rules(&self, config: &OptimizerConfig) -> Vec<&dyn Rule> {
        let mut rules: Vec<&dyn Rule> = self.base_rules.iter().map(|r| r.as_ref()).collect();
        if let Some(source) = config.source_type.as_deref() {
            if let Some(rs) = self.source_rules.get(source) {
                rules.extend(rs.rules.iter().map(|r| r.as_ref()));
            }
        }
        rules.retain(|r| !config.is_disabled(r.rule_type()));
        rules
    }

    /// Active rules of one category.
    pub fn rules_of(&self, category: RuleCategory, config: &OptimizerConfig) -> Vec<&dyn Rule> {
        self.active_rules(config)
            .into_iter()
            .filter(|r| r.category() == category)
            .collect()
    }

    /// Get all transformation rules.
    pub fn transformation_rules(&self, config: &OptimizerConfig) -> Vec<&dyn Rule> {
        self.rules_of(RuleCategory::Transformation, config)
    }

    /// Get all implementation rules.
    pub fn implementation_rules(&self, config: &OptimizerConfig) -> Vec<&dyn Rule> {
        self.rules_of(RuleCategory::Implementation, config)
    }

    pub fn len(&self) -> usize {
        self.base_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base_rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
