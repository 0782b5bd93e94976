//! # Sort Implementation Rule
//!
//! An *enforcer* is a physical operator whose only purpose is to deliver a required
//! physical property the child plan does not provide. Sort is the canonical one: when a
//! parent requires an ordering that `SortProperty::is_satisfy` says the child's
//! delivered ordering does not cover, the search places a SortOp on top. An Exchange
//! plays the same role for distribution.
//!
//! This module holds the rule for the explicit case, a logical Sort from ORDER BY.
//! Enforcer insertion itself belongs to the search driver.

use optx_core::context::OptimizerContext;
use optx_core::expr::*;
use optx_core::pattern::Pattern;
use optx_core::properties::{OrderSpec, SortProperty};
use optx_core::rule::{pattern_violation, Rule, RuleType};

/// Implement logical sort as a physical sort operator.
pub struct ImplSortRule {
    pattern: Pattern,
}

impl ImplSortRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::sort(),
        }
    }
}

impl Default for ImplSortRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImplSortRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpSort
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let Operator::Logical(LogicalOp::Sort { order }) = expr.op() else {
            pattern_violation(self, expr)
        };
        vec![OptExpr::physical(
            PhysicalOp::SortOp {
                order: order.clone(),
            },
            expr.children().to_vec(),
        )]
    }
}

/// The ordering a Sort node delivers. `ORDER BY a ASC, a DESC` delivers `[a ASC]`.
pub fn sort_property(rule: &dyn Rule, expr: &OptExpr) -> SortProperty {
    let Operator::Logical(LogicalOp::Sort { order }) = expr.op() else {
        pattern_violation(rule, expr)
    };
    SortProperty::new(OrderSpec::deduplicated(order.clone()))
}
