//! # Unary Implementation Rules
//!
//! One-to-one mappings for the single-child relational operators. Each produces exactly
//! one physical alternative and reuses the logical child unchanged.

use optx_core::context::OptimizerContext;
use optx_core::expr::*;
use optx_core::pattern::Pattern;
use optx_core::rule::{pattern_violation, Rule, RuleType};

/// Logical Filter → physical Filter.
pub struct ImplFilterRule {
    pattern: Pattern,
}

impl ImplFilterRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::filter(),
        }
    }
}

impl Default for ImplFilterRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImplFilterRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpFilter
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let Operator::Logical(LogicalOp::Filter { predicate }) = expr.op() else {
            pattern_violation(self, expr)
        };
        vec![OptExpr::physical(
            PhysicalOp::Filter {
                predicate: predicate.clone(),
            },
            expr.children().to_vec(),
        )]
    }
}

/// Logical Project → physical Project.
pub struct ImplProjectRule {
    pattern: Pattern,
}

impl ImplProjectRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::project(),
        }
    }
}

impl Default for ImplProjectRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImplProjectRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpProject
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let Operator::Logical(LogicalOp::Project { exprs, aliases }) = expr.op() else {
            pattern_violation(self, expr)
        };
        vec![OptExpr::physical(
            PhysicalOp::Project {
                exprs: exprs.clone(),
                aliases: aliases.clone(),
            },
            expr.children().to_vec(),
        )]
    }
}

/// Logical Limit → physical Limit.
pub struct ImplLimitRule {
    pattern: Pattern,
}

impl ImplLimitRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::limit(),
        }
    }
}

impl Default for ImplLimitRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImplLimitRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpLimit
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let Operator::Logical(LogicalOp::Limit { offset, count }) = expr.op() else {
            pattern_violation(self, expr)
        };
        vec![OptExpr::physical(
            PhysicalOp::Limit {
                offset: *offset,
                count: *count,
            },
            expr.children().to_vec(),
        )]
    }
}
