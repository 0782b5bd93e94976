//! # Join Implementation Rules
//!
//! ## Hash Join (`ImplHashJoinRule`)
//!
//! Builds a hash table on one side and probes it with the other. Produces two
//! alternatives per join, build-right first and then build-left, so the cost model can
//! pick the smaller build side.
//!
//! **Requires**: at least one equi-join predicate (`A.id = B.id`), except for cross joins.
//! **Cost**: O(build_rows) memory + O(build_rows + probe_rows) CPU.
//!
//! ## Nested Loop Join (`ImplNestedLoopJoinRule`)
//!
//! The universal fallback: for each left row, scan all right rows. Works with any join
//! condition, but O(n * m) makes it a last resort for large inputs.

use optx_core::context::OptimizerContext;
use optx_core::expr::*;
use optx_core::pattern::Pattern;
use optx_core::rule::{pattern_violation, Rule, RuleType};

fn join_parts<'a>(rule: &dyn Rule, expr: &'a OptExpr) -> (JoinType, &'a Expr) {
    match expr.op() {
        Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) => (*join_type, condition),
        _ => pattern_violation(rule, expr),
    }
}

/// Implement logical join as a hash join.
pub struct ImplHashJoinRule {
    pattern: Pattern,
}

impl ImplHashJoinRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::join(),
        }
    }
}

impl Default for ImplHashJoinRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImplHashJoinRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpHashJoin
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn check(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> bool {
        let (join_type, condition) = join_parts(self, expr);
        join_type == JoinType::Cross || has_equi_predicate(condition)
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let (join_type, condition) = join_parts(self, expr);
        [BuildSide::Right, BuildSide::Left]
            .into_iter()
            .map(|build_side| {
                OptExpr::physical(
                    PhysicalOp::HashJoin {
                        join_type,
                        build_side,
                        condition: condition.clone(),
                    },
                    expr.children().to_vec(),
                )
            })
            .collect()
    }
}

/// Implement logical join as a nested loop join. Always applicable.
pub struct ImplNestedLoopJoinRule {
    pattern: Pattern,
}

impl ImplNestedLoopJoinRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::join(),
        }
    }
}

impl Default for ImplNestedLoopJoinRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImplNestedLoopJoinRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpNestedLoopJoin
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let (join_type, condition) = join_parts(self, expr);
        vec![OptExpr::physical(
            PhysicalOp::NestedLoopJoin {
                join_type,
                condition: condition.clone(),
            },
            expr.children().to_vec(),
        )]
    }
}

/// Whether `expr` contains at least one `column = column` conjunct.
fn has_equi_predicate(expr: &Expr) -> bool {
    match expr {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        } => matches!(
            (left.as_ref(), right.as_ref()),
            (Expr::Column(_), Expr::Column(_))
        ),
        Expr::And(conjuncts) => conjuncts.iter().any(has_equi_predicate),
        _ => false,
    }
}
