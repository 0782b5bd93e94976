//! # Join Commutativity Rule
//!
//! `A JOIN B = B JOIN A` for inner and cross joins. Left, right, semi and anti joins
//! have fixed left/right semantics and are never commuted.
//!
//! Swapping lets the hash join implementation consider the other input as its build
//! side. The equi-join condition is swapped along with the children so that each
//! side of `=` keeps referring to the same input.

use optx_core::context::OptimizerContext;
use optx_core::expr::*;
use optx_core::pattern::Pattern;
use optx_core::rule::{pattern_violation, Rule, RuleType};
use std::sync::Arc;

/// Join commutativity: A JOIN B -> B JOIN A.
pub struct JoinCommutativityRule {
    pattern: Pattern,
}

impl JoinCommutativityRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::join(),
        }
    }
}

impl Default for JoinCommutativityRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for JoinCommutativityRule {
    fn rule_type(&self) -> RuleType {
        RuleType::TfJoinCommutativity
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn check(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> bool {
        match expr.op() {
            Operator::Logical(LogicalOp::Join { join_type, .. }) => {
                matches!(join_type, JoinType::Inner | JoinType::Cross)
            }
            _ => pattern_violation(self, expr),
        }
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = expr.op()
        else {
            pattern_violation(self, expr)
        };

        let children = expr.children();
        vec![OptExpr::logical(
            LogicalOp::Join {
                join_type: *join_type,
                condition: swap_condition_sides(condition),
            },
            vec![Arc::clone(&children[1]), Arc::clone(&children[0])],
        )]
    }
}

/// For `A.x = B.y`, produce `B.y = A.x`. Conjunctions are swapped element-wise.
fn swap_condition_sides(expr: &Expr) -> Expr {
    match expr {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        } => Expr::BinaryOp {
            op: BinaryOp::Eq,
            left: right.clone(),
            right: left.clone(),
        },
        Expr::And(conjuncts) => Expr::And(conjuncts.iter().map(swap_condition_sides).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_condition() {
        let cond = Expr::equals(
            Expr::Column(ColumnRef::qualified("a", "x", 0)),
            Expr::Column(ColumnRef::qualified("b", "y", 0)),
        );
        match swap_condition_sides(&cond) {
            Expr::BinaryOp { left, right, .. } => {
                assert!(matches!(left.as_ref(), Expr::Column(c) if c.table.as_deref() == Some("b")));
                assert!(matches!(right.as_ref(), Expr::Column(c) if c.table.as_deref() == Some("a")));
            }
            _ => panic!("Expected BinaryOp"),
        }
    }

    #[test]
    fn test_swaps_children_of_inner_join_only() {
        let scan = |name: &str| {
            Arc::new(OptExpr::logical(
                LogicalOp::Scan {
                    table: TableRef {
                        schema: "s".into(),
                        name: name.into(),
                    },
                    columns: vec![],
                    predicate: None,
                },
                vec![],
            ))
        };
        let (a, b) = (scan("a"), scan("b"));
        let join = |join_type| {
            OptExpr::logical(
                LogicalOp::Join {
                    join_type,
                    condition: Expr::equals(Expr::column("x", 0), Expr::column("y", 1)),
                },
                vec![Arc::clone(&a), Arc::clone(&b)],
            )
        };
        let rule = JoinCommutativityRule::new();
        let ctx = OptimizerContext::default();

        assert!(!rule.check(&join(JoinType::Left), &ctx));
        let inner = join(JoinType::Inner);
        assert!(rule.check(&inner, &ctx));
        let out = rule.transform(&inner, &ctx);
        assert_eq!(out.len(), 1);
        assert!(Arc::ptr_eq(&out[0].children()[0], &b));
        assert!(Arc::ptr_eq(&out[0].children()[1], &a));
    }
}
