//! # Rule Binding
//!
//! The narrow surface a search driver uses to fire rules on one node:
//!
//! ```text
//!   registry ──► candidate_rules ──(pattern matched)──► check ──false──► Rejected
//!                                                         │
//!                                                        true
//!                                                         ▼
//!                                                     transform ──► Applied(0..n alternatives)
//! ```
//!
//! The driver folds the alternatives into its own search space; this module keeps no
//! state between calls. [`implement_greedy`] is a costless bottom-up walk that takes
//! the first eligible implementation of every node. It is useful for tracing and
//! tests, not a substitute for the cost-based search.

use crate::context::OptimizerContext;
use crate::expr::{LogicalOp, Operator, OptExpr};
use crate::rule::{Rule, RuleCategory, RuleRegistry, RuleType};
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of firing one rule on one pattern-matched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// `check` returned false.
    Rejected,
    /// `check` passed; the alternatives `transform` produced (possibly none).
    Applied(Vec<OptExpr>),
}

impl RuleOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, RuleOutcome::Rejected)
    }

    pub fn alternatives(&self) -> &[OptExpr] {
        match self {
            RuleOutcome::Rejected => &[],
            RuleOutcome::Applied(alts) => alts,
        }
    }

    pub fn into_alternatives(self) -> Vec<OptExpr> {
        match self {
            RuleOutcome::Rejected => Vec::new(),
            RuleOutcome::Applied(alts) => alts,
        }
    }
}

/// One rule fired on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleApplication {
    pub rule_type: RuleType,
    pub outcome: RuleOutcome,
}

/// Fire `rule` on `expr`.
///
/// # Panics
///
/// If `expr` does not match the rule's pattern. Skipping the pattern match is a
/// driver bug, and rules rely on it to destructure their input.
pub fn apply_rule(rule: &dyn Rule, expr: &OptExpr, ctx: &OptimizerContext) -> RuleOutcome {
    assert!(
        rule.pattern().matches(expr),
        "rule {} does not match operator {:?}",
        rule.name(),
        expr.kind()
    );

    if !rule.check(expr, ctx) {
        trace!("Rule {} rejected for {}", rule.name(), expr.op());
        return RuleOutcome::Rejected;
    }

    let alternatives = rule.transform(expr, ctx);
    debug!(
        "Rule {} applied to {}: {} alternative(s)",
        rule.name(),
        expr.op(),
        alternatives.len()
    );
    RuleOutcome::Applied(alternatives)
}

/// Active rules of `category` whose pattern matches `expr`, in registry order.
pub fn candidate_rules<'r>(
    registry: &'r RuleRegistry,
    category: RuleCategory,
    expr: &OptExpr,
    ctx: &OptimizerContext,
) -> Vec<&'r dyn Rule> {
    registry
        .rules_of(category, ctx.config())
        .into_iter()
        .filter(|r| r.pattern().matches(expr))
        .collect()
}

/// Fire every matching rule of `category` on `expr`.
pub fn apply_matching_rules(
    registry: &RuleRegistry,
    category: RuleCategory,
    expr: &OptExpr,
    ctx: &OptimizerContext,
) -> Vec<RuleApplication> {
    let candidates = candidate_rules(registry, category, expr, ctx);
    trace!(
        "{} candidate {:?} rule(s) for {}",
        candidates.len(),
        category,
        expr.op()
    );
    candidates
        .into_iter()
        .map(|rule| RuleApplication {
            rule_type: rule.rule_type(),
            outcome: apply_rule(rule, expr, ctx),
        })
        .collect()
}

/// Implement a logical tree bottom-up, keeping the first alternative of the first
/// eligible implementation rule at every node.
///
/// Children are implemented before their parent so that rules which keep their
/// children (e.g. the CTE inlining rule) return a fully physical subtree. The body
/// below a consumer of a forced CTE is left alone, since the consumer reads the shared
/// materialization instead. A node that is already physical is kept as is. Returns
/// `None` if some logical node has no eligible implementation.
pub fn implement_greedy(
    registry: &RuleRegistry,
    expr: &Arc<OptExpr>,
    ctx: &OptimizerContext,
) -> Option<Arc<OptExpr>> {
    if expr.op().is_physical() {
        return Some(Arc::clone(expr));
    }

    let children = match expr.op() {
        Operator::Logical(LogicalOp::CteConsume { cte_id, .. }) if ctx.is_force_cte(*cte_id) => {
            expr.children().to_vec()
        }
        _ => expr
            .children()
            .iter()
            .map(|c| implement_greedy(registry, c, ctx))
            .collect::<Option<Vec<_>>>()?,
    };
    let node = OptExpr::new(expr.op().clone(), children);

    let chosen = apply_matching_rules(registry, RuleCategory::Implementation, &node, ctx)
        .into_iter()
        .find_map(|app| app.outcome.into_alternatives().into_iter().next());
    if chosen.is_none() {
        debug!("No implementation found for {}", node.op());
    }
    chosen.map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::*;
    use crate::pattern::Pattern;

    /// Implements a scan; rejected when CTE 1 is forced, to exercise `check`.
    struct ScanRule {
        pattern: Pattern,
    }

    impl Rule for ScanRule {
        fn rule_type(&self) -> RuleType {
            RuleType::ImpSeqScan
        }

        fn pattern(&self) -> &Pattern {
            &self.pattern
        }

        fn check(&self, _expr: &OptExpr, ctx: &OptimizerContext) -> bool {
            !ctx.is_force_cte(CteId(1))
        }

        fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
            let Operator::Logical(LogicalOp::Scan {
                table,
                columns,
                predicate,
            }) = expr.op()
            else {
                crate::rule::pattern_violation(self, expr)
            };
            vec![OptExpr::physical(
                PhysicalOp::SeqScan {
                    table: table.clone(),
                    columns: columns.clone(),
                    predicate: predicate.clone(),
                },
                vec![],
            )]
        }
    }

    fn registry() -> RuleRegistry {
        let mut r = RuleRegistry::new();
        r.add_rule(Box::new(ScanRule {
            pattern: Pattern::scan(),
        }));
        r
    }

    fn scan() -> OptExpr {
        OptExpr::logical(
            LogicalOp::Scan {
                table: TableRef {
                    schema: "s".into(),
                    name: "t".into(),
                },
                columns: vec![],
                predicate: None,
            },
            vec![],
        )
    }

    #[test]
    fn test_applied_and_rejected() {
        let registry = registry();
        let ctx = OptimizerContext::default();
        let apps = apply_matching_rules(&registry, RuleCategory::Implementation, &scan(), &ctx);
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].rule_type, RuleType::ImpSeqScan);
        assert_eq!(apps[0].outcome.alternatives().len(), 1);

        let forced = OptimizerContext::with_cte_context(crate::context::CteContext::with_forced([CteId(1)]));
        let apps = apply_matching_rules(&registry, RuleCategory::Implementation, &scan(), &forced);
        assert!(apps[0].outcome.is_rejected());
        assert!(apps[0].outcome.alternatives().is_empty());
    }

    #[test]
    fn test_no_candidates_for_other_category() {
        let registry = registry();
        let ctx = OptimizerContext::default();
        assert!(candidate_rules(&registry, RuleCategory::Transformation, &scan(), &ctx).is_empty());
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_apply_rule_on_non_matching_node_panics() {
        let registry = registry();
        let rule = registry.get(RuleType::ImpSeqScan).unwrap();
        let filter = OptExpr::logical(
            LogicalOp::Filter {
                predicate: Expr::Literal(ScalarValue::Bool(true)),
            },
            vec![Arc::new(scan())],
        );
        apply_rule(rule, &filter, &OptimizerContext::default());
    }

    #[test]
    #[should_panic(expected = "non-matching operator")]
    fn test_transform_without_match_panics() {
        let rule = ScanRule {
            pattern: Pattern::scan(),
        };
        let limit = OptExpr::logical(LogicalOp::Limit { offset: 0, count: 1 }, vec![Arc::new(scan())]);
        rule.transform(&limit, &OptimizerContext::default());
    }

    #[test]
    fn test_implement_greedy_gives_up_without_rule() {
        let registry = registry();
        let ctx = OptimizerContext::default();
        let plan = implement_greedy(&registry, &Arc::new(scan()), &ctx).unwrap();
        assert!(plan.op().is_physical());

        let limit = Arc::new(OptExpr::logical(
            LogicalOp::Limit { offset: 0, count: 1 },
            vec![Arc::new(scan())],
        ));
        assert!(implement_greedy(&registry, &limit, &ctx).is_none());
    }
}
