//! # CTE Implementation Rules
//!
//! A common table expression is planned as three logical operators:
//!
//! ```text
//! CteAnchor(id)
//! ├── CteProduce(id)        computes the CTE rows
//! │   └── ...
//! └── ... query ...
//!     └── CteConsume(id)    one per reference, each over an inlined copy of the body
//!         └── ...
//! ```
//!
//! An earlier planning pass decides, per CTE, whether it is *forced* to be
//! materialized once and shared, or inlined at every consumer. The decision is
//! frozen into the [`OptimizerContext`] and these rules only read it:
//!
//! | rule                     | fires when  | produces                                   |
//! |--------------------------|-------------|--------------------------------------------|
//! | `CteConsumeInlineRule`   | not forced  | `NoCte` over the inlined body              |
//! | `CteConsumeReuseRule`    | forced      | `CteConsume` leaf reading the shared rows  |
//! | `CteProduceRule`         | always      | `CteProduce`                               |
//! | `CteAnchorRule`          | forced      | `CteAnchor` over producer and query        |
//! | `CteAnchorToNoCteRule`   | not forced  | `NoCte` over the query side only           |
//!
//! For any one CTE exactly one of each pair fires, so a plan never mixes shared and
//! inlined consumers of the same CTE. The physical `NoCte` output is never matched
//! by the logical consume or anchor patterns again, so re-scanning rewritten output
//! cannot loop.

use optx_core::context::OptimizerContext;
use optx_core::expr::*;
use optx_core::pattern::Pattern;
use optx_core::rule::{pattern_violation, Rule, RuleType};
use std::sync::Arc;
use tracing::trace;

fn consume_parts<'a>(rule: &dyn Rule, expr: &'a OptExpr) -> (CteId, &'a ColumnMap) {
    match expr.op() {
        Operator::Logical(LogicalOp::CteConsume { cte_id, column_map }) => (*cte_id, column_map),
        _ => pattern_violation(rule, expr),
    }
}

fn anchor_id(rule: &dyn Rule, expr: &OptExpr) -> CteId {
    match expr.op() {
        Operator::Logical(LogicalOp::CteAnchor { cte_id }) => *cte_id,
        _ => pattern_violation(rule, expr),
    }
}

/// Inline a CTE consumer: logical `CteConsume` → physical `NoCte`.
///
/// Eligible only when the CTE is not forced to be materialized. The `NoCte` node keeps
/// the CTE id, the column map and the consumer's children (the inlined body), and
/// marks that there is no materialization boundary at this point of the plan.
pub struct CteConsumeInlineRule {
    pattern: Pattern,
}

impl CteConsumeInlineRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::cte_consume(),
        }
    }
}

impl Default for CteConsumeInlineRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CteConsumeInlineRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpCteConsumeInline
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn check(&self, expr: &OptExpr, ctx: &OptimizerContext) -> bool {
        let (cte_id, _) = consume_parts(self, expr);
        let forced = ctx.is_force_cte(cte_id);
        trace!("CTE {} consumer: forced={}", cte_id, forced);
        !forced
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let (cte_id, column_map) = consume_parts(self, expr);
        vec![OptExpr::physical(
            PhysicalOp::NoCte {
                cte_id,
                column_map: column_map.clone(),
            },
            expr.children().to_vec(),
        )]
    }
}

/// Read a materialized CTE: logical `CteConsume` → physical `CteConsume` leaf.
///
/// The inlined body below the logical consumer is dropped; the rows come from the
/// shared `CteProduce` instead.
pub struct CteConsumeReuseRule {
    pattern: Pattern,
}

impl CteConsumeReuseRule {
    pub fn new() -> Self {
        // No child pattern: a consumer whose body was already stripped still matches.
        Self {
            pattern: Pattern::logical(LogicalOpKind::CteConsume, vec![]),
        }
    }
}

impl Default for CteConsumeReuseRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CteConsumeReuseRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpCteConsume
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn check(&self, expr: &OptExpr, ctx: &OptimizerContext) -> bool {
        let (cte_id, _) = consume_parts(self, expr);
        ctx.is_force_cte(cte_id)
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let (cte_id, column_map) = consume_parts(self, expr);
        vec![OptExpr::physical(
            PhysicalOp::CteConsume {
                cte_id,
                column_map: column_map.clone(),
            },
            vec![],
        )]
    }
}

/// Logical `CteProduce` → physical `CteProduce`.
pub struct CteProduceRule {
    pattern: Pattern,
}

impl CteProduceRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::cte_produce(),
        }
    }
}

impl Default for CteProduceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CteProduceRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpCteProduce
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let Operator::Logical(LogicalOp::CteProduce { cte_id }) = expr.op() else {
            pattern_violation(self, expr)
        };
        vec![OptExpr::physical(
            PhysicalOp::CteProduce { cte_id: *cte_id },
            expr.children().to_vec(),
        )]
    }
}

/// Keep the materialization scope of a forced CTE: logical → physical `CteAnchor`.
pub struct CteAnchorRule {
    pattern: Pattern,
}

impl CteAnchorRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::cte_anchor(),
        }
    }
}

impl Default for CteAnchorRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CteAnchorRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpCteAnchor
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn check(&self, expr: &OptExpr, ctx: &OptimizerContext) -> bool {
        ctx.is_force_cte(anchor_id(self, expr))
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let cte_id = anchor_id(self, expr);
        vec![OptExpr::physical(
            PhysicalOp::CteAnchor { cte_id },
            expr.children().to_vec(),
        )]
    }
}

/// Drop the materialization scope of an inlined CTE.
///
/// Every consumer of a non-forced CTE is inlined, so the producer side is dead. The
/// anchor becomes a `NoCte` over the query side alone.
pub struct CteAnchorToNoCteRule {
    pattern: Pattern,
}

impl CteAnchorToNoCteRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::cte_anchor(),
        }
    }
}

impl Default for CteAnchorToNoCteRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CteAnchorToNoCteRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpCteAnchorToNoCte
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn check(&self, expr: &OptExpr, ctx: &OptimizerContext) -> bool {
        !ctx.is_force_cte(anchor_id(self, expr))
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let cte_id = anchor_id(self, expr);
        let query_side = expr
            .children()
            .get(1)
            .map(Arc::clone)
            .unwrap_or_else(|| pattern_violation(self, expr));
        vec![OptExpr::physical(
            PhysicalOp::NoCte {
                cte_id,
                column_map: ColumnMap::default(),
            },
            vec![query_side],
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optx_core::context::CteContext;

    fn scan(name: &str) -> Arc<OptExpr> {
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
    }

    fn ctx_forcing(ids: &[u32]) -> OptimizerContext {
        OptimizerContext::with_cte_context(CteContext::with_forced(ids.iter().map(|i| CteId(*i))))
    }

    fn anchor(id: u32) -> OptExpr {
        let produce = Arc::new(OptExpr::logical(
            LogicalOp::CteProduce { cte_id: CteId(id) },
            vec![scan("body")],
        ));
        OptExpr::logical(LogicalOp::CteAnchor { cte_id: CteId(id) }, vec![produce, scan("query")])
    }

    #[test]
    fn test_reuse_is_the_complement_of_inline() {
        let consume = OptExpr::logical(
            LogicalOp::CteConsume {
                cte_id: CteId(7),
                column_map: ColumnMap::default(),
            },
            vec![scan("body")],
        );
        let forced = ctx_forcing(&[7]);
        let not_forced = ctx_forcing(&[]);
        let inline = CteConsumeInlineRule::new();
        let reuse = CteConsumeReuseRule::new();

        assert!(!inline.check(&consume, &forced));
        assert!(reuse.check(&consume, &forced));
        assert!(inline.check(&consume, &not_forced));
        assert!(!reuse.check(&consume, &not_forced));

        let out = reuse.transform(&consume, &forced);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), OpKind::Physical(PhysicalOpKind::CteConsume));
        assert_eq!(out[0].arity(), 0);
    }

    #[test]
    fn test_anchor_rules() {
        let expr = anchor(3);
        let keep = CteAnchorRule::new();
        let drop = CteAnchorToNoCteRule::new();
        assert!(keep.pattern().matches(&expr));
        assert!(drop.pattern().matches(&expr));

        let forced = ctx_forcing(&[3]);
        assert!(keep.check(&expr, &forced));
        assert!(!drop.check(&expr, &forced));
        let kept = keep.transform(&expr, &forced);
        assert_eq!(kept[0].kind(), OpKind::Physical(PhysicalOpKind::CteAnchor));
        assert!(Arc::ptr_eq(&kept[0].children()[0], &expr.children()[0]));
        assert!(Arc::ptr_eq(&kept[0].children()[1], &expr.children()[1]));

        let inlined = ctx_forcing(&[]);
        assert!(drop.check(&expr, &inlined));
        let dropped = drop.transform(&expr, &inlined);
        assert_eq!(dropped.len(), 1);
        assert_eq!(
            dropped[0].op(),
            &Operator::Physical(PhysicalOp::NoCte {
                cte_id: CteId(3),
                column_map: ColumnMap::default(),
            })
        );
        assert_eq!(dropped[0].arity(), 1);
        assert!(Arc::ptr_eq(&dropped[0].children()[0], &expr.children()[1]));
    }

    #[test]
    fn test_produce_keeps_body() {
        let expr = anchor(1);
        let produce = &expr.children()[0];
        let rule = CteProduceRule::new();
        let out = rule.transform(produce, &OptimizerContext::default());
        assert_eq!(out[0].op(), &Operator::Physical(PhysicalOp::CteProduce { cte_id: CteId(1) }));
        assert!(Arc::ptr_eq(&out[0].children()[0], &produce.children()[0]));
    }

    #[test]
    #[should_panic(expected = "IMP_CTE_ANCHOR_TO_NO_CTE")]
    fn test_anchor_without_query_side_panics_with_rule_name() {
        let half = OptExpr::logical(LogicalOp::CteAnchor { cte_id: CteId(2) }, vec![scan("body")]);
        CteAnchorToNoCteRule::new().transform(&half, &OptimizerContext::default());
    }

    #[test]
    #[should_panic(expected = "IMP_CTE_CONSUME_INLINE")]
    fn test_check_on_wrong_operator_panics() {
        CteConsumeInlineRule::new().check(&scan("t"), &OptimizerContext::default());
    }
}
