//! End-to-end test: CTE consumer inlining.
//!
//! Builds a query with one CTE referenced twice,
//!
//! ```sql
//! WITH c AS (SELECT * FROM tpch.orders WHERE o_totalprice > 1000)
//! SELECT * FROM c JOIN c AS c2 ON c.o_custkey = c2.o_custkey
//! ```
//!
//! and drives the default rule set over it with the CTE either inlined or forced
//! to be materialized.

use optx_core::binder::{apply_matching_rules, apply_rule, candidate_rules, implement_greedy, RuleOutcome};
use optx_core::config::OptimizerConfig;
use optx_core::context::{CteContext, OptimizerContext};
use optx_core::expr::*;
use optx_core::pattern::{matches, Pattern};
use optx_core::rule::{Rule, RuleCategory, RuleType};
use optx_rules::default_rule_registry;
use optx_rules::impl_cte::CteConsumeInlineRule;
use std::sync::Arc;

const CTE: CteId = CteId(8);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("optx_core=debug,optx_rules=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn orders_scan() -> Arc<OptExpr> {
    Arc::new(OptExpr::logical(
        LogicalOp::Scan {
            table: TableRef {
                schema: "tpch".into(),
                name: "orders".into(),
            },
            columns: vec![
                ColumnRef::qualified("orders", "o_custkey", 0),
                ColumnRef::qualified("orders", "o_totalprice", 1),
            ],
            predicate: None,
        },
        vec![],
    ))
}

fn cte_body() -> Arc<OptExpr> {
    Arc::new(OptExpr::logical(
        LogicalOp::Filter {
            predicate: Expr::BinaryOp {
                op: BinaryOp::Gt,
                left: Box::new(Expr::Column(ColumnRef::qualified("orders", "o_totalprice", 1))),
                right: Box::new(Expr::Literal(ScalarValue::Int64(1000))),
            },
        },
        vec![orders_scan()],
    ))
}

fn consume(id: CteId, output: &str, child: Arc<OptExpr>) -> Arc<OptExpr> {
    Arc::new(OptExpr::logical(
        LogicalOp::CteConsume {
            cte_id: id,
            column_map: ColumnMap::new(vec![(
                ColumnRef::new(output, 0),
                Expr::Column(ColumnRef::qualified("orders", "o_custkey", 0)),
            )]),
        },
        vec![child],
    ))
}

fn query(id: CteId) -> Arc<OptExpr> {
    let produce = Arc::new(OptExpr::logical(LogicalOp::CteProduce { cte_id: id }, vec![cte_body()]));
    let join = Arc::new(OptExpr::logical(
        LogicalOp::Join {
            join_type: JoinType::Inner,
            condition: Expr::equals(Expr::column("c_custkey", 0), Expr::column("c2_custkey", 0)),
        },
        vec![consume(id, "c_custkey", cte_body()), consume(id, "c2_custkey", cte_body())],
    ));
    Arc::new(OptExpr::logical(LogicalOp::CteAnchor { cte_id: id }, vec![produce, join]))
}

fn forcing(ids: &[CteId]) -> OptimizerContext {
    OptimizerContext::with_cte_context(CteContext::with_forced(ids.iter().copied()))
}

fn count_kind(expr: &OptExpr, kind: OpKind) -> usize {
    let own = usize::from(expr.kind() == kind);
    own + expr.children().iter().map(|c| count_kind(c, kind)).sum::<usize>()
}

#[test]
fn test_check_follows_forced_set() {
    init_tracing();
    let rule = CteConsumeInlineRule::new();
    let ctx = forcing(&[CteId(7)]);

    let forced = consume(CteId(7), "a", cte_body());
    assert!(rule.pattern().matches(&forced));
    assert!(!rule.check(&forced, &ctx));

    let free = consume(CTE, "a", cte_body());
    assert!(rule.check(&free, &ctx));
    assert!(rule.check(&free, &forcing(&[])));
}

#[test]
fn test_transform_produces_single_no_cte() {
    init_tracing();
    let rule = CteConsumeInlineRule::new();
    let body = orders_scan();
    let consumer = OptExpr::logical(
        LogicalOp::CteConsume {
            cte_id: CTE,
            column_map: ColumnMap::new(vec![(ColumnRef::new("a", 0), Expr::column("col1", 1))]),
        },
        vec![Arc::clone(&body)],
    );

    let out = rule.transform(&consumer, &OptimizerContext::default());
    assert_eq!(out.len(), 1);
    let no_cte = &out[0];
    match no_cte.op() {
        Operator::Physical(PhysicalOp::NoCte { cte_id, column_map }) => {
            assert_eq!(*cte_id, CTE);
            assert_eq!(column_map.to_string(), "{a -> col1}");
        }
        other => panic!("expected NoCte, got {other}"),
    }
    assert_eq!(no_cte.arity(), 1);
    assert!(Arc::ptr_eq(&no_cte.children()[0], &body));
}

#[test]
fn test_pattern_rejects_other_operators() {
    let pattern = Pattern::cte_consume();
    assert!(!matches(&orders_scan(), &pattern));
    assert!(!matches(&cte_body(), &pattern));

    // A consumer whose body was already stripped has fewer children than declared.
    let bare = OptExpr::logical(
        LogicalOp::CteConsume {
            cte_id: CTE,
            column_map: ColumnMap::default(),
        },
        vec![],
    );
    assert!(!matches(&bare, &pattern));
}

#[test]
fn test_output_is_not_rematched() {
    init_tracing();
    let registry = default_rule_registry();
    let ctx = OptimizerContext::default();
    let consumer = consume(CTE, "a", cte_body());

    let apps = apply_matching_rules(&registry, RuleCategory::Implementation, &consumer, &ctx);
    let inlined: Vec<_> = apps
        .iter()
        .filter(|app| app.rule_type == RuleType::ImpCteConsumeInline)
        .collect();
    assert_eq!(inlined.len(), 1);
    let no_cte = &inlined[0].outcome.alternatives()[0];

    assert!(!Pattern::cte_consume().matches(no_cte));
    for category in [RuleCategory::Implementation, RuleCategory::Transformation] {
        assert!(candidate_rules(&registry, category, no_cte, &ctx).is_empty());
    }
}

#[test]
fn test_reuse_and_inline_are_exclusive() {
    let registry = default_rule_registry();
    let consumer = consume(CTE, "a", cte_body());

    for ctx in [forcing(&[]), forcing(&[CTE])] {
        let applied: Vec<_> = apply_matching_rules(&registry, RuleCategory::Implementation, &consumer, &ctx)
            .into_iter()
            .filter(|app| !app.outcome.is_rejected())
            .map(|app| app.rule_type)
            .collect();
        let expected = if ctx.is_force_cte(CTE) {
            RuleType::ImpCteConsume
        } else {
            RuleType::ImpCteConsumeInline
        };
        assert_eq!(applied, vec![expected]);
    }
}

#[test]
fn test_inlined_query_plan() {
    init_tracing();
    let registry = default_rule_registry();
    let ctx = OptimizerContext::default();
    let plan = implement_greedy(&registry, &query(CTE), &ctx).expect("plan");
    println!("{}", plan.explain());

    // The anchor drops the producer; both consumers carry their own copy of the body.
    assert_eq!(
        plan.op(),
        &Operator::Physical(PhysicalOp::NoCte {
            cte_id: CTE,
            column_map: ColumnMap::default(),
        })
    );
    let no_cte = OpKind::Physical(PhysicalOpKind::NoCte);
    assert_eq!(count_kind(&plan, no_cte), 3);
    assert_eq!(count_kind(&plan, OpKind::Physical(PhysicalOpKind::CteProduce)), 0);
    assert_eq!(count_kind(&plan, OpKind::Physical(PhysicalOpKind::SeqScan)), 2);
    assert_eq!(count_kind(&plan, OpKind::Physical(PhysicalOpKind::HashJoin)), 1);
    assert!(!plan.explain().contains("Logical"));
}

#[test]
fn test_forced_query_plan() {
    init_tracing();
    let registry = default_rule_registry();
    let ctx = forcing(&[CTE]);
    let plan = implement_greedy(&registry, &query(CTE), &ctx).expect("plan");
    println!("{}", plan.explain());

    // The producer is computed once and both consumers read it.
    assert_eq!(plan.kind(), OpKind::Physical(PhysicalOpKind::CteAnchor));
    assert_eq!(count_kind(&plan, OpKind::Physical(PhysicalOpKind::CteProduce)), 1);
    assert_eq!(count_kind(&plan, OpKind::Physical(PhysicalOpKind::CteConsume)), 2);
    assert_eq!(count_kind(&plan, OpKind::Physical(PhysicalOpKind::NoCte)), 0);
    assert_eq!(count_kind(&plan, OpKind::Physical(PhysicalOpKind::SeqScan)), 1);
}

#[test]
fn test_disabled_inline_rule_leaves_consumer_unimplemented() {
    let registry = default_rule_registry();
    let config = OptimizerConfig::from_json(r#"{"disabled_rules": ["IMP_CTE_CONSUME_INLINE"]}"#).unwrap();
    let ctx = OptimizerContext::new(config, CteContext::new());
    let consumer = consume(CTE, "a", cte_body());

    let candidates = candidate_rules(&registry, RuleCategory::Implementation, &consumer, &ctx);
    assert!(candidates.iter().all(|r| r.rule_type() != RuleType::ImpCteConsumeInline));
    assert!(implement_greedy(&registry, &consumer, &ctx).is_none());
}

#[test]
fn test_apply_rule_reports_rejection() {
    let rule = CteConsumeInlineRule::new();
    let consumer = consume(CTE, "a", cte_body());
    assert_eq!(apply_rule(&rule, &consumer, &forcing(&[CTE])), RuleOutcome::Rejected);
    assert_eq!(
        apply_rule(&rule, &consumer, &forcing(&[])).alternatives().len(),
        1
    );
}

#[test]
fn test_forced_consumer_body_is_not_implemented() {
    init_tracing();
    let registry = default_rule_registry();
    // Without a filter implementation the CTE body itself cannot be planned.
    let config = OptimizerConfig::default().disable(RuleType::ImpFilter);
    let consumer = consume(CTE, "a", cte_body());

    let forced = OptimizerContext::new(config.clone(), CteContext::with_forced([CTE]));
    let plan = implement_greedy(&registry, &consumer, &forced).expect("forced consumer reads the shared rows");
    assert_eq!(plan.kind(), OpKind::Physical(PhysicalOpKind::CteConsume));
    assert_eq!(plan.arity(), 0);

    let inlined = OptimizerContext::new(config, CteContext::new());
    assert!(implement_greedy(&registry, &consumer, &inlined).is_none());
}
