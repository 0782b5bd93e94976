//! # Scan Implementation Rule
//!
//! Maps a logical Scan to a physical SeqScan. In a lakehouse setting this is the only
//! scan strategy: Parquet/ORC files carry no B-tree or hash indexes. Partition pruning,
//! row-group statistics and delete files are handled by the connector below the
//! SeqScan and do not change the physical operator model.

use optx_core::context::OptimizerContext;
use optx_core::expr::*;
use optx_core::pattern::Pattern;
use optx_core::rule::{pattern_violation, Rule, RuleType};

/// Implement logical scan as a sequential (full) table scan.
pub struct ImplSeqScanRule {
    pattern: Pattern,
}

impl ImplSeqScanRule {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::scan(),
        }
    }
}

impl Default for ImplSeqScanRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImplSeqScanRule {
    fn rule_type(&self) -> RuleType {
        RuleType::ImpSeqScan
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn transform(&self, expr: &OptExpr, _ctx: &OptimizerContext) -> Vec<OptExpr> {
        let Operator::Logical(LogicalOp::Scan {
            table,
            columns,
            predicate,
        }) = expr.op()
        else {
            pattern_violation(self, expr)
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
