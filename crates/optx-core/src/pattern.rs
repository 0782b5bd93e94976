//! # Declarative Pattern Matching for Optimization Rules
//!
//! Each rule declares a `Pattern` describing the shape of the trees it can rewrite.
//! The pattern is a pure structural pre-filter: the driver checks it before calling
//! the rule's `check`, and a rule may rely on a successful match when it destructures
//! the operators it was handed.
//!
//! ## Pattern Language
//!
//! - `Pattern::Operator(matcher, children)`: matches a node whose operator kind
//!   satisfies `matcher`, then matches `children` against the node's children in
//!   order. Declaring fewer child patterns than the node has leaves the trailing
//!   children unconstrained (an empty list means "don't look at the children at
//!   all"); declaring more than the node has fails the match.
//!
//! - `Pattern::Leaf`: the wildcard. Matches any node and stops descending, so the
//!   subtree below is treated as one opaque unit. Used when a rule only cares about
//!   the operators above it.
//!
//! Matching only ever looks at operator *kinds* ([`OpKind`](crate::expr::OpKind)),
//! never at payload values such as CTE ids or predicates.

use crate::expr::{LogicalOpKind, OpKind, OptExpr, PhysicalOpKind};

/// Pattern for matching expression trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Match an operator with child patterns.
    Operator(OpMatcher, Vec<Pattern>),
    /// Match any subtree.
    Leaf,
}

/// Matcher for operator types (without data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMatcher {
    LogicalOp(LogicalOpKind),
    PhysicalOp(PhysicalOpKind),
    AnyLogical,
    AnyPhysical,
}

impl OpMatcher {
    pub fn matches(&self, kind: OpKind) -> bool {
        match (self, kind) {
            (OpMatcher::LogicalOp(want), OpKind::Logical(got)) => *want == got,
            (OpMatcher::PhysicalOp(want), OpKind::Physical(got)) => *want == got,
            (OpMatcher::AnyLogical, OpKind::Logical(_)) => true,
            (OpMatcher::AnyPhysical, OpKind::Physical(_)) => true,
            _ => false,
        }
    }
}

impl Pattern {
    pub fn logical(kind: LogicalOpKind, children: Vec<Pattern>) -> Self {
        Pattern::Operator(OpMatcher::LogicalOp(kind), children)
    }

    pub fn physical(kind: PhysicalOpKind, children: Vec<Pattern>) -> Self {
        Pattern::Operator(OpMatcher::PhysicalOp(kind), children)
    }

    /// A logical CTE consume over an opaque subtree.
    pub fn cte_consume() -> Self {
        Pattern::logical(LogicalOpKind::CteConsume, vec![Pattern::Leaf])
    }

    /// A logical CTE produce over an opaque subtree.
    pub fn cte_produce() -> Self {
        Pattern::logical(LogicalOpKind::CteProduce, vec![Pattern::Leaf])
    }

    /// A logical CTE anchor: producer side and consumer side.
    pub fn cte_anchor() -> Self {
        Pattern::logical(LogicalOpKind::CteAnchor, vec![Pattern::Leaf, Pattern::Leaf])
    }

    /// Match a logical join with two opaque children.
    pub fn join() -> Self {
        Pattern::logical(LogicalOpKind::Join, vec![Pattern::Leaf, Pattern::Leaf])
    }

    /// Match a logical scan.
    pub fn scan() -> Self {
        Pattern::logical(LogicalOpKind::Scan, vec![])
    }

    /// Match a logical filter with one child.
    pub fn filter() -> Self {
        Pattern::logical(LogicalOpKind::Filter, vec![Pattern::Leaf])
    }

    /// Match a logical project with one child.
    pub fn project() -> Self {
        Pattern::logical(LogicalOpKind::Project, vec![Pattern::Leaf])
    }

    /// Match a logical sort.
    pub fn sort() -> Self {
        Pattern::logical(LogicalOpKind::Sort, vec![Pattern::Leaf])
    }

    /// Match a logical limit.
    pub fn limit() -> Self {
        Pattern::logical(LogicalOpKind::Limit, vec![Pattern::Leaf])
    }

    /// Check whether `expr` has the shape described by this pattern.
    pub fn matches(&self, expr: &OptExpr) -> bool {
        matches(expr, self)
    }
}

/// Check if an expression tree matches a pattern.
pub fn matches(expr: &OptExpr, pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Leaf => true,
        Pattern::Operator(matcher, child_patterns) => {
            if !matcher.matches(expr.kind()) {
                return false;
            }

            if child_patterns.len() > expr.arity() {
                return false;
            }

            // Trailing children beyond the declared patterns are unconstrained.
            expr.children()
                .iter()
                .zip(child_patterns.iter())
                .all(|(child, child_pattern)| matches(child, child_pattern))
        }
    }
}
