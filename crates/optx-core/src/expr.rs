//! # Expression and Operator Types
//!
//! This module defines the plan representation that patterns match against and
//! rules rewrite. It is organized into three layers:
//!
//! ## Scalar Expressions (`Expr`)
//! Scalar expressions represent computations on individual rows: column references,
//! literal values, arithmetic operations, comparisons, boolean logic, and function calls.
//! They appear inside predicates, projections, join conditions, sort keys and
//! hash partitioning columns.
//!
//! ## Logical Operators (`LogicalOp`) and Physical Operators (`PhysicalOp`)
//! Logical operators describe *what* to compute; physical operators describe *how*.
//! Each layer is a closed enum so that every rule and the pattern matcher handle
//! operators with exhaustive matches instead of runtime type checks. The CTE
//! operators come in both layers: a logical `CteConsume` is implemented either as a
//! physical `CteConsume` (read the shared materialization) or as a physical `NoCte`
//! (no materialization boundary, the consumed subtree is inlined in place).
//!
//! ## Expression Tree (`OptExpr`)
//! An `OptExpr` is an immutable node: an `Operator` plus an ordered list of children.
//! Children are held behind `Arc`, so a rewrite that leaves a subtree untouched shares
//! it with the original tree instead of copying it. The structure is a tree, never a
//! DAG: grouping alternatives into a DAG is the memo's job, which lives outside this
//! crate.

use crate::properties::DistributionSpec;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Reference to a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Reference to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
    pub index: u32,
}

impl ColumnRef {
    /// An unqualified column reference.
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            table: None,
            name: name.into(),
            index,
        }
    }

    /// A column reference qualified by its table name.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>, index: u32) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
            index,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref t) = self.table {
            write!(f, "{}.{}", t, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Scalar value for expressions.
///
/// Uses `OrderedFloat` for `f64` so that floating-point literals can take part in
/// the structural Eq/Hash of plans and property sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    /// SQL NULL value.
    Null,
    /// Boolean true/false.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point, wrapped in OrderedFloat for Eq/Hash support.
    Float64(OrderedFloat<f64>),
    /// UTF-8 string.
    Utf8(String),
    /// Date as days since Unix epoch (1970-01-01).
    Date(i32),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{}", v.into_inner()),
            Self::Utf8(v) => write!(f, "'{v}'"),
            Self::Date(v) => write!(f, "DATE({v})"),
        }
    }
}

/// Scalar expressions used in predicates, projections, join conditions, etc.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to a column by name and ordinal index.
    Column(ColumnRef),
    /// Constant literal value.
    Literal(ScalarValue),
    /// Binary operation (e.g., `a + b`, `x = y`, `price > 100`).
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation (e.g., `NOT flag`, `-value`, `IS NULL`).
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Named function call (e.g., `UPPER(name)`, `ABS(value)`).
    Function {
        name: String,
        args: Vec<Expr>,
    },
    /// Conjunction (AND) of multiple predicates, stored flat.
    And(Vec<Expr>),
    /// Disjunction (OR) of multiple predicates.
    Or(Vec<Expr>),
}

impl Expr {
    /// Shorthand for an unqualified column expression.
    pub fn column(name: impl Into<String>, index: u32) -> Self {
        Expr::Column(ColumnRef::new(name, index))
    }

    /// Build `left = right`.
    pub fn equals(left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Return all column references in this expression.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut cols = Vec::new();
        self.collect_columns(&mut cols);
        cols
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Expr::Column(c) => out.push(c),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_columns(out),
            Expr::Function { args, .. } => {
                for a in args {
                    a.collect_columns(out);
                }
            }
            Expr::And(exprs) | Expr::Or(exprs) => {
                for e in exprs {
                    e.collect_columns(out);
                }
            }
        }
    }

    /// Flatten AND-chains: (A AND (B AND C)) → [A, B, C].
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(exprs) => exprs.iter().flat_map(|e| e.conjuncts()).collect(),
            other => vec![other],
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{c}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::BinaryOp { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::UnaryOp { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {operand}"),
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::IsNull => write!(f, "{operand} IS NULL"),
                UnaryOp::IsNotNull => write!(f, "{operand} IS NOT NULL"),
            },
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args, ", ")?;
                write!(f, ")")
            }
            Expr::And(exprs) => write_list(f, exprs, " AND "),
            Expr::Or(exprs) => write_list(f, exprs, " OR "),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Binary operators for comparison and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        f.write_str(s)
    }
}

/// Unary operators for boolean logic and null checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

/// SQL join types.
///
/// Only Inner and Cross joins are commutative; the other types have fixed
/// left/right semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
    Cross,
}

/// Sort key: one (expression, direction, null placement) entry of an ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: Expr,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl SortKey {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: true,
            nulls_first: true,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: false,
            nulls_first: false,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} NULLS {}",
            self.expr,
            if self.ascending { "ASC" } else { "DESC" },
            if self.nulls_first { "FIRST" } else { "LAST" }
        )
    }
}

/// Build side for hash joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildSide {
    Left,
    Right,
}

/// Identifier of a common table expression within one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CteId(pub u32);

impl fmt::Display for CteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column map carried by CTE consumers: each output column of the consumer and the
/// expression over the producer's output that defines it.
///
/// Rules carry the map through rewrites without interpreting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMap {
    entries: Vec<(ColumnRef, Expr)>,
}

impl ColumnMap {
    pub fn new(entries: Vec<(ColumnRef, Expr)>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ColumnRef, Expr)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the defining expression of an output column by name.
    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.entries
            .iter()
            .find(|(c, _)| c.name == name)
            .map(|(_, e)| e)
    }
}

impl fmt::Display for ColumnMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (col, expr)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{col} -> {expr}")?;
        }
        f.write_str("}")
    }
}

/// Logical operators -- represent *what* to compute, not *how*.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Table scan with optional column pruning and pushed-down predicate. Leaf.
    Scan {
        table: TableRef,
        columns: Vec<ColumnRef>,
        predicate: Option<Expr>,
    },
    /// Filter over a single child.
    Filter { predicate: Expr },
    /// Projection over a single child.
    Project {
        exprs: Vec<Expr>,
        aliases: Vec<String>,
    },
    /// Join of two children.
    Join { join_type: JoinType, condition: Expr },
    /// Sort of a single child.
    Sort { order: Vec<SortKey> },
    /// At most `count` rows starting from `offset`.
    Limit { offset: u64, count: u64 },
    /// Scope of a CTE. Child 0 is the producer, child 1 the query that consumes it.
    CteAnchor { cte_id: CteId },
    /// Computes the rows of a CTE from its single child.
    CteProduce { cte_id: CteId },
    /// Reads a CTE. Before implementation its single child is the inlined copy of
    /// the producer's subtree.
    CteConsume { cte_id: CteId, column_map: ColumnMap },
}

/// Physical operators -- represent *how* to execute a computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOp {
    /// Sequential (full) table scan.
    SeqScan {
        table: TableRef,
        columns: Vec<ColumnRef>,
        predicate: Option<Expr>,
    },
    Filter { predicate: Expr },
    Project {
        exprs: Vec<Expr>,
        aliases: Vec<String>,
    },
    /// Hash join: builds a hash table on `build_side`, probes with the other child.
    HashJoin {
        join_type: JoinType,
        build_side: BuildSide,
        condition: Expr,
    },
    /// Nested loop join. Works for any join condition.
    NestedLoopJoin { join_type: JoinType, condition: Expr },
    /// Sort operator. Also the enforcer for ordering requirements.
    SortOp { order: Vec<SortKey> },
    Limit { offset: u64, count: u64 },
    /// Redistributes data across workers. The enforcer for distribution requirements.
    Exchange { distribution: DistributionSpec },
    /// Materialized CTE scope: producer on child 0, consumer side on child 1.
    CteAnchor { cte_id: CteId },
    /// Materializes the CTE rows once for all consumers.
    CteProduce { cte_id: CteId },
    /// Reads the shared materialization. Leaf.
    CteConsume { cte_id: CteId, column_map: ColumnMap },
    /// No materialization boundary: the child subtree is the inlined CTE body.
    NoCte { cte_id: CteId, column_map: ColumnMap },
}

/// Unified operator enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Logical(LogicalOp),
    Physical(PhysicalOp),
}

impl Operator {
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::Logical(_))
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, Operator::Physical(_))
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Logical(l) => OpKind::Logical(l.kind()),
            Operator::Physical(p) => OpKind::Physical(p.kind()),
        }
    }
}

/// Kind discriminant for pattern matching (without data).
///
/// `OpKind` strips away all the fields of an operator and retains only its
/// discriminant, so the pattern matcher can test a node's shape without ever
/// looking at its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Logical(LogicalOpKind),
    Physical(PhysicalOpKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOpKind {
    Scan,
    Filter,
    Project,
    Join,
    Sort,
    Limit,
    CteAnchor,
    CteProduce,
    CteConsume,
}

impl LogicalOp {
    pub fn kind(&self) -> LogicalOpKind {
        match self {
            LogicalOp::Scan { .. } => LogicalOpKind::Scan,
            LogicalOp::Filter { .. } => LogicalOpKind::Filter,
            LogicalOp::Project { .. } => LogicalOpKind::Project,
            LogicalOp::Join { .. } => LogicalOpKind::Join,
            LogicalOp::Sort { .. } => LogicalOpKind::Sort,
            LogicalOp::Limit { .. } => LogicalOpKind::Limit,
            LogicalOp::CteAnchor { .. } => LogicalOpKind::CteAnchor,
            LogicalOp::CteProduce { .. } => LogicalOpKind::CteProduce,
            LogicalOp::CteConsume { .. } => LogicalOpKind::CteConsume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOpKind {
    SeqScan,
    Filter,
    Project,
    HashJoin,
    NestedLoopJoin,
    SortOp,
    Limit,
    Exchange,
    CteAnchor,
    CteProduce,
    CteConsume,
    NoCte,
}

impl PhysicalOp {
    pub fn kind(&self) -> PhysicalOpKind {
        match self {
            PhysicalOp::SeqScan { .. } => PhysicalOpKind::SeqScan,
            PhysicalOp::Filter { .. } => PhysicalOpKind::Filter,
            PhysicalOp::Project { .. } => PhysicalOpKind::Project,
            PhysicalOp::HashJoin { .. } => PhysicalOpKind::HashJoin,
            PhysicalOp::NestedLoopJoin { .. } => PhysicalOpKind::NestedLoopJoin,
            PhysicalOp::SortOp { .. } => PhysicalOpKind::SortOp,
            PhysicalOp::Limit { .. } => PhysicalOpKind::Limit,
            PhysicalOp::Exchange { .. } => PhysicalOpKind::Exchange,
            PhysicalOp::CteAnchor { .. } => PhysicalOpKind::CteAnchor,
            PhysicalOp::CteProduce { .. } => PhysicalOpKind::CteProduce,
            PhysicalOp::CteConsume { .. } => PhysicalOpKind::CteConsume,
            PhysicalOp::NoCte { .. } => PhysicalOpKind::NoCte,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Logical(op) => match op {
                LogicalOp::Scan { table, .. } => write!(f, "LogicalScan({table})"),
                LogicalOp::Filter { predicate } => write!(f, "LogicalFilter({predicate})"),
                LogicalOp::Project { aliases, .. } => {
                    write!(f, "LogicalProject([{}])", aliases.join(", "))
                }
                LogicalOp::Join {
                    join_type,
                    condition,
                } => write!(f, "LogicalJoin({join_type:?}, {condition})"),
                LogicalOp::Sort { order } => {
                    write!(f, "LogicalSort(")?;
                    write_list(f, order, ", ")?;
                    write!(f, ")")
                }
                LogicalOp::Limit { offset, count } => {
                    write!(f, "LogicalLimit(offset={offset}, count={count})")
                }
                LogicalOp::CteAnchor { cte_id } => write!(f, "LogicalCteAnchor(cte_id={cte_id})"),
                LogicalOp::CteProduce { cte_id } => {
                    write!(f, "LogicalCteProduce(cte_id={cte_id})")
                }
                LogicalOp::CteConsume { cte_id, column_map } => {
                    write!(f, "LogicalCteConsume(cte_id={cte_id}, {column_map})")
                }
            },
            Operator::Physical(op) => match op {
                PhysicalOp::SeqScan { table, .. } => write!(f, "SeqScan({table})"),
                PhysicalOp::Filter { predicate } => write!(f, "Filter({predicate})"),
                PhysicalOp::Project { aliases, .. } => {
                    write!(f, "Project([{}])", aliases.join(", "))
                }
                PhysicalOp::HashJoin {
                    join_type,
                    build_side,
                    condition,
                } => write!(f, "HashJoin({join_type:?}, build={build_side:?}, {condition})"),
                PhysicalOp::NestedLoopJoin {
                    join_type,
                    condition,
                } => write!(f, "NestedLoopJoin({join_type:?}, {condition})"),
                PhysicalOp::SortOp { order } => {
                    write!(f, "Sort(")?;
                    write_list(f, order, ", ")?;
                    write!(f, ")")
                }
                PhysicalOp::Limit { offset, count } => {
                    write!(f, "Limit(offset={offset}, count={count})")
                }
                PhysicalOp::Exchange { distribution } => write!(f, "Exchange({distribution})"),
                PhysicalOp::CteAnchor { cte_id } => write!(f, "CteAnchor(cte_id={cte_id})"),
                PhysicalOp::CteProduce { cte_id } => write!(f, "CteProduce(cte_id={cte_id})"),
                PhysicalOp::CteConsume { cte_id, column_map } => {
                    write!(f, "CteConsume(cte_id={cte_id}, {column_map})")
                }
                PhysicalOp::NoCte { cte_id, column_map } => {
                    write!(f, "NoCte(cte_id={cte_id}, {column_map})")
                }
            },
        }
    }
}

/// An immutable expression tree node: an operator plus its ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptExpr {
    op: Operator,
    children: Vec<Arc<OptExpr>>,
}

impl OptExpr {
    pub fn new(op: Operator, children: Vec<Arc<OptExpr>>) -> Self {
        Self { op, children }
    }

    /// A node without children.
    pub fn leaf(op: Operator) -> Self {
        Self::new(op, vec![])
    }

    pub fn logical(op: LogicalOp, children: Vec<Arc<OptExpr>>) -> Self {
        Self::new(Operator::Logical(op), children)
    }

    pub fn physical(op: PhysicalOp, children: Vec<Arc<OptExpr>>) -> Self {
        Self::new(Operator::Physical(op), children)
    }

    pub fn op(&self) -> &Operator {
        &self.op
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    pub fn children(&self) -> &[Arc<OptExpr>] {
        &self.children
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    /// Render the tree, one operator per line, children indented below their parent.
    pub fn explain(&self) -> String {
        self.to_string()
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.op, indent = depth * 2)?;
        for child in &self.children {
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for OptExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
