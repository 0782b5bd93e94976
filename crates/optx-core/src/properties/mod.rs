//! # Physical Properties
//!
//! Properties describe characteristics of a plan subtree's output that a parent may
//! require. They are central to the Cascades framework's handling of "interesting
//! orders" and data distributions.
//!
//! A [`PhysicalPropertySet`] bundles three parts:
//! - **Sort** ([`SortProperty`]): the output is ordered by a sequence of keys.
//!   Required by operators like merge join or by an `ORDER BY`.
//! - **Distribution** ([`DistributionProperty`]): how rows are spread across workers
//!   (hash-partitioned, broadcast, gathered, ...).
//! - **CTE** ([`CteProperty`]): which common table expressions the subtree produces
//!   or forces to be materialized.
//!
//! ## Property Enforcement
//!
//! When a child's delivered set does not satisfy the parent's required set, the
//! enforcement pass inserts an **enforcer** (a Sort or an Exchange). That pass is
//! not part of this crate; it calls [`PhysicalPropertySet::is_satisfy`].
//!
//! ## CTE Asymmetry
//!
//! Equality and hashing cover all three parts, but `is_satisfy` only compares sort
//! and distribution. Whether a CTE is materialized is decided by an earlier planning
//! pass and routed through [`OptimizerContext`](crate::context::OptimizerContext),
//! not through the enforcer path, so no enforcer could ever fix a CTE mismatch.
//! Two sets that differ only in their CTE part therefore satisfy each other while
//! still being distinct memo keys.
//!
//! ## Sharing
//!
//! Each part holds its spec behind an `Arc` and is never mutated in place; setters
//! replace a whole part. Copying a set is three reference-count increments.

mod cte;
mod distribution;
mod sort;

pub use cte::CteProperty;
pub use distribution::{DistributionProperty, DistributionSpec, HashFunction, HashPartitioning};
pub use sort::{OrderSpec, SortProperty};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// The property set with no requirements at all.
pub static EMPTY: LazyLock<PhysicalPropertySet> = LazyLock::new(|| PhysicalPropertySet {
    sort: SortProperty::empty(),
    distribution: DistributionProperty::empty(),
    cte: CteProperty::empty(),
});

/// Required or delivered physical properties of a plan subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalPropertySet {
    sort: SortProperty,
    distribution: DistributionProperty,
    cte: CteProperty,
}

impl PhysicalPropertySet {
    pub fn new(sort: SortProperty, distribution: DistributionProperty, cte: CteProperty) -> Self {
        Self {
            sort,
            distribution,
            cte,
        }
    }

    /// No requirements. Equal to [`EMPTY`].
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    pub fn with_sort(sort: SortProperty) -> Self {
        Self::new(sort, DistributionProperty::empty(), CteProperty::empty())
    }

    pub fn with_distribution(distribution: DistributionProperty) -> Self {
        Self::new(SortProperty::empty(), distribution, CteProperty::empty())
    }

    pub fn with_sort_and_distribution(sort: SortProperty, distribution: DistributionProperty) -> Self {
        Self::new(sort, distribution, CteProperty::empty())
    }

    pub fn sort_property(&self) -> &SortProperty {
        &self.sort
    }

    pub fn distribution_property(&self) -> &DistributionProperty {
        &self.distribution
    }

    pub fn cte_property(&self) -> &CteProperty {
        &self.cte
    }

    pub fn set_sort_property(&mut self, sort: SortProperty) {
        self.sort = sort;
    }

    pub fn set_distribution_property(&mut self, distribution: DistributionProperty) {
        self.distribution = distribution;
    }

    pub fn set_cte_property(&mut self, cte: CteProperty) {
        self.cte = cte;
    }

    pub fn with_sort_property(mut self, sort: SortProperty) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_distribution_property(mut self, distribution: DistributionProperty) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_cte_property(mut self, cte: CteProperty) -> Self {
        self.cte = cte;
        self
    }

    /// True when none of the three parts carries a requirement.
    pub fn is_empty(&self) -> bool {
        self.sort.is_empty() && self.distribution.is_any() && self.cte.is_empty()
    }

    /// Whether the properties delivered by `self` satisfy `required`.
    ///
    /// Only sort and distribution are compared. The CTE part is deliberately left out
    /// (see the module docs), even though it takes part in `Eq` and `Hash`.
    pub fn is_satisfy(&self, required: &PhysicalPropertySet) -> bool {
        self.sort.is_satisfy(&required.sort) && self.distribution.is_satisfy(&required.distribution)
    }

    /// A value-equal set sharing the three parts with `self`. Setter calls on either
    /// copy afterwards do not affect the other.
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

impl Default for PhysicalPropertySet {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for PhysicalPropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.sort.spec(), self.distribution.spec(), self.cte)
    }
}
