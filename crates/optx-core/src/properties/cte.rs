//! CTE materialization state of a plan subtree.

use crate::expr::CteId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

static NO_CTES: LazyLock<Arc<BTreeSet<CteId>>> = LazyLock::new(|| Arc::new(BTreeSet::new()));

/// The set of CTEs a subtree produces or forces to be materialized.
///
/// Ids are kept ordered so that hashing and rendering do not depend on insertion
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CteProperty {
    ids: Arc<BTreeSet<CteId>>,
}

impl CteProperty {
    pub fn new(ids: impl IntoIterator<Item = CteId>) -> Self {
        Self {
            ids: Arc::new(ids.into_iter().collect()),
        }
    }

    pub fn empty() -> Self {
        Self {
            ids: Arc::clone(&NO_CTES),
        }
    }

    pub fn contains(&self, id: CteId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = CteId> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// CTEs of both subtrees, e.g. for an operator with two children.
    pub fn union(&self, other: &CteProperty) -> CteProperty {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        CteProperty::new(self.ids.union(&other.ids).copied())
    }
}

impl Default for CteProperty {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for CteProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CTE[")?;
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_independent() {
        let a = CteProperty::new([CteId(3), CteId(1)]);
        let b = CteProperty::new([CteId(1), CteId(3)]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "CTE[1, 3]");
    }

    #[test]
    fn test_union() {
        let a = CteProperty::new([CteId(1)]);
        let b = CteProperty::new([CteId(2), CteId(1)]);
        let u = a.union(&b);
        assert_eq!(u.ids().collect::<Vec<_>>(), vec![CteId(1), CteId(2)]);
        assert_eq!(a.union(&CteProperty::empty()), a);
        assert!(u.contains(CteId(2)));
        assert!(!u.contains(CteId(3)));
    }
}
