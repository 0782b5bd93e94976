//! Ordering requirement / guarantee of a plan subtree.

use crate::error::{PropertyError, PropertyResult};
use crate::expr::SortKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

static EMPTY_ORDER: LazyLock<Arc<OrderSpec>> = LazyLock::new(|| Arc::new(OrderSpec::empty()));

/// An ordered sequence of sort keys. The empty sequence means "no ordering".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<SortKey>", into = "Vec<SortKey>")]
pub struct OrderSpec {
    keys: Vec<SortKey>,
}

impl OrderSpec {
    pub fn empty() -> Self {
        Self { keys: Vec::new() }
    }

    /// Build an ordering. The same expression may appear only once: a second key on
    /// an expression is either redundant or contradicts the first.
    pub fn new(keys: Vec<SortKey>) -> PropertyResult<Self> {
        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !seen.insert(&key.expr) {
                return Err(PropertyError::DuplicateSortKey(key.expr.clone()));
            }
        }
        Ok(Self { keys })
    }

    /// Build an ordering from a SQL `ORDER BY` list. A later key on an expression
    /// already ordered by an earlier key is redundant and dropped.
    pub fn deduplicated(keys: Vec<SortKey>) -> Self {
        let mut seen = HashSet::with_capacity(keys.len());
        let keys = keys
            .into_iter()
            .filter(|key| seen.insert(key.expr.clone()))
            .collect();
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl TryFrom<Vec<SortKey>> for OrderSpec {
    type Error = PropertyError;

    fn try_from(keys: Vec<SortKey>) -> PropertyResult<Self> {
        Self::new(keys)
    }
}

impl From<OrderSpec> for Vec<SortKey> {
    fn from(spec: OrderSpec) -> Self {
        spec.keys
    }
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}")?;
        }
        f.write_str("]")
    }
}

/// Sort property: wraps a shared [`OrderSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortProperty {
    spec: Arc<OrderSpec>,
}

impl SortProperty {
    pub fn new(spec: OrderSpec) -> Self {
        Self {
            spec: Arc::new(spec),
        }
    }

    /// The "no ordering" sentinel.
    pub fn empty() -> Self {
        Self {
            spec: Arc::clone(&EMPTY_ORDER),
        }
    }

    pub fn spec(&self) -> &OrderSpec {
        &self.spec
    }

    pub fn is_empty(&self) -> bool {
        self.spec.is_empty()
    }

    /// Whether the ordering delivered by `self` satisfies the `required` ordering.
    ///
    /// An empty requirement is always satisfied. Otherwise the required keys must be
    /// a prefix of the delivered keys: same expressions in the same positions, same
    /// direction, same null placement. Output sorted on `(a, b, c)` is also sorted on
    /// `(a, b)`, but not on `(b)` or on `(a DESC)`.
    pub fn is_satisfy(&self, required: &SortProperty) -> bool {
        let required = required.spec.keys();
        let delivered = self.spec.keys();
        required.len() <= delivered.len()
            && required.iter().zip(delivered.iter()).all(|(r, d)| r == d)
    }
}

impl Default for SortProperty {
    fn default() -> Self {
        Self::empty()
    }
}
