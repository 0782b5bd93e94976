//! # Data Distribution
//!
//! Describes how the rows of a plan subtree are spread across the workers of a
//! distributed query. A parent states the distribution it *requires* (e.g. a hash
//! join needs both inputs hash-partitioned on the join keys); a child states the
//! distribution it *delivers*. When the delivered distribution does not satisfy the
//! requirement, the enforcement pass inserts an `Exchange`.
//!
//! ## Satisfaction Rules
//!
//! | required          | satisfied by delivered                                   |
//! |-------------------|----------------------------------------------------------|
//! | `Any`             | everything                                               |
//! | `Hash(R, f)`      | `Hash(D, f)` where every column of `D` is in `R`          |
//! | `Broadcast`       | `Broadcast`, `Replicated`                                |
//! | `Replicated`      | `Replicated`                                             |
//! | `Single`/`Gather` | `Single`, `Gather`                                       |
//!
//! Hash partitioning on a subset of the required keys is enough: two rows that agree
//! on all required keys also agree on the subset, so the same hash function sends
//! them to the same worker. Partitioning on a *different* function never satisfies,
//! because the two sides of a join would route equal keys to different workers.

use crate::error::{PropertyError, PropertyResult};
use crate::expr::ColumnRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

static ANY_DISTRIBUTION: LazyLock<Arc<DistributionSpec>> =
    LazyLock::new(|| Arc::new(DistributionSpec::Any));

/// Hash functions the execution engine can partition with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashFunction {
    Murmur3,
    XxHash64,
    Crc32,
}

impl HashFunction {
    pub fn name(&self) -> &'static str {
        match self {
            HashFunction::Murmur3 => "murmur3",
            HashFunction::XxHash64 => "xxhash64",
            HashFunction::Crc32 => "crc32",
        }
    }

    /// Resolve a hash function by its name (case-insensitive).
    pub fn from_name(name: &str) -> PropertyResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "murmur3" => Ok(HashFunction::Murmur3),
            "xxhash64" => Ok(HashFunction::XxHash64),
            "crc32" => Ok(HashFunction::Crc32),
            _ => Err(PropertyError::UnknownHashFunction(name.to_string())),
        }
    }
}

impl FromStr for HashFunction {
    type Err = PropertyError;

    fn from_str(s: &str) -> PropertyResult<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hash partitioning: ordered partitioning columns and the hash function.
///
/// Always non-empty and free of duplicate columns; the only way to obtain one is
/// through [`HashPartitioning::new`] (deserialization goes through it as well).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawHashPartitioning", into = "RawHashPartitioning")]
pub struct HashPartitioning {
    columns: Vec<ColumnRef>,
    hash_fn: HashFunction,
}

impl HashPartitioning {
    pub fn new(columns: Vec<ColumnRef>, hash_fn: HashFunction) -> PropertyResult<Self> {
        if columns.is_empty() {
            return Err(PropertyError::EmptyHashColumns);
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for c in &columns {
            if !seen.insert(c) {
                return Err(PropertyError::DuplicateHashColumn(c.clone()));
            }
        }
        Ok(Self { columns, hash_fn })
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn hash_fn(&self) -> HashFunction {
        self.hash_fn
    }

    /// Whether data partitioned by `self` is co-located on the `required` keys.
    fn satisfies(&self, required: &HashPartitioning) -> bool {
        self.hash_fn == required.hash_fn
            && self.columns.iter().all(|c| required.columns.contains(c))
    }
}

#[derive(Serialize, Deserialize)]
struct RawHashPartitioning {
    columns: Vec<ColumnRef>,
    hash_fn: String,
}

impl TryFrom<RawHashPartitioning> for HashPartitioning {
    type Error = PropertyError;

    fn try_from(raw: RawHashPartitioning) -> PropertyResult<Self> {
        HashPartitioning::new(raw.columns, HashFunction::from_name(&raw.hash_fn)?)
    }
}

impl From<HashPartitioning> for RawHashPartitioning {
    fn from(h: HashPartitioning) -> Self {
        RawHashPartitioning {
            columns: h.columns,
            hash_fn: h.hash_fn.name().to_string(),
        }
    }
}

/// Data distribution of a plan subtree's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionSpec {
    /// No requirement / no guarantee.
    #[default]
    Any,
    /// Hash-partitioned across workers.
    Hash(HashPartitioning),
    /// Every worker receives a full copy through an exchange.
    Broadcast,
    /// Every worker already holds a full copy (e.g. a replicated table).
    Replicated,
    /// All rows on a single node because the source is single-node.
    Single,
    /// All rows gathered onto one node by an exchange.
    Gather,
}

impl DistributionSpec {
    /// Build a hash distribution, rejecting an empty or duplicated column list.
    pub fn hash(columns: Vec<ColumnRef>, hash_fn: HashFunction) -> PropertyResult<Self> {
        Ok(DistributionSpec::Hash(HashPartitioning::new(columns, hash_fn)?))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, DistributionSpec::Any)
    }

    /// Whether the distribution delivered by `self` satisfies `required`.
    pub fn satisfies(&self, required: &DistributionSpec) -> bool {
        use DistributionSpec::*;
        match (self, required) {
            (_, Any) => true,
            (Hash(delivered), Hash(required)) => delivered.satisfies(required),
            (Broadcast | Replicated, Broadcast) => true,
            (Replicated, Replicated) => true,
            (Single | Gather, Single | Gather) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DistributionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionSpec::Any => f.write_str("ANY"),
            DistributionSpec::Hash(h) => {
                write!(f, "HASH[{}](", h.hash_fn)?;
                for (i, c) in h.columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str(")")
            }
            DistributionSpec::Broadcast => f.write_str("BROADCAST"),
            DistributionSpec::Replicated => f.write_str("REPLICATED"),
            DistributionSpec::Single => f.write_str("SINGLE"),
            DistributionSpec::Gather => f.write_str("GATHER"),
        }
    }
}

/// Distribution property: wraps a shared [`DistributionSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistributionProperty {
    spec: Arc<DistributionSpec>,
}

impl DistributionProperty {
    pub fn new(spec: DistributionSpec) -> Self {
        Self {
            spec: Arc::new(spec),
        }
    }

    /// The "any distribution" sentinel.
    pub fn empty() -> Self {
        Self {
            spec: Arc::clone(&ANY_DISTRIBUTION),
        }
    }

    pub fn spec(&self) -> &DistributionSpec {
        &self.spec
    }

    pub fn is_any(&self) -> bool {
        self.spec.is_any()
    }

    pub fn is_satisfy(&self, required: &DistributionProperty) -> bool {
        self.spec.satisfies(&required.spec)
    }
}

impl Default for DistributionProperty {
    fn default() -> Self {
        Self::empty()
    }
}
