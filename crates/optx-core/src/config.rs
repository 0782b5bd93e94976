//! # Optimizer Configuration
//!
//! Per-query knobs that decide which rules are active. A configuration is usually
//! built in code (`OptimizerConfig::default()` enables every built-in rule), or
//! loaded from a JSON session document:
//!
//! ```json
//! { "disabled_rules": ["IMP_CTE_CONSUME_INLINE"], "source_type": "hive" }
//! ```
//!
//! Rule names are the stable [`RuleType`] names and are matched case-insensitively.

use crate::error::{ConfigError, ConfigResult};
use crate::rule::RuleType;
use serde::{Deserialize, Serialize};

/// Rule selection for one optimization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOptimizerConfig")]
pub struct OptimizerConfig {
    /// Rules that must not fire even though they are registered.
    pub disabled_rules: Vec<RuleType>,
    /// Optional connector/source type used to select connector-specific rules.
    pub source_type: Option<String>,
}

impl OptimizerConfig {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let raw: RawOptimizerConfig = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    pub fn is_disabled(&self, rule_type: RuleType) -> bool {
        self.disabled_rules.contains(&rule_type)
    }

    /// Builder-style helper to switch one rule off.
    pub fn disable(mut self, rule_type: RuleType) -> Self {
        if !self.is_disabled(rule_type) {
            self.disabled_rules.push(rule_type);
        }
        self
    }
}

#[derive(Deserialize)]
struct RawOptimizerConfig {
    #[serde(default)]
    disabled_rules: Vec<String>,
    #[serde(default)]
    source_type: Option<String>,
}

impl TryFrom<RawOptimizerConfig> for OptimizerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawOptimizerConfig) -> ConfigResult<Self> {
        let disabled_rules = raw
            .disabled_rules
            .iter()
            .map(|name| RuleType::from_name(name).ok_or_else(|| ConfigError::UnknownRule(name.clone())))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self {
            disabled_rules,
            source_type: raw.source_type,
        })
    }
}
