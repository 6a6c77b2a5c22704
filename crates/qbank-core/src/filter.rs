//! Dependent filter chain (exam → subject → topic).
//!
//! Setting level `k` clears every deeper level. A chain is *resolved* once its
//! first `required` levels are set; only resolved chains may be fetched. The
//! chain is a plain value: pools and selections react to its signature, not to
//! the chain itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use crate::error::{Error, Result};
use crate::types::Identifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterLevel {
    pub key: String,
    pub value: Option<Identifier>,
}

/// Deterministic cache key for a chain's values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    levels: Vec<FilterLevel>,
    required: usize,
}

impl FilterChain {
    /// Build an empty chain. `required` is clamped to the number of levels.
    pub fn new<I, S>(keys: I, required: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels: Vec<FilterLevel> = keys.into_iter().map(|k| FilterLevel { key: k.into(), value: None }).collect();
        let required = required.min(levels.len());
        Self { levels, required }
    }

    pub fn exam_subject_topic() -> Self { Self::new(["exam", "subject", "topic"], 3) }

    pub fn len(&self) -> usize { self.levels.len() }

    pub fn is_empty(&self) -> bool { self.levels.is_empty() }

    pub fn required(&self) -> usize { self.required }

    pub fn level(&self, k: usize) -> Option<&FilterLevel> { self.levels.get(k) }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.levels.iter().map(|l| l.key.as_str()) }

    /// Index of the key, if the chain has such a level.
    pub fn position(&self, key: &str) -> Option<usize> { self.levels.iter().position(|l| l.key == key) }

    /// Returns a new chain with `levels[k] = value` and all deeper levels cleared.
    pub fn set_level(&self, k: usize, value: Option<Identifier>) -> Result<Self> {
        if k >= self.levels.len() {
            return Err(Error::InvalidLevel { index: k, len: self.levels.len() });
        }
        if value.is_some() && self.levels[..k].iter().any(|l| l.value.is_none()) {
            return Err(Error::UnresolvedAncestor { index: k });
        }
        let mut next = self.clone();
        next.levels[k].value = value;
        for level in &mut next.levels[k + 1..] {
            level.value = None;
        }
        Ok(next)
    }

    /// Returns a copy of this chain's shape with the leading levels set from `values`.
    pub fn with_values(&self, values: &[Identifier]) -> Result<Self> {
        if values.len() > self.levels.len() {
            return Err(Error::InvalidLevel { index: values.len() - 1, len: self.levels.len() });
        }
        let mut next = self.cleared();
        for (k, v) in values.iter().enumerate() {
            next = next.set_level(k, Some(v.clone()))?;
        }
        Ok(next)
    }

    /// Same levels, no values.
    pub fn cleared(&self) -> Self {
        let mut next = self.clone();
        for level in &mut next.levels {
            level.value = None;
        }
        next
    }

    pub fn is_resolved(&self) -> bool { self.levels[..self.required].iter().all(|l| l.value.is_some()) }

    /// Index of the deepest level that holds a value.
    pub fn deepest_resolved(&self) -> Option<usize> { self.levels.iter().rposition(|l| l.value.is_some()) }

    /// Set values in level order; this is what a page source filters by.
    pub fn values(&self) -> Vec<Identifier> { self.levels.iter().map_while(|l| l.value.clone()).collect() }

    pub fn signature(&self) -> Signature {
        let mut hasher = XxHash64::with_seed(0);
        for level in &self.levels {
            level.key.hash(&mut hasher);
            level.value.hash(&mut hasher);
        }
        Signature(format!("{:016x}", hasher.finish()))
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .levels
            .iter()
            .map(|l| match &l.value {
                Some(v) => format!("{}={}", l.key, v),
                None => format!("{}=-", l.key),
            })
            .collect();
        f.write_str(&parts.join(" "))
    }
}
