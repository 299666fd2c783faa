//! Dialect set and selection.
//!
//! The set of known dialects is fixed at startup (from config) and ordered.
//! `standard` is always a member and is the dialect every session starts in.
//! Selection of the next dialect is a pure function over a caller-supplied
//! random source, so tests can drive it with a seeded generator.

use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// The dialect every session starts in.
pub const STANDARD: &str = "standard";

/// Default dialect rotation used when the DIALECTS env var is not set.
pub const DEFAULT_DIALECTS: &[&str] = &["standard", "kansai", "tohoku", "hakata", "tsugaru"];

/// A validated, ordered, non-empty set of dialect names.
#[derive(Debug, Clone)]
pub struct DialectSet {
    names: Vec<String>,
}

impl DialectSet {
    /// Build a dialect set from a list of names. The list must be non-empty,
    /// free of duplicates, and contain `standard`.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            bail!("dialect set must not be empty");
        }
        if !names.iter().any(|n| n == STANDARD) {
            bail!("dialect set must contain '{}'", STANDARD);
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                bail!("duplicate dialect '{}' in dialect set", name);
            }
        }
        Ok(Self { names })
    }

    pub fn default_set() -> Self {
        Self {
            names: DEFAULT_DIALECTS.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Choose the dialect for the next refresh cycle.
///
/// Picks uniformly at random from the set minus `current`, so the visible
/// dialect changes on every committed cycle whenever at least two dialects
/// exist. If `current` is the only member, it is returned again; a repeat is
/// unavoidable there.
pub fn next_dialect(current: &str, available: &DialectSet, rng: &mut impl Rng) -> String {
    let others: Vec<&String> = available.names().iter().filter(|n| *n != current).collect();
    match others.choose(rng) {
        Some(next) => next.to_string(),
        None => current.to_string(),
    }
}
