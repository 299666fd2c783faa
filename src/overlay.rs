use std::collections::HashMap;

use tracing::debug;

use crate::feed::ContentKey;

/// Replaceable translated-text lookup layered on top of the original content.
///
/// Each successful refresh cycle replaces the whole mapping; entries are
/// never merged key-by-key, so text from a cycle that predates a leaf can
/// never survive past the cycle that first saw it. The committed-generation
/// watermark arbitrates overlapping cycles: a commit carrying a generation at
/// or below the watermark is a stale straggler and is dropped.
#[derive(Debug, Default)]
pub struct TranslationOverlay {
    entries: HashMap<ContentKey, String>,
    committed_generation: u64,
}

impl TranslationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the overlay contents with the results of the cycle identified
    /// by `generation`. Returns true if the commit was accepted, false if a
    /// cycle with a higher generation already committed (no-op).
    pub fn commit(&mut self, generation: u64, entries: HashMap<ContentKey, String>) -> bool {
        if generation <= self.committed_generation {
            debug!(
                generation,
                committed = self.committed_generation,
                "discarding stale overlay commit"
            );
            return false;
        }
        self.entries = entries;
        self.committed_generation = generation;
        true
    }

    pub fn lookup(&self, key: &ContentKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Generation of the most recently accepted commit, 0 before any commit.
    pub fn committed_generation(&self) -> u64 {
        self.committed_generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
