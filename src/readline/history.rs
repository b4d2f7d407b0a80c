//! Line history, newest first.

use crate::config::ReadlineConfig;

/// Accepted lines, ordered newest first: index 0 is the most recent entry,
/// so browsing *older* entries means increasing indexes. A browse index of
/// -1 by convention means "not browsing", which is why it lives with the
/// prompt state rather than here.
pub struct History {
    entries: Vec<Vec<char>>,
    limit: usize,
    ignore_duplicates: bool,
}

impl History {
    pub fn new(config: &ReadlineConfig) -> Self {
        Self {
            entries: Vec::new(),
            limit: config.history_limit,
            ignore_duplicates: config.ignore_duplicates,
        }
    }

    /// Record an accepted line. Blank lines are never recorded; an exact
    /// repeat of the most recent entry is skipped when duplicate filtering
    /// is on. The oldest entry falls off once the limit is reached.
    pub fn add(&mut self, line: &[char]) {
        if self.limit == 0 || line.iter().all(|c| c.is_whitespace()) {
            return;
        }
        if self.ignore_duplicates && self.entries.first().is_some_and(|last| last == line) {
            return;
        }
        self.entries.insert(0, line.to_vec());
        self.entries.truncate(self.limit);
    }

    pub fn get(&self, index: usize) -> Option<&[char]> {
        self.entries.get(index).map(|entry| entry.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
