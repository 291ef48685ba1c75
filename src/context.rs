/*!
 * Rolling translation context for a title.
 *
 * Keeps a bounded history of (original, translated) segment pairs and
 * serves a recency window for prompt construction, so consecutive pages
 * get consistent terminology and tone.
 */

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of segment pairs kept in history.
pub const DEFAULT_CONTEXT_CAPACITY: usize = 50;

/// One translated segment: source text plus its translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Source-language text
    pub original: String,

    /// Target-language text
    pub translated: String,
}

/// Bounded FIFO history of translated segments for one title or session.
///
/// Oldest entries are evicted first once capacity is reached. The session
/// file that persists history between runs is owned by an external
/// collaborator; this type only (de)structures the in-memory list.
#[derive(Debug)]
pub struct ContextManager {
    capacity: usize,
    history: VecDeque<ContextEntry>,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_CAPACITY)
    }
}

impl ContextManager {
    /// Create a manager holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            history: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Append a segment pair, evicting the oldest entry when full.
    pub fn add_segment(&mut self, original: &str, translated: &str) {
        self.history.push_back(ContextEntry {
            original: original.to_string(),
            translated: translated.to_string(),
        });
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Up to the last `limit` entries, oldest-first, as an owned snapshot.
    pub fn get_recent_context(&self, limit: usize) -> Vec<ContextEntry> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Wipe the history, e.g. when starting a new title.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True when no history has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Full history as a plain list, in insertion order, for persistence.
    pub fn entries(&self) -> Vec<ContextEntry> {
        self.history.iter().cloned().collect()
    }

    /// Replace the history with entries restored from persistence,
    /// truncated to capacity.
    pub fn load_entries(&mut self, entries: Vec<ContextEntry>) {
        self.history = entries.into_iter().take(self.capacity).collect();
    }
}
