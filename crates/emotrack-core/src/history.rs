//! Throttled, time-bounded history of primary-face observations.

use crate::clock::span_ms;
use crate::types::Emotion;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One retained sample of the session timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp_ms: i64,
    pub emotion: Option<Emotion>,
    pub confidence: f32,
    pub face_count: usize,
}

/// Time-ordered deque with two invariants: consecutive entries are at least
/// `resolution_ms` apart, and no entry is older than `retention_ms` relative
/// to the newest one. Both parameters may change between inserts, so each
/// insert checks only the gap it created plus retention.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    /// Append `entry` unless it falls within `resolution_ms` of the newest
    /// entry, then evict everything older than `retention_ms` before it.
    /// Returns whether the entry was kept.
    pub fn record(&mut self, entry: HistoryEntry, resolution_ms: u64, retention_ms: u64) -> bool {
        if let Some(last) = self.entries.back() {
            if entry.timestamp_ms.saturating_sub(last.timestamp_ms) < span_ms(resolution_ms) {
                return false;
            }
        }
        self.entries.push_back(entry);

        let cutoff = entry.timestamp_ms.saturating_sub(span_ms(retention_ms));
        let mut evicted = 0usize;
        while self.entries.front().is_some_and(|e| e.timestamp_ms < cutoff) {
            self.entries.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            tracing::trace!(evicted, retained = self.entries.len(), "history evicted");
        }

        debug_assert!(self.newest_spaced(resolution_ms) && self.retained(retention_ms));
        true
    }

    /// Entries with `timestamp_ms >= cutoff_ms`, oldest first.
    pub fn since(&self, cutoff_ms: i64) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.iter().filter(move |e| e.timestamp_ms >= cutoff_ms)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Spacing and retention hold across the whole deque for fixed
    /// parameters. Entries recorded under a smaller resolution may fail the
    /// spacing check after the resolution is raised.
    pub fn check_invariants(&self, resolution_ms: u64, retention_ms: u64) -> bool {
        let min_gap = span_ms(resolution_ms);
        let spaced = self
            .entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(a, b)| b.timestamp_ms.saturating_sub(a.timestamp_ms) >= min_gap);
        spaced && self.retained(retention_ms)
    }

    fn newest_spaced(&self, resolution_ms: u64) -> bool {
        let n = self.entries.len();
        n < 2
            || self.entries[n - 1]
                .timestamp_ms
                .saturating_sub(self.entries[n - 2].timestamp_ms)
                >= span_ms(resolution_ms)
    }

    fn retained(&self, retention_ms: u64) -> bool {
        let Some(newest) = self.entries.back() else {
            return true;
        };
        let cutoff = newest.timestamp_ms.saturating_sub(span_ms(retention_ms));
        self.entries.iter().all(|e| e.timestamp_ms >= cutoff)
    }
}
