//! Recent request history, most recent first.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::VecDeque;

use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::models::{ExecutionResult, HistoryEntry, RequestDescriptor};

/// Capped history; the oldest entry is evicted once `limit` is exceeded
#[derive(Clone, Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
    last_stamp: Option<DateTime<Utc>>,
}

impl History {
    pub fn new(limit: usize) -> Self {
        History {
            entries: VecDeque::with_capacity(limit),
            limit: limit.max(1),
            last_stamp: None,
        }
    }

    /// Record a completed request, stamped with the current time
    pub fn record(&mut self, request: RequestDescriptor, response: ExecutionResult) -> &HistoryEntry {
        self.record_at(Utc::now(), request, response)
    }

    /// Timestamps are the history keys, so a clock that has not advanced
    /// since the previous entry is nudged forward by a millisecond.
    pub fn record_at(
        &mut self,
        now: DateTime<Utc>,
        request: RequestDescriptor,
        response: ExecutionResult,
    ) -> &HistoryEntry {
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);

        while self.entries.len() >= self.limit {
            self.entries.pop_back();
        }
        self.entries.push_front(HistoryEntry {
            timestamp: stamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            request,
            response,
        });
        &self.entries[0]
    }

    /// Get history item by index (0 = most recent)
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn find(&self, timestamp: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.timestamp == timestamp)
    }

    /// Most recent first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
