//! ActivityLog - メモリ上のアクティビティログ
//!
//! - 直近 `capacity` 行だけ保持（古いものから捨てる）
//! - 各行は tracing にも流す（level 対応: ERROR → error!, WARNING → warn!, 他 → info!）

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{LogEntry, LogLevel};
use crate::ports::EventSink;

pub const DEFAULT_LOG_CAPACITY: usize = 500;

#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
        }
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl EventSink for ActivityLog {
    fn emit(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Error => tracing::error!(target: "tubemaster::activity", "{}", entry.message),
            LogLevel::Warning => tracing::warn!(target: "tubemaster::activity", "{}", entry.message),
            LogLevel::Success | LogLevel::Info => {
                tracing::info!(target: "tubemaster::activity", level = %entry.level, "{}", entry.message)
            }
        }

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn keeps_only_the_latest_entries() {
        let log = ActivityLog::with_capacity(2);
        for msg in ["a", "b", "c"] {
            log.emit(LogEntry::new(Utc::now(), LogLevel::Info, msg));
        }
        assert_eq!(log.messages(), vec!["b", "c"]);
        assert!(log.contains("c"));
        assert!(!log.contains("a"));
    }
}
