//! Bounded, timestamped log of input events shown in the window

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveTime};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt::{self, Write};
use std::sync::Arc;

/// Default number of retained entries
pub const DEFAULT_CAPACITY: usize = 30;

/// Default timestamp format (`15:04:05.000`)
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// A single formatted event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveTime,
    pub message: String,
}

/// Whether chrono can render `format` without error
pub fn is_valid_timestamp_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

impl LogEntry {
    /// Renders the entry as `[<timestamp>] <message>`. A format chrono
    /// cannot render falls back to [`DEFAULT_TIMESTAMP_FORMAT`].
    pub fn format_with(&self, timestamp_format: &str) -> String {
        let mut stamp = String::new();
        if write!(stamp, "{}", self.timestamp.format(timestamp_format)).is_err() {
            stamp.clear();
            let _ = write!(stamp, "{}", self.timestamp.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        format!("[{}] {}", stamp, self.message)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format(DEFAULT_TIMESTAMP_FORMAT), self.message)
    }
}

/// FIFO ring of the most recent events
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    timestamp_format: String,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self::with_format(capacity, DEFAULT_TIMESTAMP_FORMAT)
    }

    pub fn with_format(capacity: usize, timestamp_format: &str) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            timestamp_format: timestamp_format.to_string(),
        }
    }

    /// Appends a message stamped with the local wall-clock time
    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(Local::now().time(), message);
    }

    /// Appends a message with an explicit timestamp, evicting the oldest
    /// entry once the log is full
    pub fn push_at(&mut self, timestamp: NaiveTime, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp,
            message: message.into(),
        });
    }

    /// Copies the current entries, oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Formatted lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.format_with(&self.timestamp_format))
            .collect()
    }

    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Event log shared between threads.
///
/// The client itself is single-threaded and renders from [`EventLog`]
/// directly. This is the variant for embedders that append from other
/// threads: the lock is held only for the append or the snapshot copy,
/// never while talking to the compositor.
#[derive(Debug, Clone, Default)]
pub struct SharedEventLog {
    inner: Arc<Mutex<EventLog>>,
}

impl SharedEventLog {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(log)),
        }
    }

    pub fn push(&self, message: impl Into<String>) {
        self.inner.lock().push(message);
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.inner.lock().snapshot()
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines()
    }

    /// Takes every entry out of the log, leaving it empty
    pub fn drain(&self) -> Vec<LogEntry> {
        let mut log = self.inner.lock();
        let entries = log.snapshot();
        log.clear();
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
