//! Bounded history of processed messages.
//!
//! Every dispatched message may leave a [`LogRec`] behind. Records are kept
//! in a ring of fixed capacity; the total number ever recorded is tracked
//! separately so dumps can show how much history was dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Default number of records kept by a machine.
pub const DEFAULT_LOG_REC_SIZE: usize = 20;

/// Record of one processed message.
///
/// # Example
///
/// ```rust
/// use hsmind::core::LogRec;
/// use chrono::Utc;
///
/// let rec = LogRec {
///     time: Utc::now(),
///     what: 3,
///     info: String::new(),
///     state: Some("Connected".to_string()),
///     org_state: Some("Connected".to_string()),
///     dest_state: Some("Idle".to_string()),
/// };
/// assert!(rec.is_transition());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRec {
    /// When the message was processed
    pub time: DateTime<Utc>,
    /// The message identifier
    pub what: i32,
    /// Free-form text from the `log_rec_string` hook
    pub info: String,
    /// State that handled the message, if any did
    pub state: Option<String>,
    /// Leaf state when the message arrived
    pub org_state: Option<String>,
    /// Requested destination, if the message caused a transition
    pub dest_state: Option<String>,
}

impl LogRec {
    pub fn is_transition(&self) -> bool {
        self.dest_state.is_some()
    }
}

impl fmt::Display for LogRec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |s: &Option<String>| s.clone().unwrap_or_else(|| "<null>".to_string());
        write!(
            f,
            "time={} processed={} org={} dest={} what={}",
            self.time.format("%m-%d %H:%M:%S%.3f"),
            name(&self.state),
            name(&self.org_state),
            name(&self.dest_state),
            self.what
        )?;
        if !self.info.is_empty() {
            write!(f, " {}", self.info)?;
        }
        Ok(())
    }
}

/// Ring of the most recent [`LogRec`]s.
///
/// # Example
///
/// ```rust
/// use hsmind::core::{LogRec, LogRecords};
/// use chrono::Utc;
///
/// let mut records = LogRecords::with_capacity(2);
/// for what in 0..3 {
///     records.add(LogRec {
///         time: Utc::now(),
///         what,
///         info: String::new(),
///         state: None,
///         org_state: None,
///         dest_state: None,
///     });
/// }
///
/// assert_eq!(records.len(), 2);
/// assert_eq!(records.total(), 3);
/// assert_eq!(records.get(0).map(|r| r.what), Some(1));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogRecords {
    records: VecDeque<LogRec>,
    capacity: usize,
    total: usize,
    only_transitions: bool,
}

impl Default for LogRecords {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_REC_SIZE)
    }
}

impl LogRecords {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
            only_transitions: false,
        }
    }

    /// Change the capacity and forget all records.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.total = 0;
        self.records.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_only_transitions(&mut self, enable: bool) {
        self.only_transitions = enable;
    }

    pub fn only_transitions(&self) -> bool {
        self.only_transitions
    }

    /// Append a record, evicting the oldest one once the ring is full.
    pub fn add(&mut self, rec: LogRec) {
        self.total += 1;
        if self.capacity == 0 {
            return;
        }
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(rec);
    }

    /// Record at `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&LogRec> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogRec> {
        self.records.iter()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records ever added, including evicted ones.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.total = 0;
    }
}
