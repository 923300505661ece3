//! Debug snapshots of a running state machine.
//!
//! A [`MachineDump`] captures the machine's name, its current state and the
//! recent log records, with every message identifier resolved through the
//! `what_to_string` hook. Dumps are plain serde values and can be written as
//! JSON for humans or as bincode for compact storage.

use crate::core::{LogRec, StateKey};
use crate::engine::{Machine, MachineHooks};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

pub mod error;

pub use error::DumpError;

/// Readable name of one message identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhatKey {
    pub what: i32,
    pub what_string: Option<String>,
}

/// Snapshot of a state machine for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineDump {
    /// Identifier of the dumped machine instance
    pub id: Uuid,

    /// When the dump was taken
    pub timestamp: DateTime<Utc>,

    /// Name of the machine
    pub name: String,

    /// Records ever added, including evicted ones
    pub total_records: usize,

    /// Leaf of the active stack, absent before start and after quitting
    pub current_state: Option<String>,

    /// Retained records, oldest first
    pub log_records: Vec<LogRec>,

    /// Every distinct identifier in `log_records`, ascending
    pub what_keys: Vec<WhatKey>,
}

impl MachineDump {
    /// Snapshot `machine`.
    pub fn capture<K: StateKey, E: MachineHooks>(machine: &Machine<K, E>) -> Self {
        let records = machine.log_records();
        let log_records: Vec<LogRec> = records.iter().cloned().collect();
        let whats: BTreeSet<i32> = log_records.iter().map(|r| r.what).collect();
        let what_keys = whats
            .into_iter()
            .map(|what| WhatKey {
                what,
                what_string: machine.env().what_to_string(what),
            })
            .collect();

        Self {
            id: machine.id(),
            timestamp: Utc::now(),
            name: machine.name().to_string(),
            total_records: records.total(),
            current_state: machine.current_state().map(|t| t.name().to_string()),
            log_records,
            what_keys,
        }
    }

    pub fn to_json(&self) -> Result<String, DumpError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DumpError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, DumpError> {
        serde_json::from_str(json).map_err(|e| DumpError::DeserializationFailed(e.to_string()))
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, DumpError> {
        bincode::serialize(self).map_err(|e| DumpError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, DumpError> {
        bincode::deserialize(bytes).map_err(|e| DumpError::DeserializationFailed(e.to_string()))
    }

    fn what_string(&self, what: i32) -> Option<&str> {
        self.what_keys
            .iter()
            .find(|k| k.what == what)
            .and_then(|k| k.what_string.as_deref())
    }
}

impl fmt::Display for MachineDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        writeln!(
            f,
            " total records={} retained={}",
            self.total_records,
            self.log_records.len()
        )?;
        for (i, rec) in self.log_records.iter().enumerate() {
            write!(f, " rec[{i}]: {rec}")?;
            if let Some(what) = self.what_string(rec.what) {
                write!(f, " ({what})")?;
            }
            writeln!(f)?;
        }
        writeln!(
            f,
            "curState={}",
            self.current_state.as_deref().unwrap_or("<QUIT>")
        )
    }
}

impl<K: StateKey, E: MachineHooks> Machine<K, E> {
    /// Snapshot this machine for diagnostics.
    pub fn dump(&self) -> MachineDump {
        MachineDump::capture(self)
    }
}
