//! Machine configuration.

use crate::core::DEFAULT_LOG_REC_SIZE;
use crate::enforcement::ViolationStrategy;
use serde::{Deserialize, Serialize};

/// Tunables of a state machine.
///
/// Every field has a default, so a partial JSON object is enough:
///
/// ```rust
/// use hsmind::engine::MachineConfig;
///
/// let config: MachineConfig = serde_json::from_str(r#"{ "debug": true, "log_rec_size": 50 }"#).unwrap();
/// assert!(config.debug);
/// assert_eq!(config.log_rec_size, 50);
/// assert!(!config.test_mode);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Trace every enter, exit and stack move
    pub debug: bool,

    /// Capacity of the log record ring
    pub log_rec_size: usize,

    /// Record only messages that caused a transition
    pub log_only_transitions: bool,

    /// Accept messages from threads other than the loop's owner
    pub test_mode: bool,

    /// What to do when a callback misuses the machine
    pub on_usage_violation: ViolationStrategy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_rec_size: DEFAULT_LOG_REC_SIZE,
            log_only_transitions: false,
            test_mode: false,
            on_usage_violation: ViolationStrategy::Log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config: MachineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MachineConfig::default());
    }

    #[test]
    fn strategy_uses_snake_case() {
        let config: MachineConfig =
            serde_json::from_str(r#"{ "on_usage_violation": "panic" }"#).unwrap();
        assert_eq!(config.on_usage_violation, ViolationStrategy::Panic);
    }
}
