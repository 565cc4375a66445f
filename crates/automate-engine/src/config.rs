//! Engine tunables.

use std::{fs, mem, path::Path, time::Duration};

use rhai::Dynamic;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default memory ceiling: 256 MiB.
pub const DEFAULT_MEMORY_LIMIT: usize = 256 * 1024 * 1024;

/// Tunables applied when a runtime is built by [`crate::Engine::initialize`].
///
/// Every field has a default, so a config file only needs to name what it overrides:
///
/// ```ron
/// (memory_limit: 67108864, settle_delay_ms: 150)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Ceiling for script data, in bytes.
    pub memory_limit: usize,
    /// Maximum interpreter operations per evaluation; 0 is unlimited.
    pub max_operations: u64,
    /// Maximum script call depth; `None` keeps the interpreter default.
    pub max_call_levels: Option<usize>,
    /// Pause between the click and the text entry of `node.setText(..)`.
    pub settle_delay_ms: u64,
    /// Timeout used by `selector.waitFor()` when the script passes none.
    pub default_wait_timeout_ms: u64,
    /// Longest uninterrupted slice of a script `sleep`.
    pub sleep_slice_ms: u64,
    /// Number of console entries retained in memory.
    pub log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
            max_operations: 0,
            max_call_levels: None,
            settle_delay_ms: 100,
            default_wait_timeout_ms: 10_000,
            sleep_slice_ms: 50,
            log_capacity: 1000,
        }
    }
}

impl EngineConfig {
    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a RON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    /// Largest string a script may build, in bytes.
    pub(crate) fn max_string_size(&self) -> usize {
        self.memory_limit
    }

    /// Largest array or map a script may build, in elements.
    pub(crate) fn max_collection_size(&self) -> usize {
        (self.memory_limit / mem::size_of::<Dynamic>()).max(1)
    }

    /// Settle delay as a duration.
    pub(crate) fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Sleep slice as a duration, never zero.
    pub(crate) fn sleep_slice(&self) -> Duration {
        Duration::from_millis(self.sleep_slice_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.memory_limit, 256 * 1024 * 1024);
        assert_eq!(cfg.settle_delay_ms, 100);
        assert_eq!(cfg.default_wait_timeout_ms, 10_000);
        assert_eq!(cfg.max_call_levels, None);
    }

    #[test]
    fn ron_overrides_only_named_fields() {
        let cfg = EngineConfig::from_ron("(memory_limit: 1024, settle_delay_ms: 5)").unwrap();
        assert_eq!(cfg.memory_limit, 1024);
        assert_eq!(cfg.settle_delay_ms, 5);
        assert_eq!(cfg.log_capacity, 1000);
        assert_eq!(cfg.max_collection_size(), 1024 / mem::size_of::<Dynamic>());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_ron("(memroy_limit: 1)").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/automate/engine.ron")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
