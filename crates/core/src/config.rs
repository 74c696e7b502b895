//! Runtime configuration for encoding and decoding

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// How a slow-path byte that indexes past the end of the sorted move list is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlowIndexPolicy {
    /// Resolve to the first move of the sorted list
    #[default]
    FirstMove,
    /// Report `Error::SlowIndexOutOfRange`
    Reject,
}

impl SlowIndexPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlowIndexPolicy::FirstMove => "first_move",
            SlowIndexPolicy::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deepest variation nesting accepted by the stepper and the writer
    pub max_depth: usize,
    /// Column at which PGN movetext is wrapped
    pub wrap_column: usize,
    pub slow_index_policy: SlowIndexPolicy,
    /// Turn a trailing '+' into '#' when the resulting position is mate
    pub mate_upgrade: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: 30,
            wrap_column: 79,
            slow_index_policy: SlowIndexPolicy::FirstMove,
            mate_upgrade: true,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_depth, 30);
        assert_eq!(config.wrap_column, 79);
        assert_eq!(config.slow_index_policy, SlowIndexPolicy::FirstMove);
        assert!(config.mate_upgrade);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json_str(r#"{"max_depth": 4, "slow_index_policy": "reject"}"#).unwrap();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.slow_index_policy, SlowIndexPolicy::Reject);
        assert_eq!(config.wrap_column, 79);
    }

    #[test]
    fn test_bad_json() {
        assert!(Config::from_json_str("{max_depth: }").is_err());
    }
}
