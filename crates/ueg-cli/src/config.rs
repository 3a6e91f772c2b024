//! The single JSON configuration file the `ueg` binary reads.
//!
//! Every section is optional; missing sections and fields fall back to the
//! library defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ueg_check::{GateConfig, ValidatorConfig};
use ueg_codegen::GatingPolicy;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UegConfig {
    pub gate: GateConfig,
    pub validator: ValidatorConfig,
    /// Tag and kind to capability table used by the dispatcher.
    pub lowering: GatingPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl UegConfig {
    /// Loads `path`, or the defaults when no path was given.
    pub fn load(path: Option<&Path>) -> Result<UegConfig, ConfigError> {
        let Some(path) = path else {
            return Ok(UegConfig::default());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ueg_check::DuplicatePolicy;

    use super::*;

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(UegConfig::load(None).unwrap(), UegConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "gate": {{ "threshold": 0.9 }}, "validator": {{ "duplicate_policy": "reject" }} }}"#
        )
        .unwrap();

        let config = UegConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.gate.threshold, 0.9);
        assert_eq!(config.validator.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.validator.obfuscation_budget, 1.05);
        assert_eq!(config.lowering, GatingPolicy::default());
    }

    #[test]
    fn empty_gating_table_is_honoured() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "lowering": [] }}"#).unwrap();
        let config = UegConfig::load(Some(file.path())).unwrap();
        assert!(config.lowering.rules().is_empty());
    }

    #[test]
    fn unreadable_and_invalid_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            UegConfig::load(Some(missing.as_path())),
            Err(ConfigError::Read { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            UegConfig::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
