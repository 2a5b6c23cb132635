//! Behavioral settings of the bridge.
//!
//! Per-call inputs (issuer, key id, key material, search terms) are never
//! part of this configuration; the caller owns their storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::DEFAULT_ARTWORK_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read bridge config '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bridge config is not valid: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("artwork size must be at least 1 pixel")]
    InvalidArtworkSize,
}

/// Settings loaded from a TOML document such as
///
/// ```toml
/// consent-timeout-secs = 120
/// artwork-size = 600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BridgeConfig {
    /// Give up waiting for a consent prompt after this many seconds.
    /// Unset waits indefinitely.
    pub consent_timeout_secs: Option<u64>,
    /// Square pixel size at which artwork URLs are rendered.
    pub artwork_size: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            consent_timeout_secs: None,
            artwork_size: DEFAULT_ARTWORK_SIZE,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(contents).map_err(ConfigError::Parse)?;
        if config.artwork_size == 0 {
            return Err(ConfigError::InvalidArtworkSize);
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn consent_timeout(&self) -> Option<Duration> {
        self.consent_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.artwork_size, 300);
        assert_eq!(config.consent_timeout(), None);
    }

    #[test]
    fn parses_all_settings() {
        let config = BridgeConfig::from_toml_str(indoc! {"
            consent-timeout-secs = 120
            artwork-size = 600
        "})
        .unwrap();

        assert_eq!(config, BridgeConfig {
            consent_timeout_secs: Some(120),
            artwork_size: 600,
        });
        assert_eq!(config.consent_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = BridgeConfig::from_toml_str("private-key = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn rejects_zero_artwork_size() {
        let err = BridgeConfig::from_toml_str("artwork-size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArtworkSize), "got {err:?}");
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "consent-timeout-secs = 5\n").unwrap();

        let config = BridgeConfig::from_path(&path).unwrap();
        assert_eq!(config.consent_timeout_secs, Some(5));
        assert_eq!(config.artwork_size, DEFAULT_ARTWORK_SIZE);
    }

    #[test]
    fn missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = BridgeConfig::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("missing.toml"), "{err}");
    }
}
