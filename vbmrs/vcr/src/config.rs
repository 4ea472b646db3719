//! User-facing VCR settings.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happens when playback runs out of recorded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndPolicy {
    /// Replay the movie from the start one frame after it ends.
    Restart,
    /// Resume recording if the movie was recorded this session, otherwise close it.
    SwitchToRecord,
    /// Leave the movie open in the finished state.
    KeepOpen,
    /// Stop the movie.
    #[default]
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VcrConfig {
    pub end_policy: EndPolicy,
    /// Pause emulation when playback ends.
    pub pause_on_end: bool,
    /// Don't show the Super Game Boy border during playback.
    pub hide_border: bool,
}

impl Default for VcrConfig {
    fn default() -> Self {
        Self {
            end_policy: EndPolicy::Close,
            pause_on_end: true,
            hide_border: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[source] io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),
}

impl VcrConfig {
    /// Standard location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vbmrs").join("vcr.toml"))
    }

    /// Loads the config at `path`. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(ConfigError::Io(err)),
        };
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config = VcrConfig::from_toml("end-policy = \"switch-to-record\"\n").unwrap();
        assert_eq!(config.end_policy, EndPolicy::SwitchToRecord);
        assert!(config.pause_on_end);
        assert!(!config.hide_border);
    }

    #[test]
    fn test_bad_config() {
        assert!(matches!(
            VcrConfig::from_toml("end-policy = \"explode\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = VcrConfig::load(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, VcrConfig::default());
    }
}
