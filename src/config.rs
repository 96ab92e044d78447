//! Application configuration loaded from TOML.
//!
//! Lookup order: `$JOYSCOPE_CONFIG`, then `<config dir>/joyscope/config.toml`.
//! A missing file means defaults; a malformed one is an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

use crate::joystick::JoystickSettings;

pub const CONFIG_ENV: &str = "JOYSCOPE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown log level '{0}'")]
    InvalidLevel(String),

    #[error("Dead zone must be within [0, 1), got {0}")]
    InvalidDeadZone(f32),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub joystick: JoystickSettings,
    pub dump: DumpConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DumpConfig {
    /// Directory receiving `joysticks-<millis>.txt`
    pub directory: PathBuf,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.level).map_err(|_| ConfigError::InvalidLevel(self.level.clone()))
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("joyscope").join("config.toml"))
    }

    /// Loads from [`Config::default_path`], falling back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let dead_zone = self.joystick.global_dead_zone;
        if !(0.0..1.0).contains(&dead_zone) {
            return Err(ConfigError::InvalidDeadZone(dead_zone));
        }
        self.logging.level()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joystick::TriggerSynthesis;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("joyscope-{}-{}.toml", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("joyscope-does-not-exist.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = write_temp(
            "partial",
            "[joystick]\nglobal_dead_zone = 0.2\ntrigger_synthesis = \"always\"\n",
        );
        let config = Config::load_from(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.joystick.global_dead_zone, 0.2);
        assert_eq!(config.joystick.trigger_synthesis, TriggerSynthesis::Always);
        assert_eq!(config.joystick.event_buffer, 1000);
        assert_eq!(config.dump.directory, PathBuf::from("."));
        assert_eq!(config.logging.level().unwrap(), Level::INFO);
    }

    #[test]
    fn out_of_range_dead_zone_is_rejected() {
        let path = write_temp("deadzone", "[joystick]\nglobal_dead_zone = 1.5\n");
        let result = Config::load_from(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::InvalidDeadZone(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let path = write_temp("malformed", "[joystick\n");
        let result = Config::load_from(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let logging = LoggingConfig {
            level: "loud".to_string(),
        };
        assert!(matches!(logging.level(), Err(ConfigError::InvalidLevel(_))));
    }
}
