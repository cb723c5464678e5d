//! Runtime settings for scripts.
//!
//! Settings come from an optional YAML file named by `QUICKSCRIPT_CONFIG`,
//! then individual environment variables override single keys.
//!
//! # Example YAML
//!
//! ```yaml
//! log_level: debug
//! log_format: json
//! disable_runtime_checks: false
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use quickscript_guard::{
    DISABLE_RUNTIME_CHECKS_VAR, EnvProvider, is_truthy, set_runtime_checks_disabled,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path of the YAML settings file.
pub const CONFIG_VAR: &str = "QUICKSCRIPT_CONFIG";
/// Log filter directive, e.g. `info` or `quickscript=debug`.
pub const LOG_VAR: &str = "QUICKSCRIPT_LOG";
/// Log output format, `text` or `json`.
pub const LOG_FORMAT_VAR: &str = "QUICKSCRIPT_LOG_FORMAT";

/// Errors raised while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read or written.
    #[error("settings file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid YAML for [`Settings`].
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An environment override holds an unusable value.
    #[error("invalid value for {var}: `{value}`")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses `text` or `json`, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Script runtime settings.
///
/// # Examples
///
/// ```
/// use quickscript::{LogFormat, Settings};
///
/// let settings: Settings = serde_yaml::from_str("log_format: json").unwrap();
/// assert_eq!(settings.log_format, LogFormat::Json);
/// assert_eq!(settings.log_level, "info");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log filter directive.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Turn off guard runtime checks.
    pub disable_runtime_checks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            disable_runtime_checks: false,
        }
    }
}

impl Settings {
    /// Loads settings from a YAML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(settings)
    }

    /// Saves the settings as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written, or
    /// [`ConfigError::Yaml`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Resolves settings from `env`: the file named by [`CONFIG_VAR`] if
    /// set, then the individual overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be loaded or an override
    /// is invalid.
    pub fn from_env(env: &dyn EnvProvider) -> Result<Self, ConfigError> {
        let mut settings = match env.var(CONFIG_VAR) {
            Some(path) if !path.trim().is_empty() => Self::load(path)?,
            _ => Self::default(),
        };
        settings.apply_env(env)?;
        Ok(settings)
    }

    /// Applies [`LOG_VAR`], [`LOG_FORMAT_VAR`] and
    /// [`DISABLE_RUNTIME_CHECKS_VAR`] overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown log format.
    pub fn apply_env(&mut self, env: &dyn EnvProvider) -> Result<(), ConfigError> {
        if let Some(level) = env.var(LOG_VAR) {
            if !level.trim().is_empty() {
                self.log_level = level;
            }
        }
        if let Some(format) = env.var(LOG_FORMAT_VAR) {
            self.log_format =
                LogFormat::parse(&format).ok_or_else(|| ConfigError::InvalidValue {
                    var: LOG_FORMAT_VAR.to_string(),
                    value: format.clone(),
                })?;
        }
        if let Some(flag) = env.var(DISABLE_RUNTIME_CHECKS_VAR) {
            self.disable_runtime_checks = is_truthy(&flag);
        }
        Ok(())
    }

    /// Makes `disable_runtime_checks` take effect for every guard in the
    /// process, whether it was built before or after this call.
    pub fn apply_runtime_checks(&self) {
        set_runtime_checks_disabled(self.disable_runtime_checks);
    }
}

#[cfg(test)]
mod tests {
    use quickscript_guard::MapEnv;

    use super::*;

    #[test]
    fn test_defaults_without_environment() {
        let settings = Settings::from_env(&MapEnv::new()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quickscript.yml");

        let settings = Settings {
            log_level: "debug".to_string(),
            log_format: LogFormat::Json,
            disable_runtime_checks: true,
        };
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quickscript.yml");
        std::fs::write(&path, "log_level: warn\nlog_format: json\n").unwrap();

        let env = MapEnv::new()
            .with(CONFIG_VAR, &path.display().to_string())
            .with(LOG_VAR, "debug")
            .with(DISABLE_RUNTIME_CHECKS_VAR, "yes");
        let settings = Settings::from_env(&env).unwrap();

        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_format, LogFormat::Json);
        assert!(settings.disable_runtime_checks);
    }

    #[test]
    fn test_invalid_format_override() {
        let env = MapEnv::new().with(LOG_FORMAT_VAR, "xml");
        let err = Settings::from_env(&env).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for QUICKSCRIPT_LOG_FORMAT: `xml`");
    }

    #[test]
    fn test_missing_config_file() {
        let env = MapEnv::new().with(CONFIG_VAR, "/nonexistent/quickscript.yml");
        assert!(matches!(
            Settings::from_env(&env),
            Err(ConfigError::Io { .. })
        ));
    }
}
