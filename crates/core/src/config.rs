//! Engine configuration
//!
//! Settings come from defaults, an optional TOML file and environment
//! variables, applied in that order.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default tracing filter for binaries embedding the engine
pub const DEFAULT_LOG_FILTER: &str = "warn,markup_core=info";

/// Tunables for an editing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Undo groups kept per session, `None` for unbounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_undo_levels: Option<usize>,
    /// Restore the page back-reference of objects removed from the surface
    pub restore_page_backref: bool,
    /// `tracing_subscriber::EnvFilter` directives
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_undo_levels: None,
            restore_page_backref: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_max_undo_levels(mut self, levels: Option<usize>) -> Self {
        self.max_undo_levels = levels;
        self
    }

    pub fn with_restore_page_backref(mut self, restore: bool) -> Self {
        self.restore_page_backref = restore;
        self
    }

    /// Defaults, overlaid with `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()
    }

    /// Load configuration from a TOML file.
    ///
    /// ```toml
    /// max_undo_levels = 200
    /// restore_page_backref = true
    /// log_filter = "info"
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()
    }

    /// Defaults overlaid with environment variables
    ///
    /// - `MARKUP_MAX_UNDO_LEVELS`: positive integer, or `unlimited`
    /// - `MARKUP_RESTORE_BACKREF`: `true`/`false`/`1`/`0`
    /// - `MARKUP_LOG`: tracing filter directives
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var("MARKUP_MAX_UNDO_LEVELS") {
            self.max_undo_levels = if val.eq_ignore_ascii_case("unlimited") {
                None
            } else {
                Some(val.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                    key: "MARKUP_MAX_UNDO_LEVELS".to_string(),
                    value: val.clone(),
                })?)
            };
        }

        if let Ok(val) = std::env::var("MARKUP_RESTORE_BACKREF") {
            self.restore_page_backref = match val.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "MARKUP_RESTORE_BACKREF".to_string(),
                        value: val,
                    })
                }
            };
        }

        if let Ok(val) = std::env::var("MARKUP_LOG") {
            self.log_filter = val;
        }

        self.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_undo_levels == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_undo_levels".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(self)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let toml = toml::to_string(self)?;
        fs::write(path.as_ref(), toml)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
