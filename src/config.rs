//! Generator configuration.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (applied via [`GeneratorConfig::apply_cli_overrides`])
//! 2. Config file (`--config <path>`, or `schemarel.toml` in the working directory)
//! 3. Compiled defaults

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sql::ColumnType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },
    #[error("Invalid config in {path}: {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid value for `{field}`: {message}")]
    ValidationFailed { field: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Columns never turned into fields.
    pub ignored_fields: Vec<String>,
    /// Tables dropped from the schema snapshot.
    pub excluded_tables: Vec<String>,
    /// Catalog type to field type overrides, e.g. `uuid = "string"`.
    pub type_mappings: BTreeMap<String, String>,
    pub searchable_default: bool,
    pub timestamps: TimestampConfig,
    /// Namespace prefix for model classes in doc annotations.
    pub model_namespace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    pub enabled: bool,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ignored_fields: Vec::new(),
            excluded_tables: Vec::new(),
            type_mappings: BTreeMap::new(),
            searchable_default: false,
            timestamps: TimestampConfig::default(),
            model_namespace: "App\\Models".to_string(),
        }
    }
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            created_at: "created_at".to_string(),
            updated_at: "updated_at".to_string(),
            deleted_at: "deleted_at".to_string(),
        }
    }
}

impl TimestampConfig {
    /// Timestamp column names, or nothing when timestamps are disabled.
    pub fn field_names(&self) -> Vec<&str> {
        if !self.enabled {
            return Vec::new();
        }
        vec![
            self.created_at.as_str(),
            self.updated_at.as_str(),
            self.deleted_at.as_str(),
        ]
    }
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub ignored_fields: Vec<String>,
    pub excluded_tables: Vec<String>,
    pub searchable_default: Option<bool>,
}

impl GeneratorConfig {
    pub const FILE_NAME: &'static str = "schemarel.toml";

    /// Load configuration from `explicit`, or from [`Self::FILE_NAME`] in
    /// `root` when present, then apply CLI overrides and validate.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(
        root: &Path,
        explicit: Option<&Path>,
        cli_overrides: Option<&CliOverrides>,
    ) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = root.join(Self::FILE_NAME);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(cli) = cli_overrides {
            config.apply_cli_overrides(cli);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "loaded generator config");
        Ok(config)
    }

    /// CLI lists extend the configured ones; flags replace them.
    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        for field in &cli.ignored_fields {
            if !self.ignored_fields.contains(field) {
                self.ignored_fields.push(field.clone());
            }
        }
        for table in &cli.excluded_tables {
            if !self.excluded_tables.contains(table) {
                self.excluded_tables.push(table.clone());
            }
        }
        if let Some(searchable) = cli.searchable_default {
            self.searchable_default = searchable;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ts = &self.timestamps;
        if ts.enabled {
            for (field, value) in [
                ("timestamps.created_at", &ts.created_at),
                ("timestamps.updated_at", &ts.updated_at),
                ("timestamps.deleted_at", &ts.deleted_at),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: "must not be empty while timestamps are enabled".to_string(),
                    });
                }
            }
        }

        for (from, to) in &self.type_mappings {
            if to.parse::<ColumnType>().is_err() {
                return Err(ConfigError::ValidationFailed {
                    field: format!("type_mappings.{from}"),
                    message: format!("`{to}` is not a known column type"),
                });
            }
        }

        if self.model_namespace.trim().is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "model_namespace".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn is_ignored(&self, column: &str) -> bool {
        self.ignored_fields.iter().any(|f| f == column)
    }
}
