//! CLI configuration
//!
//! Stored as TOML at `~/.ontograph/config.toml`. Every key is optional;
//! command-line flags take precedence over stored values.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use ontograph_core::ServiceOptions;
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ontograph")
}

/// Location of the config file
pub fn config_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ontograph")
        .join("config.toml")
}

/// Configuration for the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Ontology schema file replacing the built-in catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_paths: Option<usize>,

    /// `0` disables the traversal timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traversal_timeout_ms: Option<u64>,
}

impl Config {
    /// Load the config file, or defaults if there is none
    pub fn load() -> anyhow::Result<Self> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &[
            "data_dir",
            "schema",
            "format",
            "max_depth",
            "max_paths",
            "traversal_timeout_ms",
        ]
    }

    /// Current value of `key`; `None` for unknown keys
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "data_dir" => self.data_dir.as_ref().map(|p| p.display().to_string()),
            "schema" => self.schema.as_ref().map(|p| p.display().to_string()),
            "format" => self.format.map(|f| f.to_string()),
            "max_depth" => self.max_depth.map(|v| v.to_string()),
            "max_paths" => self.max_paths.map(|v| v.to_string()),
            "traversal_timeout_ms" => self.traversal_timeout_ms.map(|v| v.to_string()),
            _ => return None,
        };
        Some(value.unwrap_or_default())
    }

    /// Set `key` from its string form; an empty value clears it
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        let present = !value.is_empty();

        match key {
            "data_dir" => self.data_dir = present.then(|| PathBuf::from(value)),
            "schema" => self.schema = present.then(|| PathBuf::from(value)),
            "format" => {
                self.format = if present {
                    Some(value.parse()?)
                } else {
                    None
                }
            }
            "max_depth" => self.max_depth = parse_number(key, value)?,
            "max_paths" => self.max_paths = parse_number(key, value)?,
            "traversal_timeout_ms" => self.traversal_timeout_ms = parse_number(key, value)?,
            _ => anyhow::bail!(
                "Unknown config key: {}. Available keys: {}",
                key,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }

    /// Traversal options with configured overrides applied
    pub fn service_options(&self) -> ServiceOptions {
        let mut options = ServiceOptions::default();
        if let Some(depth) = self.max_depth {
            options = options.with_max_depth(depth);
        }
        if let Some(max_paths) = self.max_paths {
            options = options.with_max_paths(max_paths);
        }
        if let Some(ms) = self.traversal_timeout_ms {
            let timeout = (ms > 0).then(|| Duration::from_millis(ms));
            options = options.with_traversal_timeout(timeout);
        }
        options
    }
}

fn parse_number<T>(key: &str, value: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = value
        .parse()
        .with_context(|| format!("Invalid value for {}: {}", key, value))?;
    Ok(Some(parsed))
}
