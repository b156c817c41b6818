//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::{Config, IndexBackend, IndexConfig};

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load a file, then apply the process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Config, ConfigError> {
        let mut config = Self::load(path)?;
        Self::apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Default config location: `<config dir>/smartsource/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smartsource")
            .join("config.toml")
    }

    /// Apply the well-known environment overrides.
    ///
    /// `lookup` resolves a variable name; empty values are ignored.
    pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("RRF_K_FACTOR") {
            config.search.rrf_k = parse_value("RRF_K_FACTOR", &value)?;
        }
        if let Some(value) = get("MAX_DOCUMENT_COUNT") {
            config.search.default_page_size = parse_value("MAX_DOCUMENT_COUNT", &value)?;
        }
        if let Some(value) = get("LOG_LEVEL") {
            config.logging.level = value.trim().to_lowercase();
        }
        if let Some(value) = get("ES_HOST") {
            config.elasticsearch.host = value;
        }
        if let Some(value) = get("ES_USER") {
            config.elasticsearch.user = Some(value);
        }
        if let Some(value) = get("ES_PASSWORD") {
            config.elasticsearch.password = Some(value);
        }
        if let Some(value) = get("ES_API_KEY") {
            config.elasticsearch.api_key = Some(value);
        }
        if let Some(value) = get("ES_INDEX_NAMES") {
            for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                if config.index(name).is_none() {
                    config
                        .indexes
                        .push(IndexConfig::new(name, IndexBackend::Elasticsearch));
                }
            }
        }

        Ok(())
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &Path) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        })
}
