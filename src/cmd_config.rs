//! Configuration loading and the `check-config` command.

use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

use smartsource_config::{Config, ConfigError, ConfigLoader, ConfigValidator, ValidationResult};

/// Load the configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present, otherwise built-in defaults. Environment overrides apply
/// in every case.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => ConfigLoader::load(&ConfigLoader::expand_path(path))?,
        None => {
            let default = ConfigLoader::default_path();
            if default.exists() {
                ConfigLoader::load(&default)?
            } else {
                debug!("No config file at {}, using defaults", default.display());
                Config::default()
            }
        }
    };
    ConfigLoader::apply_overrides(&mut config, lookup)?;
    Ok(config)
}

/// Validate and render a report. Returns the report and whether the
/// configuration is usable.
pub(crate) fn check_config(config: &Config) -> Result<(String, bool), ConfigError> {
    let result = ConfigValidator::validate(config)?;
    Ok((render_report(config, &result), result.is_valid()))
}

fn render_report(config: &Config, result: &ValidationResult) -> String {
    let mut out = String::new();

    for error in &result.errors {
        let _ = writeln!(out, "error: {}: {}", error.path, error.message);
    }
    for warning in &result.warnings {
        let _ = writeln!(out, "warning: {}: {}", warning.path, warning.message);
    }

    if result.is_valid() {
        let ids: Vec<&str> = config.indexes.iter().map(|i| i.id.as_str()).collect();
        let _ = writeln!(
            out,
            "ok: {} index(es) [{}], {} warning(s)",
            ids.len(),
            ids.join(", "),
            result.warnings.len()
        );
    } else {
        let _ = writeln!(out, "invalid: {} error(s)", result.errors.len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_explicit_path_with_overrides() {
        let file = write_config(
            r#"
[search]
rrf_k = 30.0

[[indexes]]
id = "wiki"
backend = "elasticsearch"
"#,
        );

        let env: HashMap<&str, &str> = [("ES_HOST", "http://es.test:9200")].into();
        let config =
            load_config_with(Some(file.path()), |name| env.get(name).map(|v| v.to_string()))
                .unwrap();

        assert_eq!(config.search.rrf_k, 30.0);
        assert_eq!(config.indexes.len(), 1);
        assert_eq!(config.elasticsearch.host, "http://es.test:9200");
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let result = load_config_with(Some(Path::new("/nonexistent/smartsource.toml")), |_| None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_check_config_reports_errors() {
        let (report, valid) = check_config(&Config::default()).unwrap();
        assert!(!valid);
        assert!(report.contains("error: indexes"));
        assert!(report.contains("invalid:"));
    }

    #[test]
    fn test_check_config_ok() {
        let file = write_config(
            r#"
[[indexes]]
id = "wiki"
backend = "elasticsearch"
vector = false
"#,
        );
        let config = load_config_with(Some(file.path()), |_| None).unwrap();

        let (report, valid) = check_config(&config).unwrap();
        assert!(valid, "{}", report);
        assert!(report.contains("ok: 1 index(es) [wiki]"));
    }
}
