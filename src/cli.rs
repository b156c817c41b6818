//! CLI definitions for SmartSource.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use smartsource_protocols::{FilterValue, Filters, QueryMode, RangeFilter};

/// SmartSource CLI.
#[derive(Parser)]
#[command(name = "smartsource")]
#[command(about = "Hybrid document retrieval with reciprocal rank fusion")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, env = "SMARTSOURCE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run one query and print the response as JSON
    Search(SearchArgs),

    /// Validate the configuration and print errors and warnings
    CheckConfig,

    /// Read queries from stdin, one per line
    Repl(ReplArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct SearchArgs {
    /// Query text
    pub text: String,

    #[command(flatten)]
    pub options: QueryOptions,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ReplArgs {
    #[command(flatten)]
    pub options: QueryOptions,
}

/// Options shared by `search` and `repl`.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct QueryOptions {
    /// Number of results to skip
    #[arg(long)]
    pub offset: Option<i64>,

    /// Number of results to return
    #[arg(long)]
    pub limit: Option<i64>,

    /// Force a retrieval mode
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<QueryMode>,

    /// Metadata filter: `field=value`, `field=a,b`, `field>=x` or `field<=x`
    #[arg(long = "filter", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

fn parse_mode(value: &str) -> Result<QueryMode, String> {
    value.parse()
}

/// Parse `--filter` arguments. Range bounds on the same field merge.
pub(crate) fn parse_filters(args: &[String]) -> Result<Filters, String> {
    let mut filters = Filters::new();

    for arg in args {
        if let Some((field, bound)) = arg.split_once(">=") {
            let range = range_entry(&mut filters, field)?;
            range.gte = Some(bound_value(bound));
        } else if let Some((field, bound)) = arg.split_once("<=") {
            let range = range_entry(&mut filters, field)?;
            range.lte = Some(bound_value(bound));
        } else if let Some((field, value)) = arg.split_once('=') {
            let field = field_name(field)?;
            let filter = if value.contains(',') {
                FilterValue::OneOf(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect(),
                )
            } else {
                FilterValue::Exact(value.trim().to_string())
            };
            filters.insert(field, filter);
        } else {
            return Err(format!(
                "invalid filter '{}': expected field=value, field>=value or field<=value",
                arg
            ));
        }
    }

    Ok(filters)
}

fn field_name(field: &str) -> Result<String, String> {
    let field = field.trim();
    if field.is_empty() {
        return Err("filter field name is empty".to_string());
    }
    Ok(field.to_string())
}

fn range_entry<'a>(filters: &'a mut Filters, field: &str) -> Result<&'a mut RangeFilter, String> {
    let field = field_name(field)?;
    let entry = filters
        .entry(field.clone())
        .or_insert_with(|| FilterValue::Range(RangeFilter::default()));
    match entry {
        FilterValue::Range(range) => Ok(range),
        _ => Err(format!("field '{}' mixes a range with an exact filter", field)),
    }
}

/// Numbers stay numbers so they compare numerically.
fn bound_value(raw: &str) -> Value {
    let raw = raw.trim();
    match raw.parse::<serde_json::Number>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_exact_and_one_of() {
        let filters = parse_filters(&args(&["lang=en", "tags=geo, europe"])).unwrap();
        assert_eq!(filters["lang"], FilterValue::Exact("en".to_string()));
        assert_eq!(
            filters["tags"],
            FilterValue::OneOf(vec!["geo".to_string(), "europe".to_string()])
        );
    }

    #[test]
    fn test_parse_range_merges_bounds() {
        let filters = parse_filters(&args(&["year>=2019", "year<=2021", "updated_at>=2024-01-01"]))
            .unwrap();
        assert_eq!(
            filters["year"],
            FilterValue::Range(RangeFilter {
                gte: Some(json!(2019)),
                lte: Some(json!(2021)),
            })
        );
        assert_eq!(
            filters["updated_at"],
            FilterValue::Range(RangeFilter {
                gte: Some(json!("2024-01-01")),
                lte: None,
            })
        );
    }

    #[test]
    fn test_parse_filter_errors() {
        assert!(parse_filters(&args(&["lang"])).is_err());
        assert!(parse_filters(&args(&["=en"])).is_err());
        assert!(parse_filters(&args(&["year=2020", "year>=2019"])).is_err());
    }

    #[test]
    fn test_cli_search_arguments() {
        let cli = Cli::try_parse_from([
            "smartsource",
            "-c",
            "search.toml",
            "search",
            "capital of France",
            "--limit",
            "3",
            "--mode",
            "keyword",
            "--filter",
            "lang=en",
            "--pretty",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("search.toml")));
        match cli.command {
            Commands::Search(search) => {
                assert_eq!(search.text, "capital of France");
                assert_eq!(search.options.limit, Some(3));
                assert_eq!(search.options.offset, None);
                assert_eq!(search.options.mode, Some(QueryMode::Keyword));
                assert_eq!(search.options.filters, vec!["lang=en".to_string()]);
                assert!(search.options.pretty);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        let result = Cli::try_parse_from(["smartsource", "search", "x", "--mode", "fuzzy"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_check_config() {
        let cli = Cli::try_parse_from(["smartsource", "check-config"]).unwrap();
        assert!(matches!(cli.command, Commands::CheckConfig));
    }
}
