use clap::{Args, Parser, Subcommand, ValueEnum};
use entitlement_core::Backend;
use std::path::PathBuf;

/// Loaded from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "entitlement.yaml";

#[derive(Parser, Debug)]
#[command(
    name = "entitlement",
    version,
    about = "Permission checks routed across relationship, property-graph and relational backends"
)]
pub struct Cli {
    /// Service configuration (YAML). Falls back to ./entitlement.yaml when present.
    #[arg(long, global = true, env = "ENTITLEMENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a single permission
    Check(CheckArgs),
    /// Check many permissions with bounded concurrency, answers in input order
    Bulk(BulkArgs),
    /// Repeat checks against expected decisions and report latency
    Bench(BenchArgs),
    /// Answer JSON-lines requests one line at a time
    Stream(StreamArgs),
    /// Report service health
    Health(HealthArgs),
    Version,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    pub actor: String,
    pub resource: String,
    pub permission: String,

    /// Extra context entry, repeatable (e.g. `--context amount=20`)
    #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub context: Vec<(String, String)>,

    /// Backend to ask: spicedb, neo4j, graphql or both
    #[arg(long, value_parser = parse_backend)]
    pub backend: Option<Backend>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Exit 1 when the permission is denied
    #[arg(long)]
    pub fail_on_deny: bool,
}

#[derive(Args, Debug)]
pub struct BulkArgs {
    /// JSON file holding a request array or `{requests, max_concurrency}`; `-` reads stdin
    #[arg(long, default_value = "-")]
    pub input: PathBuf,

    /// Concurrency ceiling; zero or negative runs everything at once
    #[arg(long, allow_negative_numbers = true)]
    pub max_concurrency: Option<i32>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Benchmark plan (YAML or JSON)
    #[arg(long)]
    pub plan: PathBuf,

    /// Override the plan's iteration count
    #[arg(long, allow_negative_numbers = true)]
    pub iterations: Option<i32>,

    /// Override the plan's per-case concurrency
    #[arg(long, allow_negative_numbers = true)]
    pub concurrency: Option<i32>,

    /// Override the backend of every case
    #[arg(long, value_parser = parse_backend)]
    pub backend: Option<Backend>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// JSON-lines request file; stdin when omitted
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Backend to echo in the status
    #[arg(long, value_parser = parse_backend)]
    pub backend: Option<Backend>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn parse_backend(raw: &str) -> Result<Backend, String> {
    Backend::from_hint(raw)
        .ok_or_else(|| format!("unknown backend '{raw}' (expected spicedb, neo4j, graphql or both)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn key_val_requires_separator() {
        assert_eq!(
            parse_key_val("amount=20").unwrap(),
            ("amount".to_string(), "20".to_string())
        );
        assert_eq!(
            parse_key_val("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("amount").is_err());
        assert!(parse_key_val("=20").is_err());
    }

    #[test]
    fn backend_accepts_hint_aliases() {
        assert_eq!(parse_backend("NEO4J").unwrap(), Backend::PropertyGraph);
        assert_eq!(parse_backend("c").unwrap(), Backend::Relational);
        assert_eq!(parse_backend("dual").unwrap(), Backend::Both);
        assert!(parse_backend("oracle").is_err());
    }

    #[test]
    fn parses_check_with_context() {
        let cli = Cli::parse_from([
            "entitlement",
            "check",
            "emma",
            "acc9",
            "can_initiate_payment",
            "--context",
            "amount=20",
            "--backend",
            "both",
            "--format",
            "json",
        ]);
        match cli.cmd {
            Command::Check(args) => {
                assert_eq!(args.context, vec![("amount".to_string(), "20".to_string())]);
                assert_eq!(args.backend, Some(Backend::Both));
                assert_eq!(args.format, OutputFormat::Json);
                assert!(!args.fail_on_deny);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
