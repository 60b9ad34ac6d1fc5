//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Coffer - read and merge-write secrets across backends
#[derive(Parser, Debug)]
#[command(name = "coffer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to coffer.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read a secret, or one property of it
    Get(GetArgs),

    /// Write a secret, merging properties into what is stored
    Set(SetArgs),

    /// List supported backends
    Backends(BackendsArgs),
}

/// Where a secret lives
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Backend tag (asm, ssm, gcp, azure, kubernetes, vault); defaults to the config file
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Region, project, vault, namespace or Vault address; defaults to the config file
    #[arg(short, long)]
    pub location: Option<String>,

    /// Secret name
    pub name: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print a single property instead of the whole secret
    #[arg(short, long)]
    pub property: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Flat secret value; `-` reads it from stdin
    #[arg(long, conflicts_with = "properties")]
    pub value: Option<String>,

    /// Property to set (repeatable)
    #[arg(short, long = "property", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub properties: Vec<(String, String)>,

    /// Label to add (repeatable)
    #[arg(long = "label", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub labels: Vec<(String, String)>,

    /// Annotation to add (repeatable)
    #[arg(long = "annotation", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub annotations: Vec<(String, String)>,

    /// Secret type, for backends that classify secrets
    #[arg(long = "type")]
    pub secret_type: Option<String>,

    /// Replace stored content instead of merging
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct BackendsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse `KEY=VALUE`; the value may itself contain `=`
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("url=postgres://h/db?a=b").unwrap(),
            ("url".to_string(), "postgres://h/db?a=b".to_string())
        );
        assert_eq!(parse_key_val("empty=").unwrap().1, "");
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_parse_set_command() {
        let cli = Cli::try_parse_from([
            "coffer",
            "-vv",
            "set",
            "--backend",
            "kubernetes",
            "--location",
            "ns-a",
            "cfg",
            "-p",
            "x=1",
            "--property",
            "y=2",
            "--annotation",
            "secret.coffer.dev/replicate-to=ns-b,ns-c",
            "--overwrite",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Set(args) = cli.command else {
            panic!("expected set");
        };
        assert_eq!(args.target.backend.as_deref(), Some("kubernetes"));
        assert_eq!(args.target.name, "cfg");
        assert_eq!(args.properties.len(), 2);
        assert_eq!(args.annotations[0].1, "ns-b,ns-c");
        assert!(args.overwrite);
    }

    #[test]
    fn test_value_conflicts_with_properties() {
        let result = Cli::try_parse_from([
            "coffer", "set", "db", "--value", "x", "--property", "a=1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["coffer", "get", "db", "-c", "/etc/coffer.yaml", "-p", "user"])
                .unwrap();
        assert_eq!(cli.config.as_deref().map(|p| p.as_str()), Some("/etc/coffer.yaml"));
        let Commands::Get(args) = cli.command else {
            panic!("expected get");
        };
        assert_eq!(args.property.as_deref(), Some("user"));
        assert!(args.target.backend.is_none());
    }
}
