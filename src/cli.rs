use std::path::PathBuf;

use clap::Parser;

use crate::invoke::TransferOptions;
use crate::location::LocationExpression;

fn parse_location(s: &str) -> Result<LocationExpression, String> {
    LocationExpression::parse(s)
}

#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "Sync a tree between this machine and a registered remote host", long_about = None)]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Push the working tree to a registered alias
    relay ./ @dev

    # Pull a subdirectory from an alias
    relay @dev:shared/files ./files

    # Preview without prompting or transferring
    relay ./ @dev --dry-run

    # Exclude paths (':'-delimited list) and pass extra rsync flags
    relay ./ @dev --exclude-paths \"logs:tmp\" -- --delete

    # Inspect the registry
    relay --list-aliases
    relay --show-alias dev

Aliases live in ~/.config/relay/config.toml (override with --config or RELAY_CONFIG).")]
pub struct Cli {
    /// Source location: a path, @alias, or @alias:path
    #[arg(value_parser = parse_location)]
    pub source: Option<LocationExpression>,

    /// Destination location: a path, @alias, or @alias:path
    #[arg(value_parser = parse_location)]
    pub destination: Option<LocationExpression>,

    /// Extra arguments passed through to rsync verbatim (after --)
    #[arg(last = true)]
    pub passthrough: Vec<String>,

    /// Paths to exclude, ':'-delimited (e.g. "logs:tmp:cache")
    #[arg(long, value_name = "LIST")]
    pub exclude_paths: Option<String>,

    /// Paths to include, ':'-delimited
    #[arg(long, value_name = "LIST")]
    pub include_paths: Option<String>,

    /// rsync mode flag letters (default: az, or the alias's declared mode)
    #[arg(long, value_name = "LETTERS")]
    pub mode: Option<String>,

    /// Verbose transfer output (can be repeated for more log detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Simulate: skip the prompt and pass --dry-run to rsync
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// List registered aliases
    #[arg(long)]
    pub list_aliases: bool,

    /// Show one alias as TOML
    #[arg(long, value_name = "NAME")]
    pub show_alias: Option<String>,

    /// Alias registry file (default: ~/.config/relay/config.toml)
    #[arg(long, env = "RELAY_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        // Registry introspection needs no endpoints.
        if self.list_aliases || self.show_alias.is_some() {
            return Ok(());
        }

        if self.source.is_none() || self.destination.is_none() {
            anyhow::bail!("Source and destination are required");
        }

        if let Some(mode) = &self.mode {
            if mode.is_empty() || !mode.chars().all(|c| c.is_ascii_alphabetic()) {
                anyhow::bail!(
                    "--mode must be rsync flag letters (got: '{}')",
                    mode
                );
            }
        }

        Ok(())
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            exclude: self
                .exclude_paths
                .as_deref()
                .map(TransferOptions::parse_list)
                .unwrap_or_default(),
            include: self
                .include_paths
                .as_deref()
                .map(TransferOptions::parse_list)
                .unwrap_or_default(),
            mode: self.mode.clone(),
            verbose: self.verbose > 0,
            simulate: self.dry_run,
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("relay").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let cli = parse(&["./src/", "@dev"]);
        assert_eq!(cli.source.as_ref().unwrap().raw(), "./src/");
        assert_eq!(cli.destination.as_ref().unwrap().alias(), Some("dev"));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_missing_destination_fails_validation() {
        let cli = parse(&["./src"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_list_aliases_needs_no_endpoints() {
        let cli = parse(&["--list-aliases"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let cli = parse(&["./a", "./b", "--mode", "a-z"]);
        assert!(cli.validate().is_err());
        let cli = parse(&["./a", "./b", "--mode", "rultz"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_empty_alias_rejected_at_parse() {
        let result =
            Cli::try_parse_from(["relay", "@", "./b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_passthrough_after_double_dash() {
        let cli = parse(&["./a", "./b", "--", "--delete", "--partial"]);
        assert_eq!(cli.passthrough, ["--delete", "--partial"]);
    }

    #[test]
    fn test_transfer_options_mapping() {
        let cli = parse(&[
            "./a",
            "./b",
            "--exclude-paths",
            "logs:tmp:",
            "--include-paths",
            "src",
            "-v",
            "-n",
        ]);
        let options = cli.transfer_options();
        assert_eq!(options.exclude, ["logs", "tmp"]);
        assert_eq!(options.include, ["src"]);
        assert_eq!(options.mode, None);
        assert!(options.verbose);
        assert!(options.simulate);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["./a", "./b"]).log_level(), tracing::Level::INFO);
        assert_eq!(
            parse(&["./a", "./b", "-v"]).log_level(),
            tracing::Level::DEBUG
        );
        assert_eq!(
            parse(&["./a", "./b", "-vv"]).log_level(),
            tracing::Level::TRACE
        );
    }
}
