mod cli;
mod context;
mod error;
mod invoke;
mod job;
mod location;
mod registry;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

use cli::Cli;
use error::RelayError;
use invoke::RsyncRunner;
use job::{ConsolePrompt, Job};
use registry::Registry;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_str()));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => exit_code_for(err),
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let registry = Registry::load(cli.config.as_deref())?;

    if cli.list_aliases {
        if registry.is_empty() {
            println!("No aliases configured");
            println!("\nAdd them in: {}", Registry::config_path()?.display());
        } else {
            println!("Registered aliases:");
            for name in registry.names() {
                println!("  @{}", name);
            }
        }
        return Ok(());
    }

    if let Some(name) = &cli.show_alias {
        match registry.show(name) {
            Some(rendered) => {
                println!("{}", rendered);
                return Ok(());
            }
            None => {
                return Err(RelayError::UnknownAlias { name: name.clone() }.into());
            }
        }
    }

    cli.validate()?;

    // Present after validation.
    let source = cli.source.clone().expect("source required after validation");
    let destination = cli
        .destination
        .clone()
        .expect("destination required after validation");

    if cli.dry_run {
        println!("Mode: dry-run (no changes will be made)");
    }

    let job = Job::new(
        source,
        destination,
        cli.transfer_options(),
        cli.passthrough.clone(),
        cli.yes,
        &registry,
    );
    job.run(&mut ConsolePrompt, &mut RsyncRunner)?;

    if cli.dry_run {
        println!("\n{}", "✓ Dry-run complete (no changes made)".green().bold());
    } else {
        println!("\n{}", "✓ Transfer complete".green().bold());
    }
    Ok(())
}

/// Map the failure taxonomy to process exit codes. The transfer
/// executable's own status is mirrored; a declined prompt exits 130
/// without an error banner.
fn exit_code_for(err: anyhow::Error) -> ExitCode {
    match err.downcast_ref::<RelayError>() {
        Some(RelayError::Aborted) => {
            println!("{}", "Aborted.".yellow());
            ExitCode::from(130)
        }
        Some(RelayError::TransferFailed { status, .. }) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::from((*status).clamp(1, 255) as u8)
        }
        _ => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
