use std::process::Command;

use tracing::debug;

use crate::error::Result;
use crate::location::Endpoint;

/// The external transfer executable.
pub const RSYNC: &str = "rsync";

/// Delimiter for `--include-paths` / `--exclude-paths` lists.
pub const LIST_DELIMITER: char = ':';

/// Mode letters used when neither the command line nor an alias sets any:
/// archive (implies recursive) plus compress.
pub const DEFAULT_MODE: &str = "az";

/// Validated, typed view over the raw transfer options.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    /// rsync-style unary flag letters; `None` falls back to an
    /// alias-declared mode or [`DEFAULT_MODE`].
    pub mode: Option<String>,
    pub verbose: bool,
    /// Non-destructive simulate mode: skips the confirmation prompt and
    /// passes `--dry-run` through to rsync.
    pub simulate: bool,
}

impl TransferOptions {
    /// Split a delimiter-separated path list, dropping empty entries
    /// (e.g. from a trailing delimiter).
    pub fn parse_list(raw: &str) -> Vec<String> {
        raw.split(LIST_DELIMITER)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Fully assembled transfer command. Pure data; execution goes through
/// a [`Runner`].
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Assemble the rsync argument vector.
    ///
    /// Order: mode flags, verbose flags, dry-run, include/exclude filters,
    /// passthrough args, SSH transport directive, source path (trailing
    /// slash preserved), destination path (trailing slash trimmed).
    pub fn build(
        options: &TransferOptions,
        ssh_config: &str,
        source: &Endpoint,
        dest: &Endpoint,
        extra: &[String],
    ) -> Self {
        let mut args = Vec::new();

        let mut flags = String::from("-");
        flags.push_str(options.mode.as_deref().unwrap_or(DEFAULT_MODE));
        if options.verbose {
            flags.push('v');
        }
        if flags.len() > 1 {
            args.push(flags);
        }
        if options.verbose {
            args.push("--stats".to_string());
            args.push("--progress".to_string());
        }
        if options.simulate {
            args.push("--dry-run".to_string());
        }

        for path in &options.include {
            args.push(format!("--include={}", path));
        }
        for path in &options.exclude {
            args.push(format!("--exclude={}", path));
        }

        args.extend(extra.iter().filter(|a| !a.is_empty()).cloned());

        if source.is_remote() || dest.is_remote() {
            args.push("-e".to_string());
            if ssh_config.is_empty() {
                args.push("ssh".to_string());
            } else {
                args.push(format!("ssh {}", ssh_config));
            }
        }

        args.push(source.spec_verbatim());
        args.push(dest.spec());

        Invocation {
            command: RSYNC.to_string(),
            args,
        }
    }

    /// One-line rendition for logging.
    pub fn render(&self) -> String {
        let mut out = self.command.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Executes an assembled invocation and reports the exit status. The
/// process-spawning implementation lives behind this seam so the
/// orchestrator can be driven with a recording fake in tests.
pub trait Runner {
    fn run(&mut self, invocation: &Invocation) -> Result<i32>;
}

/// Runs rsync as a child process with inherited stdio, blocking until it
/// finishes. Interrupting the child is the user's prerogative.
pub struct RsyncRunner;

impl Runner for RsyncRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<i32> {
        debug!("spawning {}", invocation.render());
        let status = Command::new(&invocation.command)
            .args(&invocation.args)
            .status()?;
        // Killed by a signal: no exit code to mirror.
        Ok(status.code().unwrap_or(-1))
    }
}
