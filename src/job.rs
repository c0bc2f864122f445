use tracing::{debug, info};

use crate::context::{ConfigContext, Side};
use crate::error::{RelayError, Result};
use crate::invoke::{Invocation, Runner, TransferOptions};
use crate::location::{validate_pair, Endpoint, LocationExpression};
use crate::registry::AliasSource;

/// Yes/no confirmation collaborator. Bypassed in simulate mode and with
/// `--yes`; tests substitute recording fakes.
pub trait Prompt {
    fn confirm(&mut self, message: &str) -> Result<bool>;
}

/// Interactive console prompt, defaulting to "no".
pub struct ConsolePrompt;

impl Prompt for ConsolePrompt {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(|e| RelayError::Io(std::io::Error::other(e.to_string())))
    }
}

/// One transfer command from resolution through invocation.
///
/// Sequencing only: resolve both sides, inject alias options into the
/// context, validate the pair, confirm, invoke. Every failure aborts
/// before anything destructive happens.
pub struct Job<'a> {
    source: LocationExpression,
    dest: LocationExpression,
    options: TransferOptions,
    extra: Vec<String>,
    assume_yes: bool,
    aliases: &'a dyn AliasSource,
}

impl<'a> Job<'a> {
    pub fn new(
        source: LocationExpression,
        dest: LocationExpression,
        options: TransferOptions,
        extra: Vec<String>,
        assume_yes: bool,
        aliases: &'a dyn AliasSource,
    ) -> Self {
        Self {
            source,
            dest,
            options,
            extra,
            assume_yes,
            aliases,
        }
    }

    pub fn run(&self, prompt: &mut dyn Prompt, runner: &mut dyn Runner) -> Result<()> {
        let source = Endpoint::resolve(&self.source, self.aliases)?;
        let dest = Endpoint::resolve(&self.dest, self.aliases)?;
        debug!(source = %source, dest = %dest, "resolved");

        let mut context = ConfigContext::new();
        context.inject(source.alias.as_ref(), Side::Source);
        context.inject(dest.alias.as_ref(), Side::Target);
        debug!(layer = ?context.alias_layer(), "injected alias options");

        validate_pair(&source, &dest)?;
        debug!("validated");

        if !self.options.simulate && !self.assume_yes {
            let question = format!("Sync {} -> {}?", source, dest);
            if !prompt.confirm(&question)? {
                return Err(RelayError::Aborted);
            }
        }
        debug!("confirmed");

        // The context supplies what the command line left unset.
        let mut options = self.options.clone();
        if options.mode.is_none() {
            options.mode = context.mode().map(str::to_string);
        }

        let invocation = Invocation::build(
            &options,
            context.ssh_config(),
            &source,
            &dest,
            &self.extra,
        );
        info!("running {}", invocation.render());

        let status = runner.run(&invocation)?;
        if status != 0 {
            return Err(RelayError::TransferFailed {
                source: source.spec(),
                dest: dest.spec(),
                status,
            });
        }
        Ok(())
    }
}
