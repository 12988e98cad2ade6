//! `tagdesk completions`: shell completion scripts.
//!
//! The script covers every subcommand and the global flags, so
//! `tagdesk tags 42 --a<TAB>` completes to `--add`.

use anyhow::Result;
use clap::Args;
use clap_complete::{Shell, generate};

const BIN_NAME: &str = "tagdesk";

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate for (bash, zsh, fish, elvish, powershell).
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to stdout, e.g.
/// `tagdesk completions zsh > ~/.zfunc/_tagdesk`.
///
/// # Errors
///
/// Does not return an error; `clap_complete` panics if stdout is closed.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> Result<()> {
    write_completions(shell, command, &mut std::io::stdout());
    Ok(())
}

fn write_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn std::io::Write) {
    generate(shell, command, BIN_NAME, out);
}
