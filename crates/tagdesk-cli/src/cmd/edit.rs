//! `tagdesk edit`: open the interactive tag panel.

use anyhow::Result;
use std::io::IsTerminal;
use tagdesk_core::error::ErrorCode;

use crate::backend::{BackendOptions, open_session};
use crate::output::{CliError, OutputMode, render_error};
use crate::tui;

/// Run the panel. The catalog is loaded inside the panel so failures show
/// in its status line and can be retried with `r`.
///
/// # Errors
///
/// Returns an error if stdout is not a terminal or the backend cannot be
/// built.
pub fn run_edit(options: &BackendOptions, output: OutputMode) -> Result<()> {
    if !std::io::stdout().is_terminal() {
        let err = CliError::with_details(
            "the tag panel needs an interactive terminal",
            "Use `tagdesk tags <id> --add <tag>` in scripts.",
            ErrorCode::InvalidOperation.code(),
        );
        render_error(output, &err)?;
        anyhow::bail!("{}", err.message);
    }

    let session = match open_session(options) {
        Ok(session) => session,
        Err(e) => {
            render_error(output, &CliError::new(format!("{e:#}")))?;
            return Err(e);
        }
    };
    tui::run_panel(session)
}
