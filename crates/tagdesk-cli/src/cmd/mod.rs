pub mod completions;
pub mod edit;
pub mod list;
pub mod show;
pub mod tags;

use anyhow::Result;
use tagdesk_core::SessionError;

use crate::backend::{BackendOptions, Session, open_session};
use crate::output::{CliError, OutputMode, render_error};

/// Render a session error in the selected mode and hand it back for `?`.
pub fn report(output: OutputMode, err: SessionError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(&err)) {
        tracing::warn!("failed to render error: {render_err}");
    }
    err.into()
}

/// Open a session over the configured backend and load its catalog.
///
/// # Errors
///
/// Returns an error if the backend cannot be built or the catalog fails to
/// load; either is rendered to stderr first.
pub fn ready_session(options: &BackendOptions, output: OutputMode) -> Result<Session> {
    let mut session = match open_session(options) {
        Ok(session) => session,
        Err(e) => {
            render_error(output, &CliError::new(format!("{e:#}")))?;
            return Err(e);
        }
    };
    session.initialize().map_err(|err| report(output, err))?;
    Ok(session)
}
