//! Backend selection: the Azure DevOps adapter or the seeded demo store.

use anyhow::Result;
use tagdesk_core::config::TagdeskConfig;
use tagdesk_core::host::{HostEnvironment, ProjectContext};
use tagdesk_core::{TagEditSession, WorkItemStore};
use tracing::debug;

use crate::ado::AzureDevOpsClient;
use crate::demo::demo_backend;

pub type Session = TagEditSession<Box<dyn HostEnvironment>, Box<dyn WorkItemStore>>;

/// What the command line says about where work items live.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub demo: bool,
    /// `--project`, taking precedence over environment and config.
    pub project: Option<String>,
    pub config: TagdeskConfig,
}

/// Host adapter for a terminal: the project comes from flags or config.
#[derive(Debug, Clone)]
pub struct ConfiguredHost {
    project: Option<String>,
}

impl ConfiguredHost {
    pub fn new(flag: Option<&str>, configured: Option<&str>) -> Self {
        let project = flag
            .or(configured)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        Self { project }
    }
}

impl HostEnvironment for ConfiguredHost {
    fn resolve_project_context(&self) -> Result<Option<ProjectContext>> {
        Ok(self.project.clone().map(ProjectContext::named))
    }

    fn notify_load_succeeded(&self) {
        debug!("catalog load complete");
    }

    fn resize(&self, width: u16, height: u16) {
        debug!(width, height, "panel resize requested");
    }
}

/// Build an uninitialized session over the selected backend.
///
/// # Errors
///
/// Returns an error if the remote client cannot be configured.
pub fn open_session(options: &BackendOptions) -> Result<Session> {
    if options.demo {
        debug!("using demo backend");
        let backend = demo_backend(options.project.as_deref());
        let host: Box<dyn HostEnvironment> = Box::new(backend.clone());
        let store: Box<dyn WorkItemStore> = Box::new(backend);
        return Ok(TagEditSession::new(host, store));
    }

    let connection = &options.config.connection;
    let client = AzureDevOpsClient::from_config(connection)?;
    let host: Box<dyn HostEnvironment> = Box::new(ConfiguredHost::new(
        options.project.as_deref(),
        connection.project.as_deref(),
    ));
    let store: Box<dyn WorkItemStore> = Box::new(client);
    Ok(TagEditSession::new(host, store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_config() {
        let host = ConfiguredHost::new(Some("Flag"), Some("Config"));
        let ctx = host.resolve_project_context().expect("resolve");
        assert_eq!(ctx.map(|c| c.name), Some("Flag".to_string()));
    }

    #[test]
    fn blank_project_means_no_context() {
        let host = ConfiguredHost::new(Some("  "), None);
        assert_eq!(host.resolve_project_context().expect("resolve"), None);
    }

    #[test]
    fn remote_backend_needs_org_url() {
        let options = BackendOptions::default();
        assert!(open_session(&options).is_err());
    }

    #[test]
    fn demo_backend_initializes() {
        let options = BackendOptions {
            demo: true,
            ..BackendOptions::default()
        };
        let mut session = open_session(&options).expect("open");
        session.initialize().expect("initialize");
        assert_eq!(session.catalog().len(), 5);
    }
}
