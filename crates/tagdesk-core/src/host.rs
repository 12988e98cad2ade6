//! The host environment the panel is embedded in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height the panel asks the host for once it is first ready.
pub const PANEL_SIZE: (u16, u16) = (400, 400);

/// The active project as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ProjectContext {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

/// Name of a resolved project, used to scope catalog queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Services provided by the host application.
pub trait HostEnvironment {
    /// The active project, or `None` when invoked outside a project scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the host could not be asked at all.
    fn resolve_project_context(&self) -> anyhow::Result<Option<ProjectContext>>;

    /// Signal that a catalog load finished, so the host can drop its spinner.
    fn notify_load_succeeded(&self);

    /// Ask the host to resize the panel.
    fn resize(&self, width: u16, height: u16);
}

impl<T: HostEnvironment + ?Sized> HostEnvironment for Box<T> {
    fn resolve_project_context(&self) -> anyhow::Result<Option<ProjectContext>> {
        (**self).resolve_project_context()
    }

    fn notify_load_succeeded(&self) {
        (**self).notify_load_succeeded();
    }

    fn resize(&self, width: u16, height: u16) {
        (**self).resize(width, height);
    }
}
