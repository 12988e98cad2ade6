use std::fmt;

use crate::model::WorkItemId;

/// Machine-readable error codes for scripting against the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoProjectContext,
    ConfigParseError,
    QueryFailed,
    FetchFailed,
    ItemNotInCatalog,
    UpdateFailed,
    InvalidOperation,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoProjectContext => "E1001",
            Self::ConfigParseError => "E1002",
            Self::QueryFailed => "E2001",
            Self::FetchFailed => "E2002",
            Self::ItemNotInCatalog => "E2003",
            Self::UpdateFailed => "E3001",
            Self::InvalidOperation => "E4001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoProjectContext => "No project context",
            Self::ConfigParseError => "Config file parse error",
            Self::QueryFailed => "Work item query failed",
            Self::FetchFailed => "Work item fetch failed",
            Self::ItemNotInCatalog => "Work item not in catalog",
            Self::UpdateFailed => "Work item update failed",
            Self::InvalidOperation => "Operation not allowed in current state",
        }
    }

    /// Optional remediation hint that can be surfaced to users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NoProjectContext => {
                Some("Pass --project, set TAGDESK_PROJECT, or set connection.project in config.")
            }
            Self::ConfigParseError => Some("Fix syntax in tagdesk/config.toml and retry."),
            Self::QueryFailed | Self::FetchFailed => {
                Some("Check the organization URL and access token, then reload.")
            }
            Self::ItemNotInCatalog => {
                Some("Only Epic and Issue items of the current project can be edited.")
            }
            Self::UpdateFailed => Some("Your pending tags were kept; retry the save."),
            Self::InvalidOperation => Some("Select a work item before editing or saving tags."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures surfaced by the catalog loader and the tag edit session.
///
/// Remote failures carry the rendered cause as text so the error can be kept
/// in session state and shown later.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("the host reported no project context")]
    NoProjectContext,

    #[error("work item query failed: {0}")]
    Query(String),

    #[error("work item fetch failed: {0}")]
    Fetch(String),

    #[error("work item {id} is not in the current catalog")]
    ItemNotInCatalog { id: WorkItemId },

    #[error("failed to update tags on work item {id}: {message}")]
    Update { id: WorkItemId, message: String },

    #[error("cannot {operation} while {state}")]
    InvalidOperation {
        operation: &'static str,
        state: &'static str,
    },
}

impl SessionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoProjectContext => ErrorCode::NoProjectContext,
            Self::Query(_) => ErrorCode::QueryFailed,
            Self::Fetch(_) => ErrorCode::FetchFailed,
            Self::ItemNotInCatalog { .. } => ErrorCode::ItemNotInCatalog,
            Self::Update { .. } => ErrorCode::UpdateFailed,
            Self::InvalidOperation { .. } => ErrorCode::InvalidOperation,
        }
    }

    /// Remediation text for the error's code.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.code().hint().unwrap_or_default().to_string()
    }
}
