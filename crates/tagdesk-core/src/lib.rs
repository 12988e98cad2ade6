//! tagdesk-core library.
//!
//! Loads a project's Epics and Issues from a work item store and drives the
//! tag edit session over them.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` at store and host boundaries, [`SessionError`]
//!   for everything the session reports.
//! - **Logging**: `tracing` macros; the binary decides where they go.

pub mod catalog;
pub mod config;
pub mod error;
pub mod host;
pub mod memory;
pub mod model;
pub mod session;
pub mod store;
pub mod wiql;

pub use catalog::{Catalog, load_catalog, resolve_project};
pub use error::{ErrorCode, SessionError};
pub use host::{HostEnvironment, ProjectContext, ProjectName};
pub use session::{SaveOutcome, SessionEvent, SessionPhase, TagEditSession};
pub use store::{WorkItemQueryService, WorkItemStore, WorkItemUpdateService};
