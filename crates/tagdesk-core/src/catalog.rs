//! Work item catalog loading.
//!
//! A catalog is the ordered snapshot of the active project's Epics and Issues,
//! most recently changed first. It is always replaced whole, never patched.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::host::{HostEnvironment, ProjectName};
use crate::model::{Field, WorkItem, WorkItemId, WorkItemType};
use crate::store::WorkItemQueryService;
use crate::wiql::WiqlQuery;

/// Work item types a catalog is restricted to.
pub const CATALOG_TYPES: [WorkItemType; 2] = [WorkItemType::Epic, WorkItemType::Issue];

/// Read-only, ordered list of work item snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    items: Vec<WorkItem>,
}

impl Catalog {
    #[must_use]
    pub const fn new(items: Vec<WorkItem>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn get(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[WorkItem] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a WorkItem;
    type IntoIter = std::slice::Iter<'a, WorkItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Ask the host for the active project.
///
/// # Errors
///
/// Returns [`SessionError::NoProjectContext`] if the host has no project or
/// reports an empty name, or could not be asked.
pub fn resolve_project<H: HostEnvironment + ?Sized>(host: &H) -> Result<ProjectName, SessionError> {
    match host.resolve_project_context() {
        Ok(Some(ctx)) if !ctx.name.trim().is_empty() => Ok(ProjectName::new(ctx.name)),
        Ok(_) => Err(SessionError::NoProjectContext),
        Err(err) => {
            warn!("host failed to resolve project context: {err:#}");
            Err(SessionError::NoProjectContext)
        }
    }
}

/// Query and hydrate the catalog for `project`.
///
/// An empty query result yields an empty catalog without a fetch call.
/// Fetched records are reordered to the query's order; ids the fetch did not
/// return are dropped.
///
/// # Errors
///
/// Returns [`SessionError::Query`] if the identity query fails and
/// [`SessionError::Fetch`] if the batched fetch fails.
pub fn load_catalog<S: WorkItemQueryService + ?Sized>(
    store: &S,
    project: &ProjectName,
) -> Result<Catalog, SessionError> {
    let query = WiqlQuery::recently_changed(project.as_str(), &CATALOG_TYPES);
    let refs = store
        .query_by_wiql(&query, project.as_str())
        .map_err(|err| SessionError::Query(format!("{err:#}")))?;

    if refs.is_empty() {
        debug!(project = %project, "catalog query returned no work items");
        return Ok(Catalog::default());
    }

    let ids: Vec<WorkItemId> = refs.iter().map(|r| r.id).collect();
    let fetched = store
        .get_work_items(&ids, &Field::ALL)
        .map_err(|err| SessionError::Fetch(format!("{err:#}")))?;

    let mut by_id: HashMap<WorkItemId, WorkItem> =
        fetched.into_iter().map(|item| (item.id, item)).collect();
    let items: Vec<WorkItem> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

    if items.len() < ids.len() {
        warn!(
            requested = ids.len(),
            returned = items.len(),
            "fetch returned fewer work items than the query"
        );
    }
    debug!(project = %project, count = items.len(), "catalog loaded");

    Ok(Catalog::new(items))
}
