//! In-memory host and store.
//!
//! Backs the tests and the CLI's offline demo mode. Every clone shares the
//! same state, so one handle can be given to a session as its host and
//! another as its store while the caller keeps a third for inspection.
//! Failures can be injected per operation.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Duration, Utc};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::host::{HostEnvironment, ProjectContext};
use crate::model::{Field, WorkItem, WorkItemId};
use crate::store::{
    PatchOp, PatchOperation, WorkItemQueryService, WorkItemReference, WorkItemUpdateService,
};
use crate::wiql::WiqlQuery;

/// Timestamp of the first change recorded by a fresh backend.
const EPOCH_SECS: i64 = 1_704_067_200;

/// A recorded call to [`WorkItemUpdateService::update_work_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub id: WorkItemId,
    pub patch: Vec<PatchOperation>,
}

#[derive(Debug, Clone)]
struct StoredItem {
    project: String,
    item: WorkItem,
    changed_seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    project: RefCell<Option<ProjectContext>>,
    items: RefCell<BTreeMap<WorkItemId, StoredItem>>,
    seq: Cell<u64>,
    fail_project: Cell<bool>,
    fail_query: Cell<bool>,
    fail_fetch: Cell<bool>,
    fail_update: Cell<bool>,
    query_calls: Cell<usize>,
    fetch_calls: Cell<usize>,
    updates: RefCell<Vec<UpdateCall>>,
    load_notifications: Cell<usize>,
    resizes: RefCell<Vec<(u16, u16)>>,
}

/// Shared in-memory host environment and work item store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Rc<Inner>,
}

impl MemoryBackend {
    /// A backend whose host reports `project` (or no project).
    #[must_use]
    pub fn new(project: Option<ProjectContext>) -> Self {
        let backend = Self::default();
        backend.set_project(project);
        backend
    }

    pub fn set_project(&self, project: Option<ProjectContext>) {
        *self.inner.project.borrow_mut() = project;
    }

    /// Store `item` under `project`, stamping it as the most recent change.
    pub fn insert(&self, project: &str, mut item: WorkItem) {
        let seq = self.next_seq();
        item.changed_date = Some(changed_at(seq));
        self.inner.items.borrow_mut().insert(
            item.id,
            StoredItem {
                project: project.to_string(),
                item,
                changed_seq: seq,
            },
        );
    }

    /// Store several items in order; the last one ends up most recent.
    pub fn seed(&self, project: &str, items: impl IntoIterator<Item = WorkItem>) {
        for item in items {
            self.insert(project, item);
        }
    }

    /// Current stored snapshot of an item.
    #[must_use]
    pub fn item(&self, id: WorkItemId) -> Option<WorkItem> {
        self.inner
            .items
            .borrow()
            .get(&id)
            .map(|stored| stored.item.clone())
    }

    pub fn fail_project(&self, fail: bool) {
        self.inner.fail_project.set(fail);
    }

    pub fn fail_query(&self, fail: bool) {
        self.inner.fail_query.set(fail);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.inner.fail_fetch.set(fail);
    }

    pub fn fail_update(&self, fail: bool) {
        self.inner.fail_update.set(fail);
    }

    #[must_use]
    pub fn query_calls(&self) -> usize {
        self.inner.query_calls.get()
    }

    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.inner.fetch_calls.get()
    }

    /// Every update attempted so far, including failed ones.
    #[must_use]
    pub fn updates(&self) -> Vec<UpdateCall> {
        self.inner.updates.borrow().clone()
    }

    #[must_use]
    pub fn load_notifications(&self) -> usize {
        self.inner.load_notifications.get()
    }

    #[must_use]
    pub fn resizes(&self) -> Vec<(u16, u16)> {
        self.inner.resizes.borrow().clone()
    }

    fn next_seq(&self) -> u64 {
        let seq = self.inner.seq.get() + 1;
        self.inner.seq.set(seq);
        seq
    }
}

fn changed_at(seq: u64) -> DateTime<Utc> {
    let base = DateTime::from_timestamp(EPOCH_SECS, 0).unwrap_or_default();
    base + Duration::minutes(i64::try_from(seq).unwrap_or(i64::MAX / 60_000))
}

impl HostEnvironment for MemoryBackend {
    fn resolve_project_context(&self) -> Result<Option<ProjectContext>> {
        if self.inner.fail_project.get() {
            bail!("host service unavailable");
        }
        Ok(self.inner.project.borrow().clone())
    }

    fn notify_load_succeeded(&self) {
        let count = self.inner.load_notifications.get();
        self.inner.load_notifications.set(count + 1);
    }

    fn resize(&self, width: u16, height: u16) {
        self.inner.resizes.borrow_mut().push((width, height));
    }
}

impl WorkItemQueryService for MemoryBackend {
    fn query_by_wiql(&self, query: &WiqlQuery, project: &str) -> Result<Vec<WorkItemReference>> {
        self.inner.query_calls.set(self.inner.query_calls.get() + 1);
        if self.inner.fail_query.get() {
            bail!("query service returned HTTP 500");
        }

        let items = self.inner.items.borrow();
        let mut matches: Vec<&StoredItem> = items
            .values()
            .filter(|stored| stored.project == project && stored.project == query.project)
            .filter(|stored| query.accepts_type(&stored.item.work_item_type))
            .collect();
        matches.sort_by(|a, b| {
            b.changed_seq
                .cmp(&a.changed_seq)
                .then_with(|| b.item.id.cmp(&a.item.id))
        });

        Ok(matches
            .into_iter()
            .map(|stored| WorkItemReference { id: stored.item.id })
            .collect())
    }

    fn get_work_items(&self, ids: &[WorkItemId], _fields: &[Field]) -> Result<Vec<WorkItem>> {
        self.inner.fetch_calls.set(self.inner.fetch_calls.get() + 1);
        if self.inner.fail_fetch.get() {
            bail!("batch fetch timed out");
        }

        let items = self.inner.items.borrow();
        Ok(ids
            .iter()
            .filter_map(|id| items.get(id).map(|stored| stored.item.clone()))
            .collect())
    }
}

impl WorkItemUpdateService for MemoryBackend {
    fn update_work_item(&self, patch: &[PatchOperation], id: WorkItemId) -> Result<WorkItem> {
        self.inner.updates.borrow_mut().push(UpdateCall {
            id,
            patch: patch.to_vec(),
        });
        if self.inner.fail_update.get() {
            bail!("update rejected with HTTP 503");
        }

        let seq = self.next_seq();
        let mut items = self.inner.items.borrow_mut();
        let stored = items
            .get_mut(&id)
            .ok_or_else(|| anyhow!("work item {id} does not exist"))?;

        let mut item = stored.item.clone();
        for op in patch {
            apply_operation(&mut item, op)?;
        }
        item.changed_date = Some(changed_at(seq));
        stored.item = item.clone();
        stored.changed_seq = seq;
        Ok(item)
    }
}

fn apply_operation(item: &mut WorkItem, op: &PatchOperation) -> Result<()> {
    let target = match op.field_name() {
        Some(name) if name == Field::Tags.reference_name() => &mut item.tags,
        Some(name) if name == Field::Title.reference_name() => &mut item.title,
        Some(name) if name == Field::State.reference_name() => &mut item.state,
        _ => bail!("unsupported patch path {}", op.path),
    };

    match op.op {
        PatchOp::Add | PatchOp::Replace => {
            let Some(value) = op.value.as_str() else {
                bail!("patch value for {} must be a string", op.path);
            };
            *target = value.to_string();
        }
        PatchOp::Remove => target.clear(),
        PatchOp::Test => {
            if op.value.as_str() != Some(target.as_str()) {
                bail!("test operation failed for {}", op.path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkItemType;

    fn item(id: u32, tags: &str) -> WorkItem {
        WorkItem {
            id: WorkItemId(id),
            work_item_type: WorkItemType::Issue,
            title: format!("item {id}"),
            state: "To Do".into(),
            tags: tags.into(),
            area_path: "P".into(),
            iteration_path: "P".into(),
            changed_date: None,
        }
    }

    #[test]
    fn update_replaces_tags_and_bumps_recency() {
        let backend = MemoryBackend::new(Some(ProjectContext::named("P")));
        backend.seed("P", [item(1, "a"), item(2, "b")]);

        let updated = backend
            .update_work_item(&[PatchOperation::replace_field(Field::Tags, "x; y")], WorkItemId(1))
            .expect("update");
        assert_eq!(updated.tags, "x; y");

        let query = WiqlQuery::recently_changed("P", &[]);
        let order: Vec<u32> = backend
            .query_by_wiql(&query, "P")
            .expect("query")
            .iter()
            .map(|r| r.id.get())
            .collect();
        assert_eq!(order, [1, 2]);
    }

    #[test]
    fn update_of_missing_item_fails() {
        let backend = MemoryBackend::default();
        let result =
            backend.update_work_item(&[PatchOperation::replace_field(Field::Tags, "")], WorkItemId(7));
        assert!(result.is_err());
        assert_eq!(backend.updates().len(), 1);
    }

    #[test]
    fn failed_update_leaves_item_untouched() {
        let backend = MemoryBackend::new(None);
        backend.insert("P", item(1, "keep"));
        backend.fail_update(true);
        let result =
            backend.update_work_item(&[PatchOperation::replace_field(Field::Tags, "lost")], WorkItemId(1));
        assert!(result.is_err());
        assert_eq!(backend.item(WorkItemId(1)).map(|i| i.tags), Some("keep".into()));
    }

    #[test]
    fn clones_share_state() {
        let a = MemoryBackend::new(None);
        let b = a.clone();
        b.notify_load_succeeded();
        b.resize(10, 20);
        assert_eq!(a.load_notifications(), 1);
        assert_eq!(a.resizes(), [(10, 20)]);
    }
}
