//! Seeded offline backend for `--demo`.

use tagdesk_core::host::ProjectContext;
use tagdesk_core::memory::MemoryBackend;
use tagdesk_core::model::{WorkItem, WorkItemId, WorkItemType};

pub const DEMO_PROJECT: &str = "Demo";

fn demo_item(id: u32, ty: WorkItemType, title: &str, state: &str, tags: &str) -> WorkItem {
    WorkItem {
        id: WorkItemId(id),
        work_item_type: ty,
        title: title.to_string(),
        state: state.to_string(),
        tags: tags.to_string(),
        area_path: DEMO_PROJECT.to_string(),
        iteration_path: format!("{DEMO_PROJECT}\\Sprint 7"),
        changed_date: None,
    }
}

/// A backend whose host reports `project` (default [`DEMO_PROJECT`]).
///
/// Items are seeded oldest first, so the catalog lists 57 first and 12 last.
pub fn demo_backend(project: Option<&str>) -> MemoryBackend {
    let backend = MemoryBackend::new(Some(ProjectContext::named(
        project.unwrap_or(DEMO_PROJECT),
    )));
    backend.seed(
        DEMO_PROJECT,
        [
            demo_item(12, WorkItemType::Epic, "Checkout redesign", "Doing", "ux; q3"),
            demo_item(17, WorkItemType::Issue, "Payment retries double-charge", "To Do", "bug; p1"),
            demo_item(23, WorkItemType::Other("Task".into()), "Write migration script", "To Do", ""),
            demo_item(31, WorkItemType::Issue, "Dark mode toggle", "To Do", ""),
            demo_item(42, WorkItemType::Issue, "Login fails on Safari", "Doing", "bug"),
            demo_item(57, WorkItemType::Epic, "Observability rollout", "Done", "infra; q4"),
        ],
    );
    backend
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagdesk_core::TagEditSession;

    #[test]
    fn demo_catalog_excludes_tasks() {
        let backend = demo_backend(None);
        let mut session = TagEditSession::new(backend.clone(), backend);
        session.initialize().expect("initialize");
        let ids: Vec<u32> = session.catalog().iter().map(|i| i.id.get()).collect();
        assert_eq!(ids, [57, 42, 31, 17, 12]);
    }

    #[test]
    fn other_project_is_empty() {
        let backend = demo_backend(Some("Elsewhere"));
        let mut session = TagEditSession::new(backend.clone(), backend);
        session.initialize().expect("initialize");
        assert!(session.catalog().is_empty());
    }
}
