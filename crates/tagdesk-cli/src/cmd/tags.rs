//! `tagdesk tags`: edit one work item's tags without the panel.
//!
//! Drives a session exactly as the panel would: select the row, remove
//! tags, add each new tag through the draft input, then save.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use tagdesk_core::model::{TAG_DELIMITER, WorkItemId};
use tracing::{info, warn};

use crate::backend::{BackendOptions, Session};
use crate::cmd::{ready_session, report};
use crate::output::{OutputMode, render};

#[derive(Args, Debug, Default)]
pub struct TagsArgs {
    /// Work item ID.
    pub id: u32,

    /// Tag to add (repeatable).
    #[arg(long = "add", value_name = "TAG")]
    pub add: Vec<String>,

    /// Tag to remove (repeatable, exact match).
    #[arg(long = "remove", value_name = "TAG")]
    pub remove: Vec<String>,

    /// Show the resulting tags without saving.
    #[arg(long)]
    pub dry_run: bool,
}

impl TagsArgs {
    const fn has_edits(&self) -> bool {
        !self.add.is_empty() || !self.remove.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagsAction {
    Current,
    DryRun,
    Saved,
}

#[derive(Debug, Serialize)]
pub struct TagsReport {
    pub id: WorkItemId,
    pub action: TagsAction,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reloaded: Option<bool>,
}

fn write_report(report: &TagsReport, w: &mut dyn Write) -> std::io::Result<()> {
    let joined = report.tags.join(TAG_DELIMITER);
    match report.action {
        TagsAction::Current => writeln!(w, "#{} tags: {joined}", report.id),
        TagsAction::DryRun => writeln!(w, "#{} would have tags: {joined}", report.id),
        TagsAction::Saved => writeln!(w, "✓ saved tags on #{}: {joined}", report.id),
    }
}

fn pending(session: &Session) -> Vec<String> {
    session.pending_tags().iter().map(str::to_string).collect()
}

/// Apply removals then additions to the selected item's pending tags.
fn apply_edits(session: &mut Session, args: &TagsArgs) {
    for tag in &args.remove {
        if !session.remove_tag(tag) {
            warn!(tag = %tag, "tag not present; nothing to remove");
        }
    }
    for tag in &args.add {
        session.set_draft_input(tag.clone());
        if !session.add_draft_tag() {
            warn!(tag = %tag, "tag empty or already present; skipped");
        }
    }
}

/// Execute `tagdesk tags <id>`.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, the id is not in it,
/// or the save fails.
pub fn run_tags(args: &TagsArgs, options: &BackendOptions, output: OutputMode) -> Result<()> {
    let id = WorkItemId(args.id);
    let mut session = ready_session(options, output)?;
    session.select_row(id).map_err(|err| report(output, err))?;

    if !args.has_edits() {
        let current = TagsReport {
            id,
            action: TagsAction::Current,
            tags: pending(&session),
            reloaded: None,
        };
        return render(output, &current, write_report);
    }

    apply_edits(&mut session, args);

    if args.dry_run {
        let preview = TagsReport {
            id,
            action: TagsAction::DryRun,
            tags: pending(&session),
            reloaded: None,
        };
        return render(output, &preview, write_report);
    }

    let tags = pending(&session);
    let outcome = session.save().map_err(|err| report(output, err))?;
    info!(id = %outcome.id, "tags updated");
    if !outcome.reloaded {
        warn!("catalog reload after save failed; the list may be stale");
    }

    let saved = TagsReport {
        id,
        action: TagsAction::Saved,
        tags,
        reloaded: Some(outcome.reloaded),
    };
    render(output, &saved, write_report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_backend;
    use tagdesk_core::TagEditSession;
    use tagdesk_core::host::HostEnvironment;
    use tagdesk_core::store::WorkItemStore;

    fn demo_session() -> Session {
        let backend = demo_backend(None);
        let host: Box<dyn HostEnvironment> = Box::new(backend.clone());
        let store: Box<dyn WorkItemStore> = Box::new(backend);
        let mut session = TagEditSession::new(host, store);
        session.initialize().expect("initialize");
        session
    }

    #[test]
    fn removals_apply_before_additions() {
        let mut session = demo_session();
        session.select_row(WorkItemId(17)).expect("select");
        let args = TagsArgs {
            id: 17,
            add: vec!["p1".into(), "billing".into()],
            remove: vec!["p1".into()],
            dry_run: true,
        };
        apply_edits(&mut session, &args);
        // p1 is removed then re-added at the end.
        assert_eq!(pending(&session), ["bug", "p1", "billing"]);
    }

    #[test]
    fn empty_and_duplicate_additions_are_skipped() {
        let mut session = demo_session();
        session.select_row(WorkItemId(42)).expect("select");
        let args = TagsArgs {
            id: 42,
            add: vec![String::new(), "bug".into()],
            ..TagsArgs::default()
        };
        apply_edits(&mut session, &args);
        assert_eq!(pending(&session), ["bug"]);
    }

    #[test]
    fn report_text_per_action() {
        let mut out = Vec::new();
        let saved = TagsReport {
            id: WorkItemId(5),
            action: TagsAction::Saved,
            tags: vec!["a".into(), "b".into()],
            reloaded: Some(true),
        };
        write_report(&saved, &mut out).expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "✓ saved tags on #5: a; b\n");
    }

    #[test]
    fn report_json_uses_kebab_case_action() {
        let preview = TagsReport {
            id: WorkItemId(5),
            action: TagsAction::DryRun,
            tags: vec![],
            reloaded: None,
        };
        let value = serde_json::to_value(&preview).expect("json");
        assert_eq!(value, serde_json::json!({ "id": 5, "action": "dry-run", "tags": [] }));
    }
}
