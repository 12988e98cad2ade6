//! `tagdesk list`: print the project's catalog, most recently changed first.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use tagdesk_core::model::{TAG_DELIMITER, WorkItem};

use crate::backend::BackendOptions;
use crate::cmd::ready_session;
use crate::output::{OutputMode, Renderable, render_list};

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only show items carrying this tag (exact match).
    #[arg(long)]
    pub tag: Option<String>,
}

/// One catalog row as rendered by `list` and `show`.
#[derive(Debug, Clone, Serialize)]
pub struct ItemRow {
    pub id: u32,
    #[serde(rename = "type")]
    pub work_item_type: String,
    pub title: String,
    pub state: String,
    pub tags: Vec<String>,
    pub area_path: String,
    pub iteration_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_date: Option<DateTime<Utc>>,
}

impl From<&WorkItem> for ItemRow {
    fn from(item: &WorkItem) -> Self {
        Self {
            id: item.id.get(),
            work_item_type: item.work_item_type.to_string(),
            title: item.title.clone(),
            state: item.state.clone(),
            tags: item.tag_set().iter().map(str::to_string).collect(),
            area_path: item.area_path.clone(),
            iteration_path: item.iteration_path.clone(),
            changed_date: item.changed_date,
        }
    }
}

impl ItemRow {
    pub fn joined_tags(&self) -> String {
        self.tags.join(TAG_DELIMITER)
    }
}

impl Renderable for ItemRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let tags = if self.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", self.tags.join("] ["))
        };
        writeln!(
            w,
            "{:<6} #{:<6} {:<10} {}{tags}",
            self.work_item_type, self.id, self.state, self.title
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.work_item_type,
            self.id,
            self.title,
            self.state,
            self.joined_tags(),
            self.area_path,
            self.iteration_path
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["TYPE", "ID", "TITLE", "STATE", "TAGS", "AREA", "ITERATION"]
    }
}

/// Execute `tagdesk list`.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or output fails.
pub fn run_list(args: &ListArgs, options: &BackendOptions, output: OutputMode) -> Result<()> {
    let session = ready_session(options, output)?;
    let rows = filter_rows(session.catalog().iter(), args.tag.as_deref());
    tracing::debug!(count = rows.len(), "listing catalog");
    render_list(&rows, output)?;
    Ok(())
}

fn filter_rows<'a>(items: impl Iterator<Item = &'a WorkItem>, tag: Option<&str>) -> Vec<ItemRow> {
    items
        .filter(|item| tag.is_none_or(|t| item.tag_set().contains(t)))
        .map(ItemRow::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagdesk_core::model::{WorkItemId, WorkItemType};

    fn item(id: u32, tags: &str) -> WorkItem {
        WorkItem {
            id: WorkItemId(id),
            work_item_type: WorkItemType::Epic,
            title: format!("Epic {id}"),
            state: "New".into(),
            tags: tags.into(),
            area_path: "A".into(),
            iteration_path: "I".into(),
            changed_date: None,
        }
    }

    #[test]
    fn tag_filter_is_exact() {
        let items = [item(1, "bug; p1"), item(2, "bugfix"), item(3, "")];
        let rows = filter_rows(items.iter(), Some("bug"));
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), [1]);
        assert_eq!(filter_rows(items.iter(), None).len(), 3);
    }

    #[test]
    fn text_row_is_tab_separated_in_header_order() {
        let row = ItemRow::from(&item(4, "a; b"));
        let mut out = Vec::new();
        row.render_table(&mut out).expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "Epic\t4\tEpic 4\tNew\ta; b\tA\tI\n");
    }

    #[test]
    fn json_row_lists_tags() {
        let row = ItemRow::from(&item(4, "a; b"));
        let mut out = Vec::new();
        row.render_json(&mut out).expect("render");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["type"], "Epic");
        assert_eq!(value["tags"], serde_json::json!(["a", "b"]));
        assert!(value.get("changed_date").is_none());
    }
}
