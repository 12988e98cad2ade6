//! `tagdesk show`: display one catalog entry.

use anyhow::Result;
use chrono::Local;
use clap::Args;
use std::io::{self, Write};
use tagdesk_core::SessionError;
use tagdesk_core::model::WorkItemId;

use crate::backend::BackendOptions;
use crate::cmd::list::ItemRow;
use crate::cmd::{ready_session, report};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Work item ID.
    pub id: u32,
}

fn write_detail(row: &ItemRow, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("#{} {}", row.id, row.title))?;
    pretty_kv(w, "Type", &row.work_item_type)?;
    pretty_kv(w, "State", &row.state)?;
    pretty_kv(w, "Tags", row.joined_tags())?;
    pretty_kv(w, "Area", &row.area_path)?;
    pretty_kv(w, "Iteration", &row.iteration_path)?;
    if let Some(changed) = row.changed_date {
        pretty_kv(
            w,
            "Changed",
            changed.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        )?;
    }
    pretty_rule(w)
}

/// Execute `tagdesk show <id>`.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the id is not in it.
pub fn run_show(args: &ShowArgs, options: &BackendOptions, output: OutputMode) -> Result<()> {
    let id = WorkItemId(args.id);
    let session = ready_session(options, output)?;
    let Some(item) = session.catalog().get(id) else {
        return Err(report(output, SessionError::ItemNotInCatalog { id }));
    };

    let row = ItemRow::from(item);
    render(output, &row, write_detail)
}
