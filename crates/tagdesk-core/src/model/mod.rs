//! Work item and tag data model.

pub mod tags;
pub mod work_item;

pub use tags::{TAG_DELIMITER, TagSet};
pub use work_item::{Field, WorkItem, WorkItemId, WorkItemRecord, WorkItemType};
