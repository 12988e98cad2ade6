use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::tags::TagSet;

/// Store-assigned work item identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub u32);

impl WorkItemId {
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WorkItemId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Work item type as named by the store's process template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkItemType {
    Epic,
    Issue,
    Other(String),
}

impl WorkItemType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Epic => "Epic",
            Self::Issue => "Issue",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for WorkItemType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Epic" => Self::Epic,
            "Issue" => Self::Issue,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for WorkItemType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<WorkItemType> for String {
    fn from(value: WorkItemType) -> Self {
        match value {
            WorkItemType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields tagdesk reads from or writes to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    WorkItemType,
    State,
    Tags,
    AreaPath,
    IterationPath,
    ChangedDate,
}

impl Field {
    /// Every field hydrated for a catalog row.
    pub const ALL: [Self; 8] = [
        Self::Id,
        Self::Title,
        Self::WorkItemType,
        Self::State,
        Self::Tags,
        Self::AreaPath,
        Self::IterationPath,
        Self::ChangedDate,
    ];

    /// Reference name used by the store's REST and query APIs.
    #[must_use]
    pub const fn reference_name(self) -> &'static str {
        match self {
            Self::Id => "System.Id",
            Self::Title => "System.Title",
            Self::WorkItemType => "System.WorkItemType",
            Self::State => "System.State",
            Self::Tags => "System.Tags",
            Self::AreaPath => "System.AreaPath",
            Self::IterationPath => "System.IterationPath",
            Self::ChangedDate => "System.ChangedDate",
        }
    }

    /// JSON-Patch path addressing this field on a work item.
    #[must_use]
    pub fn patch_path(self) -> String {
        format!("/fields/{}", self.reference_name())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reference_name())
    }
}

/// An immutable snapshot of one work item as last read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    #[serde(rename = "type")]
    pub work_item_type: WorkItemType,
    pub title: String,
    pub state: String,
    /// Raw stored tag string, `"; "`-delimited.
    pub tags: String,
    pub area_path: String,
    pub iteration_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_date: Option<DateTime<Utc>>,
}

impl WorkItem {
    /// The stored tags parsed into a set.
    #[must_use]
    pub fn tag_set(&self) -> TagSet {
        TagSet::parse(&self.tags)
    }
}

/// Wire shape of a work item: an id plus a map of field reference names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkItemRecord {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<u32>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl WorkItemRecord {
    /// Raw value of a field, if the store returned it.
    #[must_use]
    pub fn field(&self, field: Field) -> Option<&Value> {
        self.fields.get(field.reference_name())
    }

    /// String value of a field. Missing, null, and non-string values read as empty.
    #[must_use]
    pub fn text(&self, field: Field) -> &str {
        self.field(field).and_then(Value::as_str).unwrap_or_default()
    }

    /// Convert into the typed snapshot.
    ///
    /// The store omits `System.Tags` entirely when an item has no tags, which
    /// reads as the empty tag string.
    #[must_use]
    pub fn into_work_item(self) -> WorkItem {
        let changed_date = self
            .field(Field::ChangedDate)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        WorkItem {
            id: WorkItemId(self.id),
            work_item_type: WorkItemType::from(self.text(Field::WorkItemType)),
            title: self.text(Field::Title).to_string(),
            state: self.text(Field::State).to_string(),
            tags: self.text(Field::Tags).to_string(),
            area_path: self.text(Field::AreaPath).to_string(),
            iteration_path: self.text(Field::IterationPath).to_string(),
            changed_date,
        }
    }
}

impl From<WorkItemRecord> for WorkItem {
    fn from(record: WorkItemRecord) -> Self {
        record.into_work_item()
    }
}
