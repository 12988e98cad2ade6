//! Contracts for the remote work item store.
//!
//! Reads are two-phase: a lightweight query returns identities only, then a
//! batched fetch hydrates the fields for exactly those identities. Writes are
//! JSON-Patch operation lists applied to a single item.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Field, WorkItem, WorkItemId};
use crate::wiql::WiqlQuery;

/// One row of a query result: identity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemReference {
    pub id: WorkItemId,
}

/// JSON-Patch operation kinds understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
    Test,
}

/// A single JSON-Patch operation against a work item document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

impl PatchOperation {
    /// Replace a field's whole value.
    pub fn replace_field(field: Field, value: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: field.patch_path(),
            value: Value::String(value.into()),
        }
    }

    /// The target field, if the path addresses one.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.path.strip_prefix("/fields/")
    }
}

/// Read side of the store.
pub trait WorkItemQueryService {
    /// Run a query scoped to `project`, returning identities in query order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the query or is unreachable.
    fn query_by_wiql(
        &self,
        query: &WiqlQuery,
        project: &str,
    ) -> anyhow::Result<Vec<WorkItemReference>>;

    /// Fetch full records for `ids` in one batched call.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be fetched.
    fn get_work_items(&self, ids: &[WorkItemId], fields: &[Field]) -> anyhow::Result<Vec<WorkItem>>;
}

/// Write side of the store.
pub trait WorkItemUpdateService {
    /// Apply `patch` to item `id`, returning the updated record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects or fails the update.
    fn update_work_item(&self, patch: &[PatchOperation], id: WorkItemId)
    -> anyhow::Result<WorkItem>;
}

/// A store that can both read and write.
pub trait WorkItemStore: WorkItemQueryService + WorkItemUpdateService {}

impl<T: WorkItemQueryService + WorkItemUpdateService> WorkItemStore for T {}

impl<T: WorkItemQueryService + ?Sized> WorkItemQueryService for Box<T> {
    fn query_by_wiql(
        &self,
        query: &WiqlQuery,
        project: &str,
    ) -> anyhow::Result<Vec<WorkItemReference>> {
        (**self).query_by_wiql(query, project)
    }

    fn get_work_items(&self, ids: &[WorkItemId], fields: &[Field]) -> anyhow::Result<Vec<WorkItem>> {
        (**self).get_work_items(ids, fields)
    }
}

impl<T: WorkItemUpdateService + ?Sized> WorkItemUpdateService for Box<T> {
    fn update_work_item(
        &self,
        patch: &[PatchOperation],
        id: WorkItemId,
    ) -> anyhow::Result<WorkItem> {
        (**self).update_work_item(patch, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replace_tags_serializes_as_json_patch() {
        let op = PatchOperation::replace_field(Field::Tags, "bug; p1");
        let value = serde_json::to_value(vec![op]).expect("serialize");
        assert_eq!(
            value,
            json!([{ "op": "replace", "path": "/fields/System.Tags", "value": "bug; p1" }])
        );
    }

    #[test]
    fn field_name_strips_prefix() {
        let op = PatchOperation::replace_field(Field::Title, "x");
        assert_eq!(op.field_name(), Some("System.Title"));
    }

    #[test]
    fn remove_op_omits_null_value() {
        let op = PatchOperation {
            op: PatchOp::Remove,
            path: "/fields/System.Tags".into(),
            value: Value::Null,
        };
        let value = serde_json::to_value(op).expect("serialize");
        assert_eq!(value, json!({ "op": "remove", "path": "/fields/System.Tags" }));
    }
}
