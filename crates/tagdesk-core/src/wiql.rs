//! Work Item Query Language (WIQL) construction.
//!
//! Queries are built as typed values and rendered to text only when handed to
//! the store. All string literals go through [`quote_literal`].

use std::fmt;

use crate::model::{Field, WorkItemType};

/// Quote a value as a WIQL string literal.
///
/// Embedded single quotes are doubled, so `O'Brien` becomes `'O''Brien'`.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push('\'');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}

/// A flat query over work items of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiqlQuery {
    pub project: String,
    pub types: Vec<WorkItemType>,
    pub select: Vec<Field>,
    /// Sort field, most recent first.
    pub order_by_desc: Field,
}

impl WiqlQuery {
    /// Identities of the given types in `project`, most recently changed first.
    pub fn recently_changed(project: impl Into<String>, types: &[WorkItemType]) -> Self {
        Self {
            project: project.into(),
            types: types.to_vec(),
            select: vec![Field::Id, Field::Title, Field::WorkItemType],
            order_by_desc: Field::ChangedDate,
        }
    }

    /// True when `ty` passes the type filter.
    #[must_use]
    pub fn accepts_type(&self, ty: &WorkItemType) -> bool {
        self.types.is_empty() || self.types.contains(ty)
    }

    /// Render the WIQL text.
    #[must_use]
    pub fn to_wiql(&self) -> String {
        let columns = self
            .select
            .iter()
            .map(|f| format!("[{}]", f.reference_name()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut text = format!(
            "SELECT {columns}\nFROM WorkItems\nWHERE [{}] = {}",
            "System.TeamProject",
            quote_literal(&self.project)
        );

        if !self.types.is_empty() {
            let types = self
                .types
                .iter()
                .map(|t| quote_literal(t.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str(&format!(
                "\nAND [{}] IN ({types})",
                Field::WorkItemType.reference_name()
            ));
        }

        text.push_str(&format!(
            "\nORDER BY [{}] DESC",
            self.order_by_desc.reference_name()
        ));
        text
    }
}

impl fmt::Display for WiqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wiql())
    }
}
