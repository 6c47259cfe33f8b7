use std::fmt;

use chrono::{DateTime, Utc};

use super::key::TableSchema;

/// Lifecycle state of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    Other(String),
}

/// What the database reports about an existing table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescription {
    pub table_name: String,
    pub schema: TableSchema,
    pub status: TableStatus,
    /// False while any secondary index is still being built.
    pub indexes_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub item_count: i64,
}

impl TableDescription {
    /// True once the table and all of its indexes accept reads and writes.
    pub fn is_ready(&self) -> bool {
        self.status == TableStatus::Active && self.indexes_active
    }

    fn created_display(&self) -> String {
        self.created_at
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl fmt::Display for TableDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} items)",
            self.table_name,
            self.created_display(),
            self.item_count
        )
    }
}

/// Renders a listing of tables, names padded to the longest one.
pub fn format_summary(tables: &[TableDescription]) -> String {
    let width = tables
        .iter()
        .map(|t| t.table_name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::from("Dynamesa Tables:");
    for table in tables {
        out.push_str(&format!(
            "\n  {:<width$}  ({}, {} items)",
            table.table_name,
            table.created_display(),
            table.item_count,
            width = width
        ));
    }
    out
}
