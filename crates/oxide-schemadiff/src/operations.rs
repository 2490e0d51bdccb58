//! Migration operations.
//!
//! An [`Operation`] is one atomic structural change between two snapshots. Each
//! variant carries enough data to render both directions: drops keep the full
//! definition of what they remove and alterations keep the before and after
//! values.

use std::fmt;

use serde::Serialize;

use crate::schema::{Column, DefaultValue, LogicalType, Table};

/// Discriminant of an [`Operation`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// `CREATE TABLE`.
    CreateTable,
    /// `DROP TABLE`.
    DropTable,
    /// `ADD COLUMN`.
    AddColumn,
    /// `DROP COLUMN`.
    DropColumn,
    /// Column type change.
    AlterColumnType,
    /// Column NULL / NOT NULL change.
    AlterColumnNullability,
    /// Column default change.
    AlterColumnDefault,
}

impl OperationKind {
    /// Returns the snake_case name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTable => "create_table",
            Self::DropTable => "drop_table",
            Self::AddColumn => "add_column",
            Self::DropColumn => "drop_column",
            Self::AlterColumnType => "alter_column_type",
            Self::AlterColumnNullability => "alter_column_nullability",
            Self::AlterColumnDefault => "alter_column_default",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structural change.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a new table.
    CreateTable {
        /// Full table definition.
        table: Table,
    },

    /// Drop a table.
    DropTable {
        /// Definition of the table being dropped.
        table: Table,
    },

    /// Add a column to a table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: Column,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Table name.
        table: String,
        /// Definition of the column being dropped.
        column: Column,
    },

    /// Change a column's data type.
    AlterColumnType {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Type before the change.
        from: LogicalType,
        /// Type after the change.
        to: LogicalType,
    },

    /// Change whether a column accepts NULL.
    AlterColumnNullability {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Nullability before the change.
        from: bool,
        /// Nullability after the change.
        to: bool,
    },

    /// Set, change, or drop a column default.
    AlterColumnDefault {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Default before the change.
        from: Option<DefaultValue>,
        /// Default after the change.
        to: Option<DefaultValue>,
    },
}

impl Operation {
    /// Creates a CreateTable operation.
    #[must_use]
    pub fn create_table(table: Table) -> Self {
        Self::CreateTable { table }
    }

    /// Creates a DropTable operation.
    #[must_use]
    pub fn drop_table(table: Table) -> Self {
        Self::DropTable { table }
    }

    /// Creates an AddColumn operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: Column) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a DropColumn operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: Column) -> Self {
        Self::DropColumn {
            table: table.into(),
            column,
        }
    }

    /// Returns the kind of this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateTable { .. } => OperationKind::CreateTable,
            Self::DropTable { .. } => OperationKind::DropTable,
            Self::AddColumn { .. } => OperationKind::AddColumn,
            Self::DropColumn { .. } => OperationKind::DropColumn,
            Self::AlterColumnType { .. } => OperationKind::AlterColumnType,
            Self::AlterColumnNullability { .. } => OperationKind::AlterColumnNullability,
            Self::AlterColumnDefault { .. } => OperationKind::AlterColumnDefault,
        }
    }

    /// Returns the name of the table this operation touches.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table } | Self::DropTable { table } => &table.name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AlterColumnType { table, .. }
            | Self::AlterColumnNullability { table, .. }
            | Self::AlterColumnDefault { table, .. } => table,
        }
    }

    /// Returns the name of the column this operation touches, if any.
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::CreateTable { .. } | Self::DropTable { .. } => None,
            Self::AddColumn { column, .. } | Self::DropColumn { column, .. } => Some(&column.name),
            Self::AlterColumnType { column, .. }
            | Self::AlterColumnNullability { column, .. }
            | Self::AlterColumnDefault { column, .. } => Some(column),
        }
    }

    /// Returns `table` or `table.column`.
    #[must_use]
    pub fn target(&self) -> String {
        match self.column() {
            Some(column) => format!("{}.{}", self.table(), column),
            None => self.table().to_string(),
        }
    }

    /// Returns the operation that undoes this one.
    ///
    /// Every operation is reversible because drops and alterations carry the
    /// state they replace.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::CreateTable { table } => Self::drop_table(table.clone()),
            Self::DropTable { table } => Self::create_table(table.clone()),
            Self::AddColumn { table, column } => Self::drop_column(table.clone(), column.clone()),
            Self::DropColumn { table, column } => Self::add_column(table.clone(), column.clone()),
            Self::AlterColumnType {
                table,
                column,
                from,
                to,
            } => Self::AlterColumnType {
                table: table.clone(),
                column: column.clone(),
                from: *to,
                to: *from,
            },
            Self::AlterColumnNullability {
                table,
                column,
                from,
                to,
            } => Self::AlterColumnNullability {
                table: table.clone(),
                column: column.clone(),
                from: *to,
                to: *from,
            },
            Self::AlterColumnDefault {
                table,
                column,
                from,
                to,
            } => Self::AlterColumnDefault {
                table: table.clone(),
                column: column.clone(),
                from: to.clone(),
                to: from.clone(),
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.target())
    }
}
