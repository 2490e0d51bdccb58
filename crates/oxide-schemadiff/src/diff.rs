//! Schema diff engine.
//!
//! Compares an "old" (current) and "new" (target) [`Schema`] and produces the
//! ordered operations that migrate from old to new:
//!
//! 1. `CreateTable` for tables only in new, alphabetical.
//! 2. `AddColumn` and `AlterColumn*` for shared tables, tables alphabetical,
//!    columns in the declaration order of new. Type, nullability and default
//!    changes are separate operations, in that order.
//! 3. `DropColumn` for shared tables, tables alphabetical, columns in the
//!    declaration order of old.
//! 4. `DropTable` for tables only in old, alphabetical.
//!
//! Columns are matched by name only, so a renamed column shows up as a
//! `DropColumn` plus an `AddColumn`.

use std::fmt;

use tracing::debug;

use crate::operations::Operation;
use crate::schema::{Column, Schema, Table};

/// Changes the diff engine detected but cannot express as an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffWarning {
    /// The primary key of a shared table changed.
    PrimaryKeyChange {
        /// Table name.
        table: String,
        /// Primary key columns before.
        old: Vec<String>,
        /// Primary key columns after.
        new: Vec<String>,
    },
    /// A column's autoincrement flag changed.
    AutoincrementChange {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// New value of the flag.
        new_value: bool,
    },
    /// The unique constraints of a shared table changed.
    UniqueConstraintsChange {
        /// Table name.
        table: String,
        /// Unique constraints before.
        old: Vec<Vec<String>>,
        /// Unique constraints after.
        new: Vec<Vec<String>>,
    },
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryKeyChange { table, old, new } => write!(
                f,
                "primary key of '{table}' changed from ({}) to ({}); \
                 not migrated, requires a manual table rebuild",
                old.join(", "),
                new.join(", ")
            ),
            Self::AutoincrementChange {
                table,
                column,
                new_value,
            } => write!(
                f,
                "autoincrement of '{table}.{column}' changed to {new_value}; \
                 not migrated, requires a manual table rebuild"
            ),
            Self::UniqueConstraintsChange { table, old, new } => write!(
                f,
                "unique constraints of '{table}' changed from [{}] to [{}]; not migrated",
                format_groups(old),
                format_groups(new)
            ),
        }
    }
}

fn format_groups(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .map(|g| format!("({})", g.join(", ")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    /// The operations to apply, in execution order.
    pub operations: Vec<Operation>,
    /// Constraint changes that were not turned into operations.
    pub warnings: Vec<DiffWarning>,
}

impl SchemaDiff {
    /// Returns `true` if there are no operations and no warnings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.warnings.is_empty()
    }
}

/// Compares two snapshots and returns the ordered operations from `old` to `new`.
#[must_use]
pub fn diff(old: &Schema, new: &Schema) -> Vec<Operation> {
    diff_schemas(old, new).operations
}

/// Compares two snapshots, returning operations and constraint warnings.
#[must_use]
pub fn diff_schemas(old: &Schema, new: &Schema) -> SchemaDiff {
    let mut creates = Vec::new();
    let mut changes = Vec::new();
    let mut column_drops = Vec::new();
    let mut warnings = Vec::new();

    for new_table in new.tables() {
        match old.get_table(&new_table.name) {
            None => creates.push(Operation::create_table(new_table.clone())),
            Some(old_table) => {
                debug!(table = %new_table.name, "diffing table");
                changes.extend(diff_columns(old_table, new_table));
                column_drops.extend(
                    old_table
                        .columns
                        .iter()
                        .filter(|c| new_table.get_column(&c.name).is_none())
                        .map(|c| Operation::drop_column(&old_table.name, c.clone())),
                );
                warnings.extend(constraint_drift(old_table, new_table));
            }
        }
    }

    let table_drops = old
        .tables()
        .filter(|t| new.get_table(&t.name).is_none())
        .map(|t| Operation::drop_table(t.clone()));

    let mut operations = creates;
    operations.extend(changes);
    operations.extend(column_drops);
    operations.extend(table_drops);

    SchemaDiff {
        operations,
        warnings,
    }
}

/// Additions and alterations for a shared table, in the column order of `new`.
fn diff_columns(old: &Table, new: &Table) -> Vec<Operation> {
    let mut operations = Vec::new();
    for column in &new.columns {
        match old.get_column(&column.name) {
            None => operations.push(Operation::add_column(&new.name, column.clone())),
            Some(old_column) => operations.extend(diff_column(&new.name, old_column, column)),
        }
    }
    operations
}

/// One operation per differing attribute, never merged.
fn diff_column(table: &str, old: &Column, new: &Column) -> Vec<Operation> {
    let mut operations = Vec::new();

    if old.data_type != new.data_type {
        operations.push(Operation::AlterColumnType {
            table: table.to_string(),
            column: new.name.clone(),
            from: old.data_type,
            to: new.data_type,
        });
    }

    if old.nullable != new.nullable {
        operations.push(Operation::AlterColumnNullability {
            table: table.to_string(),
            column: new.name.clone(),
            from: old.nullable,
            to: new.nullable,
        });
    }

    if old.default != new.default {
        operations.push(Operation::AlterColumnDefault {
            table: table.to_string(),
            column: new.name.clone(),
            from: old.default.clone(),
            to: new.default.clone(),
        });
    }

    operations
}

fn constraint_drift(old: &Table, new: &Table) -> Vec<DiffWarning> {
    let mut warnings = Vec::new();

    if old.primary_key != new.primary_key {
        warnings.push(DiffWarning::PrimaryKeyChange {
            table: new.name.clone(),
            old: old.primary_key.clone(),
            new: new.primary_key.clone(),
        });
    }

    for column in &new.columns {
        if let Some(old_column) = old.get_column(&column.name) {
            if old_column.autoincrement != column.autoincrement {
                warnings.push(DiffWarning::AutoincrementChange {
                    table: new.name.clone(),
                    column: column.name.clone(),
                    new_value: column.autoincrement,
                });
            }
        }
    }

    if old.unique != new.unique {
        warnings.push(DiffWarning::UniqueConstraintsChange {
            table: new.name.clone(),
            old: old.unique.clone(),
            new: new.unique.clone(),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::OperationKind;
    use crate::schema::{DefaultValue, LogicalType};

    fn users_v1() -> Table {
        Table::new("users")
            .column(Column::new("id", LogicalType::Integer).not_null())
            .column(Column::new("name", LogicalType::Text))
            .primary_key(["id"])
    }

    fn kinds(ops: &[Operation]) -> Vec<(OperationKind, String)> {
        ops.iter().map(|op| (op.kind(), op.target())).collect()
    }

    #[test]
    fn test_identical_schemas_produce_nothing() {
        let schema = Schema::new().table(users_v1());
        let result = diff_schemas(&schema, &schema);
        assert!(result.is_empty());
    }

    #[test]
    fn test_create_and_drop_tables_sorted() {
        let old = Schema::new()
            .table(Table::new("zeta"))
            .table(Table::new("alpha"))
            .table(users_v1());
        let new = Schema::new()
            .table(Table::new("gamma"))
            .table(Table::new("beta"))
            .table(users_v1());

        assert_eq!(
            kinds(&diff(&old, &new)),
            vec![
                (OperationKind::CreateTable, "beta".to_string()),
                (OperationKind::CreateTable, "gamma".to_string()),
                (OperationKind::DropTable, "alpha".to_string()),
                (OperationKind::DropTable, "zeta".to_string()),
            ]
        );
    }

    #[test]
    fn test_column_changes_are_independent() {
        let old = Schema::new().table(users_v1());
        let new = Schema::new().table(
            Table::new("users")
                .column(Column::new("id", LogicalType::Integer).not_null())
                .column(
                    Column::new("name", LogicalType::Varchar(100))
                        .not_null()
                        .default(DefaultValue::String("anon".to_string())),
                )
                .primary_key(["id"]),
        );

        assert_eq!(
            kinds(&diff(&old, &new)),
            vec![
                (OperationKind::AlterColumnType, "users.name".to_string()),
                (OperationKind::AlterColumnNullability, "users.name".to_string()),
                (OperationKind::AlterColumnDefault, "users.name".to_string()),
            ]
        );
    }

    #[test]
    fn test_phase_ordering() {
        let old = Schema::new()
            .table(users_v1())
            .table(
                Table::new("posts")
                    .column(Column::new("id", LogicalType::Integer).not_null())
                    .column(Column::new("body", LogicalType::Text)),
            )
            .table(Table::new("logs").column(Column::new("line", LogicalType::Text)));
        let new = Schema::new()
            .table(
                Table::new("users")
                    .column(Column::new("id", LogicalType::BigInt).not_null())
                    .column(Column::new("email", LogicalType::Text))
                    .primary_key(["id"]),
            )
            .table(
                Table::new("posts")
                    .column(Column::new("id", LogicalType::Integer).not_null())
                    .column(Column::new("title", LogicalType::Text)),
            )
            .table(Table::new("audit").column(Column::new("entry", LogicalType::Text)));

        assert_eq!(
            kinds(&diff(&old, &new)),
            vec![
                (OperationKind::CreateTable, "audit".to_string()),
                (OperationKind::AddColumn, "posts.title".to_string()),
                (OperationKind::AlterColumnType, "users.id".to_string()),
                (OperationKind::AddColumn, "users.email".to_string()),
                (OperationKind::DropColumn, "posts.body".to_string()),
                (OperationKind::DropColumn, "users.name".to_string()),
                (OperationKind::DropTable, "logs".to_string()),
            ]
        );
    }

    #[test]
    fn test_rename_is_drop_plus_add() {
        let old = Schema::new().table(users_v1());
        let new = Schema::new().table(
            Table::new("users")
                .column(Column::new("id", LogicalType::Integer).not_null())
                .column(Column::new("full_name", LogicalType::Text))
                .primary_key(["id"]),
        );

        assert_eq!(
            kinds(&diff(&old, &new)),
            vec![
                (OperationKind::AddColumn, "users.full_name".to_string()),
                (OperationKind::DropColumn, "users.name".to_string()),
            ]
        );
    }

    #[test]
    fn test_drop_carries_definitions() {
        let old = Schema::new().table(users_v1());
        let new = Schema::new();
        match diff(&old, &new).as_slice() {
            [Operation::DropTable { table }] => assert_eq!(table, &users_v1()),
            other => panic!("Expected a single DropTable, got {other:?}"),
        }
    }

    #[test]
    fn test_constraint_drift_warns() {
        let old = Schema::new().table(users_v1());
        let new = Schema::new().table(users_v1().primary_key(["id", "name"]).unique(["name"]));
        let result = diff_schemas(&old, &new);

        assert!(result.operations.is_empty());
        assert_eq!(result.warnings.len(), 2);
        assert!(matches!(
            result.warnings[0],
            DiffWarning::PrimaryKeyChange { .. }
        ));
        assert!(result.warnings[1].to_string().contains("unique constraints of 'users'"));
    }
}
