//! SQLite dialect for migrations.
//!
//! SQLite has limited ALTER TABLE support. Tables can be created and dropped,
//! and columns that existing rows can receive can be added; everything else
//! needs the "table recreation" strategy: create a new table, copy data,
//! drop the old table, rename the new table. Those operations are reported
//! as unsupported instead of being rendered incorrectly.

use super::{MigrationDialect, Rendered};
use crate::operations::Operation;
use crate::schema::{DefaultValue, LogicalType};

/// SQLite migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn table_rebuild(action: &str, operation: &Operation) -> Rendered {
        Rendered::Unsupported {
            note: format!(
                "sqlite cannot {action} in place ({}); write a manual table rebuild \
                 migration: create a new table, copy the rows, drop the old table, \
                 rename the new table",
                operation.target()
            ),
        }
    }
}

impl MigrationDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn render(&self, operation: &Operation) -> Rendered {
        match operation {
            Operation::CreateTable { table } => {
                Rendered::pair(self.create_table_sql(table), self.drop_table_sql(&table.name))
            }

            Operation::DropTable { table } => {
                Rendered::pair(self.drop_table_sql(&table.name), self.create_table_sql(table))
            }

            Operation::AddColumn { column, .. } if column.autoincrement => {
                Self::table_rebuild("add a primary key column", operation)
            }

            Operation::AddColumn { column, .. }
                if column.default.as_ref().is_some_and(DefaultValue::is_expression) =>
            {
                Self::table_rebuild("add a column with a non-constant default", operation)
            }

            // Dropping a plain column that was just added works on SQLite 3.35.0+.
            Operation::AddColumn { table, column } if column.fills_existing_rows() => {
                Rendered::pair(
                    self.add_column_sql(table, column),
                    self.drop_column_sql(table, &column.name),
                )
            }

            Operation::AddColumn { .. } => {
                Self::table_rebuild("add a NOT NULL column without a default", operation)
            }

            Operation::DropColumn { .. } => Self::table_rebuild("drop a column", operation),

            Operation::AlterColumnType { .. } => {
                Self::table_rebuild("change a column type", operation)
            }

            Operation::AlterColumnNullability { .. } => {
                Self::table_rebuild("change column nullability", operation)
            }

            Operation::AlterColumnDefault { .. } => {
                Self::table_rebuild("change a column default", operation)
            }
        }
    }

    fn type_name(&self, data_type: &LogicalType) -> String {
        match data_type {
            LogicalType::Integer | LogicalType::SmallInt | LogicalType::BigInt => {
                "integer".to_string()
            }
            LogicalType::Boolean => "integer".to_string(), // SQLite stores booleans as 0/1
            LogicalType::Real | LogicalType::Double => "real".to_string(),
            LogicalType::Numeric => "numeric".to_string(),
            LogicalType::Text | LogicalType::Varchar(_) => "text".to_string(),
            LogicalType::Date | LogicalType::Time | LogicalType::Timestamp => "text".to_string(),
            LogicalType::Uuid | LogicalType::Json => "text".to_string(),
            LogicalType::Blob => "blob".to_string(),
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn inlines_autoincrement_key(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};

    fn dialect() -> SqliteDialect {
        SqliteDialect::new()
    }

    fn note(op: &Operation) -> String {
        match dialect().render(op) {
            Rendered::Unsupported { note } => note,
            Rendered::Statements(pair) => panic!("Expected unsupported, got {pair:?}"),
        }
    }

    #[test]
    fn test_create_table_autoincrement() {
        let table = Table::new("users")
            .column(Column::new("id", LogicalType::Integer).autoincrement())
            .column(Column::new("name", LogicalType::Varchar(255)).not_null())
            .primary_key(["id"]);

        match dialect().render(&Operation::create_table(table)) {
            Rendered::Statements(pair) => {
                assert_eq!(
                    pair.up_sql,
                    "CREATE TABLE users (\n  id integer PRIMARY KEY AUTOINCREMENT NOT NULL,\n  \
                     name text NOT NULL\n);"
                );
                assert_eq!(pair.down_sql, "DROP TABLE users;");
            }
            Rendered::Unsupported { note } => panic!("{note}"),
        }
    }

    #[test]
    fn test_create_table_composite_key() {
        let table = Table::new("memberships")
            .column(Column::new("user_id", LogicalType::Integer).not_null())
            .column(Column::new("group_id", LogicalType::Integer).not_null())
            .primary_key(["user_id", "group_id"]);

        let Rendered::Statements(pair) = dialect().render(&Operation::create_table(table)) else {
            panic!("Expected statements");
        };
        assert!(pair.up_sql.contains("PRIMARY KEY (user_id, group_id)"));
    }

    #[test]
    fn test_add_column_with_default() {
        let op = Operation::add_column(
            "users",
            Column::new("is_active", LogicalType::Boolean)
                .not_null()
                .default(DefaultValue::Bool(true)),
        );

        let Rendered::Statements(pair) = dialect().render(&op) else {
            panic!("Expected statements");
        };
        assert_eq!(
            pair.up_sql,
            "ALTER TABLE users ADD COLUMN is_active integer NOT NULL DEFAULT 1;"
        );
        assert_eq!(pair.down_sql, "ALTER TABLE users DROP COLUMN is_active;");
    }

    #[test]
    fn test_add_required_column_unsupported() {
        let op = Operation::add_column("users", Column::new("email", LogicalType::Text).not_null());
        assert!(note(&op).contains("NOT NULL column without a default"));
    }

    #[test]
    fn test_add_column_with_current_default_unsupported() {
        let op = Operation::add_column(
            "customers",
            Column::new("joined_at", LogicalType::Timestamp)
                .default(DefaultValue::Expression("CURRENT_TIMESTAMP".to_string())),
        );
        let note = note(&op);
        assert!(note.contains("non-constant default"));
        assert!(note.contains("customers.joined_at"));
    }

    #[test]
    fn test_add_autoincrement_column_unsupported() {
        let op = Operation::add_column(
            "t",
            Column::new("id", LogicalType::Integer)
                .autoincrement()
                .default(DefaultValue::Integer(0)),
        );
        assert!(note(&op).contains("primary key column"));
    }

    #[test]
    fn test_drop_column_unsupported() {
        let op = Operation::drop_column("users", Column::new("email", LogicalType::Text));
        let note = note(&op);
        assert!(note.contains("users.email"));
        assert!(note.contains("table rebuild"));
    }

    #[test]
    fn test_alterations_unsupported() {
        let ops = [
            Operation::AlterColumnType {
                table: "users".to_string(),
                column: "id".to_string(),
                from: LogicalType::Integer,
                to: LogicalType::Text,
            },
            Operation::AlterColumnNullability {
                table: "users".to_string(),
                column: "id".to_string(),
                from: false,
                to: true,
            },
            Operation::AlterColumnDefault {
                table: "users".to_string(),
                column: "id".to_string(),
                from: None,
                to: Some(DefaultValue::Integer(0)),
            },
        ];
        for op in &ops {
            assert!(!dialect().render(op).is_supported(), "{op} should be unsupported");
        }
    }

    #[test]
    fn test_type_names() {
        let d = dialect();
        assert_eq!(d.type_name(&LogicalType::BigInt), "integer");
        assert_eq!(d.type_name(&LogicalType::Varchar(255)), "text");
        assert_eq!(d.type_name(&LogicalType::Boolean), "integer");
        assert_eq!(d.type_name(&LogicalType::Timestamp), "text");
        assert_eq!(d.type_name(&LogicalType::Blob), "blob");
    }
}
