//! PostgreSQL dialect for migrations.
//!
//! PostgreSQL alters columns in place, so every operation kind renders
//! directly. The DOWN statement is the rendering of the inverse operation.

use super::{MigrationDialect, Rendered};
use crate::operations::Operation;
use crate::schema::{Column, LogicalType};

/// PostgreSQL migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates the single statement applying `operation`.
    fn statement(&self, operation: &Operation) -> String {
        match operation {
            Operation::CreateTable { table } => self.create_table_sql(table),
            Operation::DropTable { table } => self.drop_table_sql(&table.name),
            Operation::AddColumn { table, column } => self.add_column_sql(table, column),
            Operation::DropColumn { table, column } => self.drop_column_sql(table, &column.name),
            Operation::AlterColumnType {
                table, column, to, ..
            } => self.alter_column_sql(table, column, &format!("TYPE {}", self.type_name(to))),
            Operation::AlterColumnNullability {
                table, column, to, ..
            } => {
                let change = if *to { "DROP NOT NULL" } else { "SET NOT NULL" };
                self.alter_column_sql(table, column, change)
            }
            Operation::AlterColumnDefault {
                table, column, to, ..
            } => {
                let change = match to {
                    Some(default) => format!("SET DEFAULT {}", self.default_sql(default)),
                    None => "DROP DEFAULT".to_string(),
                };
                self.alter_column_sql(table, column, &change)
            }
        }
    }

    fn alter_column_sql(&self, table: &str, column: &str, change: &str) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} {};",
            self.quote_identifier(table),
            self.quote_identifier(column),
            change
        )
    }
}

impl MigrationDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn render(&self, operation: &Operation) -> Rendered {
        Rendered::pair(
            self.statement(operation),
            self.statement(&operation.inverse()),
        )
    }

    fn type_name(&self, data_type: &LogicalType) -> String {
        match data_type {
            LogicalType::Integer => "integer".to_string(),
            LogicalType::BigInt => "bigint".to_string(),
            LogicalType::SmallInt => "smallint".to_string(),
            LogicalType::Real => "real".to_string(),
            LogicalType::Double => "double precision".to_string(),
            LogicalType::Numeric => "numeric".to_string(),
            LogicalType::Text => "text".to_string(),
            LogicalType::Varchar(len) => format!("varchar({len})"),
            LogicalType::Boolean => "boolean".to_string(),
            LogicalType::Date => "date".to_string(),
            LogicalType::Time => "time".to_string(),
            LogicalType::Timestamp => "timestamp".to_string(),
            LogicalType::Uuid => "uuid".to_string(),
            LogicalType::Json => "jsonb".to_string(),
            LogicalType::Blob => "bytea".to_string(),
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    fn column_type(&self, column: &Column) -> String {
        // Auto-increment maps onto the serial pseudo-types.
        match (column.autoincrement, column.data_type) {
            (true, LogicalType::SmallInt) => "smallserial".to_string(),
            (true, LogicalType::Integer) => "serial".to_string(),
            (true, LogicalType::BigInt) => "bigserial".to_string(),
            (_, ty) => self.type_name(&ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::RenderedStatementPair;
    use crate::schema::{DefaultValue, Table};

    fn dialect() -> PostgresDialect {
        PostgresDialect::new()
    }

    fn pair(op: &Operation) -> RenderedStatementPair {
        match dialect().render(op) {
            Rendered::Statements(pair) => pair,
            Rendered::Unsupported { note } => panic!("Expected statements, got: {note}"),
        }
    }

    #[test]
    fn test_add_nullable_column() {
        let op = Operation::add_column("users", Column::new("email", LogicalType::Text));
        let sql = pair(&op);
        assert_eq!(sql.up_sql, "ALTER TABLE users ADD COLUMN email text;");
        assert_eq!(sql.down_sql, "ALTER TABLE users DROP COLUMN email;");
    }

    #[test]
    fn test_create_table() {
        let table = Table::new("users")
            .column(Column::new("id", LogicalType::BigInt).autoincrement())
            .column(Column::new("email", LogicalType::Varchar(255)).not_null())
            .column(
                Column::new("active", LogicalType::Boolean)
                    .not_null()
                    .default(DefaultValue::Bool(true)),
            )
            .primary_key(["id"])
            .unique(["email"]);
        let sql = pair(&Operation::create_table(table));
        assert_eq!(
            sql.up_sql,
            "CREATE TABLE users (\n  id bigserial NOT NULL,\n  email varchar(255) NOT NULL,\n  \
             active boolean NOT NULL DEFAULT TRUE,\n  PRIMARY KEY (id),\n  UNIQUE (email)\n);"
        );
        assert_eq!(sql.down_sql, "DROP TABLE users;");
    }

    #[test]
    fn test_drop_table_restores_definition() {
        let table = Table::new("logs").column(Column::new("line", LogicalType::Text));
        let sql = pair(&Operation::drop_table(table));
        assert_eq!(sql.up_sql, "DROP TABLE logs;");
        assert_eq!(sql.down_sql, "CREATE TABLE logs (\n  line text\n);");
    }

    #[test]
    fn test_drop_column_restores_definition() {
        let op = Operation::drop_column(
            "users",
            Column::new("email", LogicalType::Text)
                .not_null()
                .default(DefaultValue::String("none".to_string())),
        );
        let sql = pair(&op);
        assert_eq!(sql.up_sql, "ALTER TABLE users DROP COLUMN email;");
        assert_eq!(
            sql.down_sql,
            "ALTER TABLE users ADD COLUMN email text NOT NULL DEFAULT 'none';"
        );
    }

    #[test]
    fn test_alter_type() {
        let op = Operation::AlterColumnType {
            table: "users".to_string(),
            column: "score".to_string(),
            from: LogicalType::Integer,
            to: LogicalType::Double,
        };
        let sql = pair(&op);
        assert_eq!(
            sql.up_sql,
            "ALTER TABLE users ALTER COLUMN score TYPE double precision;"
        );
        assert_eq!(sql.down_sql, "ALTER TABLE users ALTER COLUMN score TYPE integer;");
    }

    #[test]
    fn test_alter_nullability() {
        let op = Operation::AlterColumnNullability {
            table: "users".to_string(),
            column: "email".to_string(),
            from: true,
            to: false,
        };
        let sql = pair(&op);
        assert_eq!(sql.up_sql, "ALTER TABLE users ALTER COLUMN email SET NOT NULL;");
        assert_eq!(sql.down_sql, "ALTER TABLE users ALTER COLUMN email DROP NOT NULL;");
    }

    #[test]
    fn test_alter_default() {
        let op = Operation::AlterColumnDefault {
            table: "events".to_string(),
            column: "at".to_string(),
            from: None,
            to: Some(DefaultValue::Expression("CURRENT_TIMESTAMP".to_string())),
        };
        let sql = pair(&op);
        assert_eq!(
            sql.up_sql,
            "ALTER TABLE events ALTER COLUMN at SET DEFAULT CURRENT_TIMESTAMP;"
        );
        assert_eq!(sql.down_sql, "ALTER TABLE events ALTER COLUMN at DROP DEFAULT;");
    }

    #[test]
    fn test_quotes_reserved_names() {
        let op = Operation::add_column("order", Column::new("Total", LogicalType::Numeric));
        let sql = pair(&op);
        assert_eq!(sql.up_sql, "ALTER TABLE \"order\" ADD COLUMN \"Total\" numeric;");
    }
}
