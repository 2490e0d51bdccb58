//! Schema replay.
//!
//! Applies operations to a snapshot to reconstruct the schema they produce.
//! Replaying a diff's operations on its `old` snapshot must give a schema
//! equivalent to `new`, and replaying the inverses in reverse order must give
//! back `old`.

use crate::error::{MigrateError, Result};
use crate::operations::Operation;
use crate::schema::{Column, Schema, Table};

/// Reconstructs a schema by replaying operations.
#[derive(Debug, Default)]
pub struct SchemaState {
    schema: Schema,
}

impl SchemaState {
    /// Starts from an existing snapshot.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// Returns the current schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Consumes and returns the schema.
    #[must_use]
    pub fn into_schema(self) -> Schema {
        self.schema
    }

    /// Applies operations in order.
    pub fn apply_all<'a>(
        &mut self,
        operations: impl IntoIterator<Item = &'a Operation>,
    ) -> Result<()> {
        for operation in operations {
            self.apply_operation(operation)?;
        }
        Ok(())
    }

    /// Applies a single operation.
    pub fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        let tables = self.schema.tables_mut();
        match operation {
            Operation::CreateTable { table } => {
                if tables.contains_key(&table.name) {
                    return Err(MigrateError::InvalidState(format!(
                        "Table '{}' already exists",
                        table.name
                    )));
                }
                tables.insert(table.name.clone(), table.clone());
            }

            Operation::DropTable { table } => {
                tables.remove(&table.name).ok_or_else(|| missing_table(&table.name))?;
            }

            Operation::AddColumn { table, column } => {
                let t = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
                if t.get_column(&column.name).is_some() {
                    return Err(MigrateError::InvalidState(format!(
                        "Column '{}' already exists in table '{}'",
                        column.name, table
                    )));
                }
                t.columns.push(column.clone());
            }

            Operation::DropColumn { table, column } => {
                let t = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
                let idx = t
                    .columns
                    .iter()
                    .position(|c| c.name == column.name)
                    .ok_or_else(|| missing_column(table, &column.name))?;
                t.columns.remove(idx);
            }

            Operation::AlterColumnType {
                table, column, to, ..
            } => {
                column_mut(tables.get_mut(table), table, column)?.data_type = *to;
            }

            Operation::AlterColumnNullability {
                table, column, to, ..
            } => {
                column_mut(tables.get_mut(table), table, column)?.nullable = *to;
            }

            Operation::AlterColumnDefault {
                table, column, to, ..
            } => {
                column_mut(tables.get_mut(table), table, column)?.default = to.clone();
            }
        }
        Ok(())
    }
}

fn column_mut<'a>(table: Option<&'a mut Table>, table_name: &str, column: &str) -> Result<&'a mut Column> {
    table
        .ok_or_else(|| missing_table(table_name))?
        .columns
        .iter_mut()
        .find(|c| c.name == column)
        .ok_or_else(|| missing_column(table_name, column))
}

fn missing_table(name: &str) -> MigrateError {
    MigrateError::InvalidState(format!("Table '{name}' does not exist"))
}

fn missing_column(table: &str, column: &str) -> MigrateError {
    MigrateError::InvalidState(format!(
        "Column '{column}' does not exist in table '{table}'"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogicalType;

    fn base() -> Schema {
        Schema::new().table(
            Table::new("users").column(Column::new("id", LogicalType::Integer).not_null()),
        )
    }

    #[test]
    fn test_apply_add_and_alter() {
        let mut state = SchemaState::new(base());
        state
            .apply_all(&[
                Operation::add_column("users", Column::new("email", LogicalType::Text)),
                Operation::AlterColumnType {
                    table: "users".to_string(),
                    column: "id".to_string(),
                    from: LogicalType::Integer,
                    to: LogicalType::BigInt,
                },
            ])
            .unwrap();

        let users = state.schema().get_table("users").unwrap();
        assert_eq!(users.columns.len(), 2);
        assert_eq!(users.get_column("id").unwrap().data_type, LogicalType::BigInt);
    }

    #[test]
    fn test_create_existing_table_fails() {
        let mut state = SchemaState::new(base());
        let err = state
            .apply_operation(&Operation::create_table(Table::new("users")))
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidState(_)));
    }

    #[test]
    fn test_drop_missing_column_fails() {
        let mut state = SchemaState::new(base());
        let err = state
            .apply_operation(&Operation::drop_column(
                "users",
                Column::new("email", LogicalType::Text),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("Column 'email' does not exist"));
    }

    #[test]
    fn test_drop_table() {
        let mut state = SchemaState::new(base());
        let users = state.schema().get_table("users").unwrap().clone();
        state.apply_operation(&Operation::drop_table(users)).unwrap();
        assert!(state.into_schema().is_empty());
    }
}
