//! Database dialect implementations.
//!
//! Each dialect turns an [`Operation`] into a forward and a backward statement,
//! or reports that it cannot express the operation. Unsupported operations are
//! a normal result, never an error.

mod postgres;
mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::operations::Operation;
use crate::schema::{Column, DefaultValue, LogicalType, Table};

/// Forward and backward SQL for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStatementPair {
    /// Statement applying the operation.
    pub up_sql: String,
    /// Statement undoing the operation.
    pub down_sql: String,
}

/// Outcome of rendering one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// The dialect can express the operation.
    Statements(RenderedStatementPair),
    /// The dialect cannot; `note` explains what to do instead.
    Unsupported {
        /// Explanation for the user.
        note: String,
    },
}

impl Rendered {
    /// Wraps a statement pair.
    #[must_use]
    pub fn pair(up_sql: impl Into<String>, down_sql: impl Into<String>) -> Self {
        Self::Statements(RenderedStatementPair {
            up_sql: up_sql.into(),
            down_sql: down_sql.into(),
        })
    }

    /// Returns whether the operation could be rendered.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Statements(_))
    }
}

/// Words that must be quoted when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "asc", "by", "case", "check", "column", "constraint", "create", "default",
    "delete", "desc", "distinct", "drop", "else", "end", "foreign", "from", "group", "having",
    "in", "index", "insert", "into", "is", "join", "key", "limit", "not", "null", "on", "or",
    "order", "primary", "references", "select", "set", "table", "then", "to", "union", "unique",
    "update", "user", "using", "values", "when", "where",
];

/// Trait for database-specific SQL generation.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Renders an operation into its UP and DOWN statements.
    fn render(&self, operation: &Operation) -> Rendered;

    /// Returns the SQL type name for the given logical type.
    fn type_name(&self, data_type: &LogicalType) -> String;

    /// Returns the literal for a boolean default.
    fn bool_literal(&self, value: bool) -> &'static str;

    /// Returns the type used in a column definition.
    fn column_type(&self, column: &Column) -> String {
        self.type_name(&column.data_type)
    }

    /// Whether an autoincrement column carries its primary key inline.
    fn inlines_autoincrement_key(&self) -> bool {
        false
    }

    /// Quotes an identifier when it is not a plain lowercase name.
    fn quote_identifier(&self, name: &str) -> String {
        let plain = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if plain && !RESERVED_WORDS.contains(&name) {
            name.to_string()
        } else {
            format!("\"{}\"", name.replace('"', "\"\""))
        }
    }

    /// Renders a default value literal.
    fn default_sql(&self, default: &DefaultValue) -> String {
        match default {
            DefaultValue::Bool(b) => self.bool_literal(*b).to_string(),
            other => other.to_string(),
        }
    }

    /// Generates column definition SQL.
    fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![
            self.quote_identifier(&column.name),
            self.column_type(column),
        ];

        if column.autoincrement && self.inlines_autoincrement_key() {
            parts.push("PRIMARY KEY AUTOINCREMENT".to_string());
        }

        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }

        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {}", self.default_sql(default)));
        }

        parts.join(" ")
    }

    /// Generates SQL for creating a table.
    fn create_table_sql(&self, table: &Table) -> String {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        let key_inline =
            self.inlines_autoincrement_key() && table.columns.iter().any(|c| c.autoincrement);
        if !table.primary_key.is_empty() && !key_inline {
            lines.push(format!("PRIMARY KEY ({})", self.column_list(&table.primary_key)));
        }

        for group in &table.unique {
            lines.push(format!("UNIQUE ({})", self.column_list(group)));
        }

        format!(
            "CREATE TABLE {} (\n  {}\n);",
            self.quote_identifier(&table.name),
            lines.join(",\n  ")
        )
    }

    /// Generates SQL for dropping a table.
    fn drop_table_sql(&self, name: &str) -> String {
        format!("DROP TABLE {};", self.quote_identifier(name))
    }

    /// Generates SQL for adding a column.
    fn add_column_sql(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {};",
            self.quote_identifier(table),
            self.column_definition(column)
        )
    }

    /// Generates SQL for dropping a column.
    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {};",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Comma-separated quoted column names.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Supported target dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL.
    #[value(alias = "postgresql", alias = "pg")]
    Postgres,
    /// SQLite.
    Sqlite,
}

static POSTGRES: PostgresDialect = PostgresDialect;
static SQLITE: SqliteDialect = SqliteDialect;

impl Dialect {
    /// Returns the renderer for this dialect.
    #[must_use]
    pub fn renderer(self) -> &'static dyn MigrationDialect {
        match self {
            Self::Postgres => &POSTGRES,
            Self::Sqlite => &SQLITE,
        }
    }

    /// Returns the dialect name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.renderer().name()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!(
                "unknown dialect '{other}' (expected 'postgres' or 'sqlite')"
            )),
        }
    }
}
