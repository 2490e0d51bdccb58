//! Reversible SQL migrations from schema snapshots.
//!
//! `oxide-schemadiff` compares two declarative snapshots of tables and columns
//! (a "current" and a "target" state) and generates a forward (UP) script and
//! its structural inverse (DOWN) for PostgreSQL or SQLite.
//!
//! # Architecture
//!
//! - **Schema** - typed snapshots parsed and validated from JSON
//! - **Diff** - ordered structural operations between two snapshots
//! - **Safety** - classifies each operation as safe or destructive
//! - **Dialect** - renders operations into UP/DOWN SQL, or reports them unsupported
//! - **Assembler** - runs the pipeline and enforces the destructive-operation gate
//!
//! # Example
//!
//! ```rust
//! use oxide_schemadiff::prelude::*;
//! use serde_json::json;
//!
//! let old = Schema::parse(&json!({"tables": {"users": {"columns": [
//!     {"name": "id", "type": "integer", "nullable": false}
//! ]}}})).unwrap();
//! let new = Schema::parse(&json!({"tables": {"users": {"columns": [
//!     {"name": "id", "type": "integer", "nullable": false},
//!     {"name": "email", "type": "text", "nullable": true}
//! ]}}})).unwrap();
//!
//! let doc = assemble(&old, &new, Dialect::Postgres, false).unwrap();
//! assert_eq!(doc.up, vec!["ALTER TABLE users ADD COLUMN email text;"]);
//! assert_eq!(doc.down, vec!["ALTER TABLE users DROP COLUMN email;"]);
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the migration for PostgreSQL
//! oxide-schemadiff --from-file current.json --to-file target.json --dialect postgres
//!
//! # Show planned operations and their safety without generating SQL
//! oxide-schemadiff --from-file current.json --to-file target.json --dialect sqlite --dry-run
//!
//! # Permit drops and narrowing changes
//! oxide-schemadiff --from-file current.json --to-file target.json --dialect postgres \
//!     --allow-destructive --out migration.sql
//! ```

pub mod assembler;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod operations;
pub mod safety;
pub mod schema;
pub mod state;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::assembler::{
        DryRunRecord, DryRunSummary, MigrationDocument, MigrationPlan, PlannedOperation,
        assemble, dry_run, plan,
    };
    pub use crate::dialect::{
        Dialect, MigrationDialect, PostgresDialect, Rendered, RenderedStatementPair,
        SqliteDialect,
    };
    pub use crate::diff::{DiffWarning, SchemaDiff, diff, diff_schemas};
    pub use crate::error::{
        BlockedOperation, MigrateError, Result, SafetyError, ValidationError,
        ValidationErrorKind,
    };
    pub use crate::operations::{Operation, OperationKind};
    pub use crate::safety::{Classification, Safety, classify};
    pub use crate::schema::{Column, DefaultValue, LogicalType, Schema, Table};
    pub use crate::state::SchemaState;
}
