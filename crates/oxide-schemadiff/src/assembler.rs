//! Migration assembly.
//!
//! Runs the pipeline `diff -> classify -> gate -> render -> assemble` over two
//! parsed snapshots. The DOWN script is never re-diffed: it is the `down_sql`
//! of each rendered operation, taken in reverse operation order.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dialect::{Dialect, Rendered};
use crate::diff::{DiffWarning, diff_schemas};
use crate::error::{BlockedOperation, SafetyError};
use crate::operations::{Operation, OperationKind};
use crate::safety::{Classification, Safety, classify};
use crate::schema::Schema;

/// An operation together with its safety classification.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOperation {
    /// The structural change.
    pub operation: Operation,
    /// Its verdict.
    pub classification: Classification,
}

/// Classified operations plus diff warnings, before rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    /// Operations in execution order.
    pub operations: Vec<PlannedOperation>,
    /// Constraint changes the diff could not express.
    pub warnings: Vec<DiffWarning>,
}

impl MigrationPlan {
    /// Returns the destructive operations, in plan order.
    pub fn destructive(&self) -> impl Iterator<Item = &PlannedOperation> {
        self.operations
            .iter()
            .filter(|p| p.classification.is_destructive())
    }

    /// Fails with [`SafetyError::DestructiveBlocked`] when destructive operations
    /// are present and not allowed.
    pub fn check_gate(&self, allow_destructive: bool) -> Result<(), SafetyError> {
        if allow_destructive {
            return Ok(());
        }
        let blocked: Vec<BlockedOperation> = self
            .destructive()
            .map(|p| BlockedOperation {
                kind: p.operation.kind(),
                table: p.operation.table().to_string(),
                column: p.operation.column().map(str::to_string),
                reason: p.classification.reason.clone(),
            })
            .collect();
        if blocked.is_empty() {
            return Ok(());
        }
        for b in &blocked {
            warn!(operation = %b, "destructive operation blocked");
        }
        Err(SafetyError::DestructiveBlocked { blocked })
    }

    /// Renders every operation for `dialect`, collecting unsupported ones as
    /// warnings.
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> MigrationDocument {
        let renderer = dialect.renderer();
        let mut up = Vec::new();
        let mut down = Vec::new();
        let mut warnings: Vec<String> = self.warnings.iter().map(ToString::to_string).collect();

        for planned in &self.operations {
            let op = &planned.operation;
            if planned.classification.is_destructive() {
                warnings.push(format!(
                    "destructive operation included: {op} ({})",
                    planned.classification.reason
                ));
            }
            match renderer.render(op) {
                Rendered::Statements(pair) => {
                    debug!(operation = %op, dialect = %dialect, "rendered operation");
                    up.push(pair.up_sql);
                    down.push(pair.down_sql);
                }
                Rendered::Unsupported { note } => {
                    warn!(operation = %op, dialect = %dialect, "operation unsupported");
                    warnings.push(format!("unsupported {}: {note}", op.kind()));
                }
            }
        }
        down.reverse();

        MigrationDocument {
            dialect,
            up,
            down,
            warnings,
        }
    }
}

/// Diffs and classifies; the first two stages of every run.
#[must_use]
pub fn plan(old: &Schema, new: &Schema) -> MigrationPlan {
    let diff = diff_schemas(old, new);
    let operations: Vec<PlannedOperation> = diff
        .operations
        .into_iter()
        .map(|operation| {
            let classification = classify(&operation);
            PlannedOperation {
                operation,
                classification,
            }
        })
        .collect();

    info!(
        operations = operations.len(),
        destructive = operations
            .iter()
            .filter(|p| p.classification.is_destructive())
            .count(),
        warnings = diff.warnings.len(),
        "classified schema changes"
    );

    MigrationPlan {
        operations,
        warnings: diff.warnings,
    }
}

/// Generates the migration document, applying the destructive-operation gate.
pub fn assemble(
    old: &Schema,
    new: &Schema,
    dialect: Dialect,
    allow_destructive: bool,
) -> Result<MigrationDocument, SafetyError> {
    let plan = plan(old, new);
    plan.check_gate(allow_destructive)?;
    let document = plan.render(dialect);
    info!(
        dialect = %dialect,
        up = document.up.len(),
        warnings = document.warnings.len(),
        "assembled migration"
    );
    Ok(document)
}

/// Reports the planned operations without rendering any SQL.
#[must_use]
pub fn dry_run(old: &Schema, new: &Schema) -> DryRunSummary {
    DryRunSummary::from_plan(&plan(old, new))
}

/// One line of a dry-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunRecord {
    /// Operation kind.
    pub operation_kind: OperationKind,
    /// Table the operation touches.
    pub table: String,
    /// Column the operation touches, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Safety verdict.
    pub safety: Safety,
    /// Why.
    pub reason: String,
}

/// Dry-run report: one record per operation plus totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunSummary {
    /// Records in plan order.
    pub records: Vec<DryRunRecord>,
    /// Number of operations per kind.
    pub by_kind: BTreeMap<OperationKind, usize>,
    /// Number of destructive operations.
    pub destructive: usize,
    /// Constraint warnings from the diff.
    pub warnings: Vec<String>,
}

impl DryRunSummary {
    fn from_plan(plan: &MigrationPlan) -> Self {
        let records: Vec<DryRunRecord> = plan
            .operations
            .iter()
            .map(|p| DryRunRecord {
                operation_kind: p.operation.kind(),
                table: p.operation.table().to_string(),
                column: p.operation.column().map(str::to_string),
                safety: p.classification.safety,
                reason: p.classification.reason.clone(),
            })
            .collect();

        let mut by_kind = BTreeMap::new();
        for record in &records {
            *by_kind.entry(record.operation_kind).or_insert(0) += 1;
        }

        Self {
            destructive: plan.destructive().count(),
            by_kind,
            records,
            warnings: plan.warnings.iter().map(ToString::to_string).collect(),
        }
    }

    /// Serializes the records as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }
}

impl fmt::Display for DryRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dry-run summary:")?;
        writeln!(f, "  total_operations: {}", self.records.len())?;
        for (kind, count) in &self.by_kind {
            writeln!(f, "  {kind}: {count}")?;
        }
        writeln!(f, "  destructive_operations: {}", self.destructive)?;
        if !self.records.is_empty() {
            writeln!(f, "Operations:")?;
        }
        for record in &self.records {
            let target = match &record.column {
                Some(column) => format!("{}.{}", record.table, column),
                None => record.table.clone(),
            };
            writeln!(
                f,
                "  [{}] {} {} ({})",
                record.safety, record.operation_kind, target, record.reason
            )?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {warning}")?;
        }
        Ok(())
    }
}

/// Final output: UP and DOWN statements plus warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDocument {
    /// Target dialect.
    pub dialect: Dialect,
    /// Forward statements in operation order.
    pub up: Vec<String>,
    /// Backward statements in reverse operation order.
    pub down: Vec<String>,
    /// Unsupported, destructive and constraint notices.
    pub warnings: Vec<String>,
}

impl MigrationDocument {
    /// Returns true if there is nothing to migrate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty()
    }
}

impl fmt::Display for MigrationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- Generated by oxide-schemadiff ({})", self.dialect)?;
        writeln!(f, "-- UP")?;
        for statement in &self.up {
            writeln!(f, "{statement}")?;
        }
        writeln!(f)?;
        writeln!(f, "-- DOWN")?;
        for statement in &self.down {
            writeln!(f, "{statement}")?;
        }
        Ok(())
    }
}
