//! Safety classification of operations.
//!
//! Every operation is either `safe` (additive, or loosening a constraint) or
//! `destructive` (may lose data or fail against existing rows). The verdict is
//! a pure function of the operation and is kept next to it rather than inside.

use std::fmt;

use serde::Serialize;

use crate::operations::Operation;

/// Safety verdict for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Safety {
    /// Cannot lose data.
    Safe,
    /// Can lose or reject existing data.
    Destructive,
}

impl Safety {
    /// Returns the lowercase name of this verdict.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Destructive => "destructive",
        }
    }
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict plus the rationale behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Safe or destructive.
    pub safety: Safety,
    /// Why.
    pub reason: String,
}

impl Classification {
    fn safe(reason: &str) -> Self {
        Self {
            safety: Safety::Safe,
            reason: reason.to_string(),
        }
    }

    fn destructive(reason: &str) -> Self {
        Self {
            safety: Safety::Destructive,
            reason: reason.to_string(),
        }
    }

    /// Returns whether the verdict is destructive.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.safety == Safety::Destructive
    }
}

/// Classifies a single operation.
#[must_use]
pub fn classify(op: &Operation) -> Classification {
    match op {
        Operation::CreateTable { .. } => Classification::safe("additive"),
        Operation::AddColumn { column, .. } if column.fills_existing_rows() => {
            Classification::safe("additive, no data loss")
        }
        Operation::AddColumn { .. } => Classification::destructive(
            "non-null column without default would fail on existing rows / requires backfill",
        ),
        Operation::DropTable { .. } => {
            Classification::destructive("drops table; irreversible data loss")
        }
        Operation::DropColumn { .. } => {
            Classification::destructive("drops column containing data; irreversible data loss")
        }
        Operation::AlterColumnType { .. } => {
            Classification::destructive("type change may truncate or reject existing data")
        }
        Operation::AlterColumnNullability { to: false, .. } => {
            Classification::destructive("setting NOT NULL may fail on existing null rows")
        }
        Operation::AlterColumnNullability { .. } => Classification::safe("loosens constraint"),
        Operation::AlterColumnDefault { .. } => {
            Classification::safe("default change does not affect existing rows")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, DefaultValue, LogicalType, Table};

    fn nullability(from: bool, to: bool) -> Operation {
        Operation::AlterColumnNullability {
            table: "users".to_string(),
            column: "email".to_string(),
            from,
            to,
        }
    }

    #[test]
    fn test_additive_operations_are_safe() {
        let create = Operation::create_table(Table::new("users"));
        assert_eq!(classify(&create).safety, Safety::Safe);

        let nullable = Operation::add_column("users", Column::new("email", LogicalType::Text));
        assert_eq!(classify(&nullable).safety, Safety::Safe);

        let defaulted = Operation::add_column(
            "users",
            Column::new("active", LogicalType::Boolean)
                .not_null()
                .default(DefaultValue::Bool(true)),
        );
        assert_eq!(classify(&defaulted).safety, Safety::Safe);
    }

    #[test]
    fn test_required_column_without_default_is_destructive() {
        let op = Operation::add_column(
            "users",
            Column::new("email", LogicalType::Text).not_null(),
        );
        let classification = classify(&op);
        assert!(classification.is_destructive());
        assert!(classification.reason.contains("backfill"));
    }

    #[test]
    fn test_drops_are_destructive() {
        let table = Operation::drop_table(Table::new("logs"));
        assert!(classify(&table).is_destructive());

        let column = Operation::drop_column("users", Column::new("email", LogicalType::Text));
        let classification = classify(&column);
        assert!(classification.is_destructive());
        assert!(classification.reason.contains("drops column containing data"));
    }

    #[test]
    fn test_nullability_direction() {
        assert!(classify(&nullability(true, false)).is_destructive());
        assert_eq!(classify(&nullability(false, true)).safety, Safety::Safe);
    }

    #[test]
    fn test_type_and_default_changes() {
        let ty = Operation::AlterColumnType {
            table: "users".to_string(),
            column: "id".to_string(),
            from: LogicalType::BigInt,
            to: LogicalType::Integer,
        };
        assert!(classify(&ty).is_destructive());

        let default = Operation::AlterColumnDefault {
            table: "users".to_string(),
            column: "active".to_string(),
            from: Some(DefaultValue::Bool(true)),
            to: None,
        };
        assert_eq!(classify(&default).safety, Safety::Safe);
    }

    #[test]
    fn test_safety_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Safety::Destructive).unwrap(),
            "\"destructive\""
        );
    }
}
