//! Schema snapshot types.
//!
//! A [`Schema`] is the typed form of one JSON snapshot. Snapshots are parsed once
//! at the boundary by [`Schema::parse`] and are never mutated afterwards; every
//! structural problem is reported as a [`ValidationError`] carrying the path of
//! the offending table or column.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{MigrateError, Result, ValidationError, ValidationErrorKind};

/// Dialect-neutral column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Small integer (16-bit).
    SmallInt,
    /// Floating point (single precision).
    Real,
    /// Floating point (double precision).
    Double,
    /// Arbitrary precision number.
    Numeric,
    /// Unbounded text.
    Text,
    /// Variable-length character string with a max length.
    Varchar(u32),
    /// Boolean.
    Boolean,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Date and time.
    Timestamp,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
    /// Binary large object.
    Blob,
}

impl LogicalType {
    /// Parses a type name, accepting common aliases case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let ty = match normalized.as_str() {
            "integer" | "int" | "int4" => Self::Integer,
            "bigint" | "int8" => Self::BigInt,
            "smallint" | "int2" => Self::SmallInt,
            "real" | "float4" => Self::Real,
            "double" | "double precision" | "float" | "float8" => Self::Double,
            "numeric" | "decimal" => Self::Numeric,
            "text" | "string" => Self::Text,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" | "datetime" => Self::Timestamp,
            "uuid" => Self::Uuid,
            "json" | "jsonb" => Self::Json,
            "blob" | "bytea" => Self::Blob,
            other => return Self::parse_varchar(other),
        };
        Some(ty)
    }

    fn parse_varchar(raw: &str) -> Option<Self> {
        let len = raw
            .strip_prefix("varchar(")
            .and_then(|rest| rest.strip_suffix(')'))?;
        len.trim().parse().ok().filter(|n| *n > 0).map(Self::Varchar)
    }

    /// Returns whether this is one of the integer types.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer | Self::BigInt | Self::SmallInt)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::BigInt => f.write_str("bigint"),
            Self::SmallInt => f.write_str("smallint"),
            Self::Real => f.write_str("real"),
            Self::Double => f.write_str("double"),
            Self::Numeric => f.write_str("numeric"),
            Self::Text => f.write_str("text"),
            Self::Varchar(len) => write!(f, "varchar({len})"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::Time => f.write_str("time"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Uuid => f.write_str("uuid"),
            Self::Json => f.write_str("json"),
            Self::Blob => f.write_str("blob"),
        }
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// SQL expression (e.g., "CURRENT_TIMESTAMP").
    Expression(String),
}

/// String defaults emitted as SQL keywords; any other string is a quoted literal.
const DEFAULT_KEYWORDS: &[&str] = &["CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP"];

impl DefaultValue {
    /// Returns whether the default is evaluated per row rather than a constant.
    #[must_use]
    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }

    /// Converts a JSON literal. `null` means "no default".
    fn from_json(value: &Value, path: &str) -> std::result::Result<Option<Self>, ValidationError> {
        let default = match value {
            Value::Null => return Ok(None),
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => {
                let keyword = s.trim().to_ascii_uppercase();
                if DEFAULT_KEYWORDS.contains(&keyword.as_str()) {
                    Self::Expression(keyword)
                } else {
                    Self::String(s.clone())
                }
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(ValidationError::invalid(
                    path,
                    "default must be a string, number, boolean or null",
                ));
            }
        };
        Ok(Some(default))
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Expression(expr) => f.write_str(expr),
        }
    }
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Logical data type.
    pub data_type: LogicalType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Default value, if any.
    pub default: Option<DefaultValue>,
    /// Whether this column auto-increments.
    pub autoincrement: bool,
}

impl Column {
    /// Creates a new nullable column without a default.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            default: None,
            autoincrement: false,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self.nullable = false;
        self
    }

    /// Returns whether existing rows can receive this column without a backfill.
    #[must_use]
    pub fn fills_existing_rows(&self) -> bool {
        self.nullable || self.default.is_some()
    }
}

/// Complete schema definition for a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Column definitions in declaration order.
    pub columns: Vec<Column>,
    /// Primary key column(s).
    pub primary_key: Vec<String>,
    /// Unique constraints, each a list of column names.
    pub unique: Vec<Vec<String>>,
}

impl Table {
    /// Creates a new table schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique: Vec::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key columns.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Same table, ignoring column position.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        let mut ours: Vec<&Column> = self.columns.iter().collect();
        let mut theirs: Vec<&Column> = other.columns.iter().collect();
        ours.sort_by(|a, b| a.name.cmp(&b.name));
        theirs.sort_by(|a, b| a.name.cmp(&b.name));
        self.name == other.name
            && ours == theirs
            && self.primary_key == other.primary_key
            && self.unique == other.unique
    }
}

/// One complete snapshot: all tables, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table to the schema, replacing any table with the same name.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns table names in alphabetical order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns tables in alphabetical order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Same tables with the same columns, ignoring column position.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.tables.len() == other.tables.len()
            && self.tables.iter().all(|(name, table)| {
                other
                    .tables
                    .get(name)
                    .is_some_and(|theirs| table.is_equivalent(theirs))
            })
    }

    pub(crate) fn tables_mut(&mut self) -> &mut BTreeMap<String, Table> {
        &mut self.tables
    }

    /// Parses a raw JSON snapshot of the form
    /// `{"tables": {<name>: {"columns": [{"name", "type", ...}]}}}`.
    pub fn parse(raw: &Value) -> std::result::Result<Self, ValidationError> {
        let root = raw
            .as_object()
            .ok_or_else(|| ValidationError::invalid("<root>", "snapshot must be a JSON object"))?;
        let tables = root
            .get("tables")
            .ok_or_else(|| ValidationError::missing("tables", "tables"))?
            .as_object()
            .ok_or_else(|| ValidationError::invalid("tables", "'tables' must be an object"))?;

        let mut schema = Self::new();
        for (name, def) in tables {
            let table = parse_table(name, def)?;
            schema.tables.insert(name.clone(), table);
        }
        Ok(schema)
    }
}

/// Reads and parses a snapshot file.
pub fn load(path: impl AsRef<Path>) -> Result<Schema> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| MigrateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Value = serde_json::from_str(&text).map_err(|source| MigrateError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Schema::parse(&raw)?)
}

fn parse_table(name: &str, def: &Value) -> std::result::Result<Table, ValidationError> {
    let path = format!("tables.{name}");
    if name.is_empty() {
        return Err(ValidationError::new(
            ValidationErrorKind::MissingField,
            path,
            "table name must not be empty",
        ));
    }
    let obj = def
        .as_object()
        .ok_or_else(|| ValidationError::invalid(&path, "table must be an object"))?;
    let columns_path = format!("{path}.columns");
    let raw_columns = obj
        .get("columns")
        .ok_or_else(|| ValidationError::missing(&path, "columns"))?;

    let mut parsed = Vec::new();
    match raw_columns {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let col_path = format!("{columns_path}[{i}]");
                let obj = item
                    .as_object()
                    .ok_or_else(|| ValidationError::invalid(&col_path, "column must be an object"))?;
                let col_name = required_str(obj, "name", &col_path)?;
                parsed.push(parse_column(col_name, obj, &col_path)?);
            }
        }
        Value::Object(map) => {
            for (col_name, item) in map {
                let col_path = format!("{columns_path}.{col_name}");
                let obj = item
                    .as_object()
                    .ok_or_else(|| ValidationError::invalid(&col_path, "column must be an object"))?;
                parsed.push(parse_column(col_name, obj, &col_path)?);
            }
        }
        _ => {
            return Err(ValidationError::invalid(
                columns_path,
                "'columns' must be a list or an object",
            ));
        }
    }

    let mut table = Table::new(name);
    let mut seen = HashSet::new();
    let mut declared = Vec::with_capacity(parsed.len());
    for ParsedColumn {
        path: col_path,
        column,
        primary_key,
        nullable,
    } in parsed
    {
        if !seen.insert(column.name.clone()) {
            return Err(ValidationError::new(
                ValidationErrorKind::DuplicateName,
                format!("{col_path}.name"),
                format!("column '{}' is declared more than once", column.name),
            ));
        }
        if primary_key {
            table.primary_key.push(column.name.clone());
        }
        table.columns.push(column);
        declared.push((col_path, nullable));
    }

    if let Some(value) = obj.get("primary_key") {
        let pk_path = format!("{path}.primary_key");
        for col in name_list(value, &pk_path)? {
            if !table.primary_key.contains(&col) {
                table.primary_key.push(col);
            }
        }
    }

    // Key columns are NOT NULL however the key was declared.
    for (column, (col_path, nullable)) in table.columns.iter_mut().zip(&declared) {
        if !table.primary_key.contains(&column.name) {
            continue;
        }
        if *nullable == Some(true) {
            return Err(ValidationError::invalid(
                format!("{col_path}.nullable"),
                "a primary key column cannot be nullable",
            ));
        }
        column.nullable = false;
    }

    if let Some(value) = obj.get("unique") {
        let unique_path = format!("{path}.unique");
        let groups = value
            .as_array()
            .ok_or_else(|| ValidationError::invalid(&unique_path, "'unique' must be a list"))?;
        for (i, group) in groups.iter().enumerate() {
            table
                .unique
                .push(name_list(group, &format!("{unique_path}[{i}]"))?);
        }
    }

    check_constraints(&table, &path)?;
    Ok(table)
}

/// A column as declared, before table-level keys are merged in.
struct ParsedColumn {
    path: String,
    column: Column,
    primary_key: bool,
    nullable: Option<bool>,
}

fn parse_column(
    name: &str,
    obj: &Map<String, Value>,
    path: &str,
) -> std::result::Result<ParsedColumn, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new(
            ValidationErrorKind::MissingField,
            format!("{path}.name"),
            "column name must not be empty",
        ));
    }
    let raw_type = required_str(obj, "type", path)?;
    let data_type = LogicalType::parse(raw_type).ok_or_else(|| {
        ValidationError::new(
            ValidationErrorKind::UnknownType,
            format!("{path}.type"),
            format!("unrecognized type '{raw_type}'"),
        )
    })?;

    let primary_key = optional_bool(obj, "primary_key", path)?.unwrap_or(false);
    let autoincrement = optional_bool(obj, "autoincrement", path)?.unwrap_or(false);
    let explicit_nullable = optional_bool(obj, "nullable", path)?;
    let default = match obj.get("default") {
        Some(value) => DefaultValue::from_json(value, &format!("{path}.default"))?,
        None => None,
    };

    let column = Column {
        name: name.to_string(),
        data_type,
        nullable: explicit_nullable.unwrap_or(!autoincrement),
        default,
        autoincrement,
    };
    Ok(ParsedColumn {
        path: path.to_string(),
        column,
        primary_key,
        nullable: explicit_nullable,
    })
}

fn check_constraints(table: &Table, path: &str) -> std::result::Result<(), ValidationError> {
    let groups = std::iter::once(("primary_key".to_string(), &table.primary_key)).chain(
        table
            .unique
            .iter()
            .enumerate()
            .map(|(i, g)| (format!("unique[{i}]"), g)),
    );
    for (label, names) in groups {
        if let Some(missing) = names.iter().find(|n| table.get_column(n).is_none()) {
            return Err(ValidationError::new(
                ValidationErrorKind::UnknownColumn,
                format!("{path}.{label}"),
                format!("column '{missing}' is not declared in table '{}'", table.name),
            ));
        }
    }

    for (i, column) in table.columns.iter().enumerate() {
        if !column.autoincrement {
            continue;
        }
        let sole_key = table.primary_key.len() == 1 && table.primary_key[0] == column.name;
        if !column.data_type.is_integer() || !sole_key {
            return Err(ValidationError::invalid(
                format!("{path}.columns[{i}].autoincrement"),
                "autoincrement requires an integer column that is the sole primary key",
            ));
        }
    }
    Ok(())
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> std::result::Result<&'a str, ValidationError> {
    let value = obj
        .get(key)
        .ok_or_else(|| ValidationError::missing(path, key))?;
    value
        .as_str()
        .ok_or_else(|| ValidationError::invalid(format!("{path}.{key}"), format!("'{key}' must be a string")))
}

fn optional_bool(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> std::result::Result<Option<bool>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ValidationError::invalid(
            format!("{path}.{key}"),
            format!("'{key}' must be a boolean"),
        )),
    }
}

fn name_list(value: &Value, path: &str) -> std::result::Result<Vec<String>, ValidationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::invalid(path, "expected a list of column names"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ValidationError::invalid(path, "column names must be strings"))
        })
        .collect()
}
