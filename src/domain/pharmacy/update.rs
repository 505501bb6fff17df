//! Partial update statements for pharmacy profiles
//!
//! Only columns named in [`UPDATABLE_FIELDS`] can ever appear in the
//! generated SQL. Caller-supplied keys are matched against that table and
//! never interpolated.

use chrono::NaiveTime;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::parse_time_of_day;
use crate::domain::errors::RepositoryError;
use crate::domain::geo::{validate_latitude, validate_longitude};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Latitude,
    Longitude,
    TimeOfDay,
}

/// One mutable profile field and the column it maps to
#[derive(Debug, Clone, Copy)]
pub struct UpdatableField {
    pub field: &'static str,
    pub column: &'static str,
    kind: FieldKind,
}

/// Fields a pharmacy may change about itself, in statement order
pub const UPDATABLE_FIELDS: &[UpdatableField] = &[
    UpdatableField {
        field: "name",
        column: "pharmacy_name",
        kind: FieldKind::Text,
    },
    UpdatableField {
        field: "address",
        column: "address",
        kind: FieldKind::Text,
    },
    UpdatableField {
        field: "phone",
        column: "phone",
        kind: FieldKind::Text,
    },
    UpdatableField {
        field: "latitude",
        column: "latitude",
        kind: FieldKind::Latitude,
    },
    UpdatableField {
        field: "longitude",
        column: "longitude",
        kind: FieldKind::Longitude,
    },
    UpdatableField {
        field: "open_time",
        column: "open_time",
        kind: FieldKind::TimeOfDay,
    },
    UpdatableField {
        field: "close_time",
        column: "close_time",
        kind: FieldKind::TimeOfDay,
    },
];

/// A value bound to a statement placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Text(String),
    Float(f64),
    Time(NaiveTime),
    Id(Uuid),
}

impl BoundValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BoundValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            BoundValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// A parameterized `UPDATE pharmacies` statement
///
/// `values` lines up with `$1..$n`; the last value is always the
/// pharmacy id used in the WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    sql: String,
    columns: Vec<&'static str>,
    values: Vec<BoundValue>,
}

impl UpdateStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Columns assigned by the statement, in placeholder order
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn values(&self) -> &[BoundValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<BoundValue> {
        self.values
    }

    /// The new value for `column`, if the statement assigns it
    pub fn value_for(&self, column: &str) -> Option<&BoundValue> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values.get(i))
    }
}

/// Builds an update for `pharmacy_id` from a sparse set of changed fields
///
/// Keys outside [`UPDATABLE_FIELDS`] are ignored. `null` values and blank
/// strings count as "not supplied", so a field cannot be cleared this way.
/// Other falsy JSON values are not dropped: `false` is rejected as the
/// wrong type and a numeric `0` is a real coordinate.
///
/// # Errors
/// * `NoFields` - nothing allowlisted remains after filtering
/// * `Validation` - a supplied value has the wrong type or is out of range
///
/// # Example
/// ```
/// use pharmacy_directory_api::domain::pharmacy::build_update;
/// use serde_json::json;
/// use uuid::Uuid;
///
/// let changes = json!({ "name": "A", "unknownField": "x" });
/// let stmt = build_update(Uuid::new_v4(), changes.as_object().unwrap()).unwrap();
/// assert_eq!(stmt.sql(), "UPDATE pharmacies SET pharmacy_name = $1 WHERE id = $2");
/// ```
pub fn build_update(
    pharmacy_id: Uuid,
    changes: &Map<String, Value>,
) -> Result<UpdateStatement, RepositoryError> {
    let mut columns = Vec::new();
    let mut values = Vec::new();

    for entry in UPDATABLE_FIELDS {
        let Some(raw) = changes.get(entry.field).filter(|v| is_supplied(v)) else {
            continue;
        };
        values.push(convert(entry, raw)?);
        columns.push(entry.column);
    }

    if columns.is_empty() {
        return Err(RepositoryError::NoFields);
    }

    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column, i + 1))
        .collect();

    values.push(BoundValue::Id(pharmacy_id));

    let sql = format!(
        "UPDATE pharmacies SET {} WHERE id = ${}",
        assignments.join(", "),
        values.len()
    );

    Ok(UpdateStatement {
        sql,
        columns,
        values,
    })
}

fn is_supplied(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn convert(entry: &UpdatableField, raw: &Value) -> Result<BoundValue, RepositoryError> {
    match entry.kind {
        FieldKind::Text => raw
            .as_str()
            .map(|s| BoundValue::Text(s.trim().to_string()))
            .ok_or_else(|| wrong_type(entry.field, "a string")),
        FieldKind::Latitude => number(entry.field, raw)
            .and_then(validate_latitude)
            .map(BoundValue::Float),
        FieldKind::Longitude => number(entry.field, raw)
            .and_then(validate_longitude)
            .map(BoundValue::Float),
        FieldKind::TimeOfDay => raw
            .as_str()
            .ok_or_else(|| wrong_type(entry.field, "a time of day string"))
            .and_then(parse_time_of_day)
            .map(BoundValue::Time),
    }
}

fn number(field: &str, raw: &Value) -> Result<f64, RepositoryError> {
    match raw {
        Value::Number(n) => n.as_f64().ok_or_else(|| wrong_type(field, "a number")),
        Value::String(s) => s.trim().parse().map_err(|_| wrong_type(field, "a number")),
        _ => Err(wrong_type(field, "a number")),
    }
}

fn wrong_type(field: &str, expected: &str) -> RepositoryError {
    RepositoryError::validation(format!("{} must be {}", field, expected))
}
