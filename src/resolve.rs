//! Default and primary-key resolution for insert/upsert payloads.
//!
//! Walks the field schema tree depth-first and fills in everything the
//! caller omitted: literal defaults (deep-copied), factory defaults
//! (invoked at resolution time), and a generated UUID for an absent
//! string primary key. Runs only on the insert and upsert paths; update is
//! a pure merge and never comes through here.

use crate::error::KvormError;
use crate::schema::TableSchema;
use crate::schema::field::{FieldKind, FieldSchema, TypeCheck};
use crate::schema::types::{Record, Value};
use uuid::Uuid;

/// New random identifier for a string-typed primary key: 36-character
/// hyphenated UUID v4 layout.
pub fn generate_string_key() -> Value {
    Value::Text(Uuid::new_v4().hyphenated().to_string().into())
}

/// Produces a complete record ready for storage from a partial payload.
///
/// A field counts as supplied only when its key is present in the record; a
/// supplied `Null` is kept as-is rather than defaulted, except for the
/// primary key, where `Null` triggers generation the same as absence.
/// A numeric auto-increment key is left absent for the store to assign.
pub fn resolve_record(table: &TableSchema, mut record: Record) -> Result<Record, KvormError> {
    for (name, field) in table.fields() {
        match record.remove(name) {
            Some(value) if !(field.primary_key && value.is_null()) => {
                let resolved = resolve_value(table.name(), name, field, value)?;
                record.set(name.clone(), resolved);
            }
            _ => {
                if let Some(default) = &field.default {
                    let materialized =
                        resolve_value(table.name(), name, field, default.materialize())?;
                    record.set(name.clone(), materialized);
                } else if field.primary_key {
                    match field.kind {
                        FieldKind::Text => record.set(name.clone(), generate_string_key()),
                        // The store assigns the key on write; it is merged
                        // back into the record afterwards.
                        FieldKind::Number if field.auto_increment => {}
                        _ => {}
                    }
                } else if field.required {
                    return Err(KvormError::Validation(format!(
                        "missing required field '{}' in table '{}'",
                        name,
                        table.name()
                    )));
                }
            }
        }
    }
    Ok(record)
}

/// Validates a supplied value and applies deep-partial fill: nested object
/// and array schemas default any sub-fields the caller omitted instead of
/// replacing the whole value.
fn resolve_value(
    table: &str,
    path: &str,
    field: &FieldSchema,
    value: Value,
) -> Result<Value, KvormError> {
    match (&field.kind, value) {
        (FieldKind::Object(fields), Value::Object(mut entries)) => {
            for (name, sub) in fields {
                let sub_path = format!("{path}.{name}");
                match entries.remove(name) {
                    Some(v) => {
                        entries.insert(name.clone(), resolve_value(table, &sub_path, sub, v)?);
                    }
                    None => {
                        if let Some(default) = &sub.default {
                            let v = resolve_value(table, &sub_path, sub, default.materialize())?;
                            entries.insert(name.clone(), v);
                        } else if sub.required {
                            return Err(KvormError::Validation(format!(
                                "missing required field '{sub_path}' in table '{table}'"
                            )));
                        }
                    }
                }
            }
            Ok(Value::Object(entries))
        }
        (FieldKind::Array(items), Value::Array(elems)) => {
            let filled = elems
                .into_iter()
                .enumerate()
                .map(|(idx, elem)| {
                    resolve_value(table, &format!("{path}[{idx}]"), items, elem)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(filled))
        }
        (_, value) => {
            field
                .check(path, &value)
                .map_err(|tc| type_mismatch(table, tc))?;
            Ok(value)
        }
    }
}

fn type_mismatch(table: &str, check: TypeCheck) -> KvormError {
    KvormError::TypeMismatch {
        table: table.to_string(),
        field: check.path,
        expected: check.expected.to_string(),
        actual: check.actual.to_string(),
    }
}
