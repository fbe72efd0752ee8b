//! Pure record-set combinators: predicate evaluation, single-key sort,
//! offset/limit slicing, field projection. Everything here is synchronous
//! and total — no comparison ever fails, whatever the operand kinds.

use crate::pipeline::ops::{Direction, FilterCondition, FilterOp};
use crate::schema::types::{Record, Value};

/// Conjunctive filter evaluation. An absent field never satisfies `eq` or
/// the ordering operators and always satisfies `neq` (it is unequal to any
/// value); cross-kind comparisons fall back to the total order on `Value`.
pub fn matches(record: &Record, cond: &FilterCondition) -> bool {
    let field = record.get(&cond.field);
    match cond.op {
        FilterOp::Eq => field.is_some_and(|v| v == &cond.value),
        FilterOp::Neq => !field.is_some_and(|v| v == &cond.value),
        FilterOp::Gt => field.is_some_and(|v| v > &cond.value),
        FilterOp::Gte => field.is_some_and(|v| v >= &cond.value),
        FilterOp::Lt => field.is_some_and(|v| v < &cond.value),
        FilterOp::Lte => field.is_some_and(|v| v <= &cond.value),
    }
}

pub fn apply_filters(records: Vec<Record>, conditions: &[&FilterCondition]) -> Vec<Record> {
    if conditions.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| conditions.iter().all(|cond| matches(record, cond)))
        .collect()
}

/// Sorts by one field. Absent fields sort as `Null` (lowest). Order among
/// equal keys is unspecified; callers must not rely on it.
pub fn sort_by_field(records: &mut [Record], field: &str, direction: Direction) {
    records.sort_by(|a, b| {
        let av = a.get(field).unwrap_or(&Value::Null);
        let bv = b.get(field).unwrap_or(&Value::Null);
        match direction {
            Direction::Asc => av.cmp(bv),
            Direction::Desc => bv.cmp(av),
        }
    });
}

/// Offset is a prefix skip, limit a suffix cap — applied in that order
/// regardless of how the caller chained them.
pub fn paginate(records: Vec<Record>, offset: Option<usize>, limit: Option<usize>) -> Vec<Record> {
    let mut records = records;
    if let Some(skip) = offset {
        records = records.split_off(skip.min(records.len()));
    }
    if let Some(cap) = limit {
        records.truncate(cap);
    }
    records
}

/// Projects a record down to exactly the named fields. Fields absent from
/// the record are omitted from the projection, never defaulted. An empty
/// field list returns the record unchanged.
pub fn project(record: &Record, fields: &[String]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    fields
        .iter()
        .filter_map(|name| record.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}
