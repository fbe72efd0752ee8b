//! The table handle: a write-once accumulator of operations and the
//! execution engine that runs the accumulated chain as one transactional
//! unit of work.

use crate::error::KvormError;
use crate::pipeline::eval::{apply_filters, paginate, project, sort_by_field};
use crate::pipeline::ops::{
    ClassifiedChain, Direction, FilterCondition, FilterOp, MutationOp, Operation, classify,
};
use crate::resolve::resolve_record;
use crate::schema::TableSchema;
use crate::schema::types::{IntoValue, Record};
use crate::store::{StoreAdapter, StoreTransaction};
use std::sync::Arc;
use tracing::debug;

/// Pipeline lifecycle. `Completed` is reachable only from inside the
/// processing path; a store that signals transaction completion first
/// forces `Failed` with a fatal error instead of a silently partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Executing,
    Completed,
    Failed,
}

/// Deferred operation chain for one table. Obtained from
/// [`KvormInstance::from`](crate::KvormInstance::from); recording calls are
/// chainable and free of I/O, the terminal [`get`](TableHandle::get) /
/// [`single`](TableHandle::single) call consumes the handle and executes
/// everything in one transaction scope.
pub struct TableHandle {
    table: Arc<TableSchema>,
    store: Arc<dyn StoreAdapter>,
    strict_update: bool,
    operations: Vec<Operation>,
}

impl std::fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHandle")
            .field("table", &self.table)
            .field("strict_update", &self.strict_update)
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

impl TableHandle {
    pub(crate) fn new(
        table: Arc<TableSchema>,
        store: Arc<dyn StoreAdapter>,
        strict_update: bool,
    ) -> Self {
        Self {
            table,
            store,
            strict_update,
            operations: Vec::new(),
        }
    }

    fn record(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Requests read results, projected down to `fields`. An empty slice
    /// means full records. With a mutation in the same chain, `select`
    /// makes the post-mutation record set the result.
    pub fn select(self, fields: &[&str]) -> Self {
        self.record(Operation::Select(
            fields.iter().map(|f| (*f).to_string()).collect(),
        ))
    }

    pub fn insert(self, payload: Record) -> Self {
        self.record(Operation::Insert(payload))
    }

    pub fn update(self, payload: Record) -> Self {
        self.record(Operation::Update(payload))
    }

    pub fn upsert(self, payload: Record) -> Self {
        self.record(Operation::Upsert(payload))
    }

    pub fn delete(self) -> Self {
        self.record(Operation::Delete)
    }

    pub fn filter(self, field: &str, op: FilterOp, value: impl IntoValue) -> Self {
        self.record(Operation::Filter(FilterCondition {
            field: field.to_string(),
            op,
            value: value.into_value(),
        }))
    }

    pub fn eq(self, field: &str, value: impl IntoValue) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn neq(self, field: &str, value: impl IntoValue) -> Self {
        self.filter(field, FilterOp::Neq, value)
    }

    pub fn gt(self, field: &str, value: impl IntoValue) -> Self {
        self.filter(field, FilterOp::Gt, value)
    }

    pub fn gte(self, field: &str, value: impl IntoValue) -> Self {
        self.filter(field, FilterOp::Gte, value)
    }

    pub fn lt(self, field: &str, value: impl IntoValue) -> Self {
        self.filter(field, FilterOp::Lt, value)
    }

    pub fn lte(self, field: &str, value: impl IntoValue) -> Self {
        self.filter(field, FilterOp::Lte, value)
    }

    pub fn order(self, field: &str, direction: Direction) -> Self {
        self.record(Operation::Order {
            field: field.to_string(),
            direction,
        })
    }

    pub fn limit(self, count: usize) -> Self {
        self.record(Operation::Limit(count))
    }

    pub fn offset(self, count: usize) -> Self {
        self.record(Operation::Offset(count))
    }

    /// Executes the chain and returns the result record set.
    pub async fn get(self) -> Result<Vec<Record>, KvormError> {
        self.execute().await
    }

    /// Executes the chain and returns the first result, if any.
    pub async fn single(self) -> Result<Option<Record>, KvormError> {
        let mut records = self.execute().await?;
        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records.remove(0)))
        }
    }

    async fn execute(self) -> Result<Vec<Record>, KvormError> {
        let chain = classify(&self.operations)?;
        let table_name = self.table.name().to_string();
        let mut tx = self
            .store
            .open_transaction(&table_name)
            .await
            .map_err(|e| KvormError::from_store(&table_name, e))?;
        debug!(
            table = %table_name,
            operations = self.operations.len(),
            state = ?PipelineState::Executing,
            "pipeline executing"
        );
        let state;

        let result = process_chain(&self.table, &chain, tx.as_mut(), self.strict_update).await;

        let outcome = match result {
            Ok(records) => {
                // The transactional boundary must still be open here: a
                // store that signaled completion while processing was in
                // flight has broken the atomicity contract.
                if tx.is_completed() {
                    state = PipelineState::Failed;
                    Err(KvormError::PrematureCommit)
                } else {
                    tx.commit()
                        .await
                        .map_err(|e| KvormError::from_store(&table_name, e))?;
                    state = PipelineState::Completed;
                    Ok(records)
                }
            }
            Err(err) => {
                state = PipelineState::Failed;
                Err(err)
            }
        };
        debug!(table = %table_name, state = ?state, "pipeline finished");
        outcome
    }
}

async fn process_chain(
    table: &TableSchema,
    chain: &ClassifiedChain<'_>,
    tx: &mut dyn StoreTransaction,
    strict_update: bool,
) -> Result<Vec<Record>, KvormError> {
    let mut results = Vec::new();

    if let Some(mutation) = chain.mutation {
        results = match mutation {
            MutationOp::Insert(payload) => handle_insert(table, tx, payload).await?,
            MutationOp::Update(payload) => {
                handle_update(table, chain, tx, payload, strict_update).await?
            }
            MutationOp::Upsert(payload) => handle_upsert(table, tx, payload).await?,
            MutationOp::Delete => {
                handle_delete(table, chain, tx).await?;
                Vec::new()
            }
        };
    }

    // Read path: no mutation requested, or an explicit select rides along.
    if chain.mutation.is_none() || chain.select.is_some() {
        let mut records = filtered_records(table, chain, tx).await?;
        if let Some((field, direction)) = chain.order {
            sort_by_field(&mut records, field, direction);
        }
        let records = paginate(records, chain.offset, chain.limit);
        results = match chain.select {
            Some(fields) if !fields.is_empty() => {
                records.iter().map(|r| project(r, fields)).collect()
            }
            _ => records,
        };
    }

    Ok(results)
}

async fn filtered_records(
    table: &TableSchema,
    chain: &ClassifiedChain<'_>,
    tx: &mut dyn StoreTransaction,
) -> Result<Vec<Record>, KvormError> {
    let all = tx
        .get_all()
        .await
        .map_err(|e| KvormError::from_store(table.name(), e))?;
    Ok(apply_filters(all, &chain.filters))
}

async fn handle_insert(
    table: &TableSchema,
    tx: &mut dyn StoreTransaction,
    payload: &Record,
) -> Result<Vec<Record>, KvormError> {
    let resolved = resolve_record(table, payload.clone())?;
    let assigned = tx
        .add(&resolved)
        .await
        .map_err(|e| KvormError::from_store(table.name(), e))?;
    // Merge the store-assigned key back in (auto-increment tables).
    let mut stored = resolved;
    stored.set(table.primary_key().to_string(), assigned);
    Ok(vec![stored])
}

async fn handle_upsert(
    table: &TableSchema,
    tx: &mut dyn StoreTransaction,
    payload: &Record,
) -> Result<Vec<Record>, KvormError> {
    let resolved = resolve_record(table, payload.clone())?;
    let assigned = tx
        .put(&resolved)
        .await
        .map_err(|e| KvormError::from_store(table.name(), e))?;
    let mut stored = resolved;
    stored.set(table.primary_key().to_string(), assigned);
    Ok(vec![stored])
}

async fn handle_update(
    table: &TableSchema,
    chain: &ClassifiedChain<'_>,
    tx: &mut dyn StoreTransaction,
    payload: &Record,
    strict_update: bool,
) -> Result<Vec<Record>, KvormError> {
    let key = payload
        .get(table.primary_key())
        .filter(|key| !key.is_null());

    match key {
        // No key in the payload: overlay it onto every filtered record.
        // A null key counts as absent and must not clobber stored keys.
        None => {
            let mut patch = payload.clone();
            patch.remove(table.primary_key());
            let filtered = filtered_records(table, chain, tx).await?;
            let mut updated = Vec::with_capacity(filtered.len());
            for record in filtered {
                let mut merged = record;
                merged.merge_from(&patch);
                tx.put(&merged)
                    .await
                    .map_err(|e| KvormError::from_store(table.name(), e))?;
                updated.push(merged);
            }
            Ok(updated)
        }
        // Explicit key: merge onto that one stored record, preserving every
        // field the payload does not mention.
        Some(key) => {
            let key = key.clone();
            let existing = tx
                .get(&key)
                .await
                .map_err(|e| KvormError::from_store(table.name(), e))?;
            match existing {
                None if strict_update => Err(KvormError::RecordNotFound {
                    table: table.name().to_string(),
                    key: format!("{key:?}"),
                }),
                None => Ok(Vec::new()),
                Some(existing) => {
                    let mut merged = existing;
                    merged.merge_from(payload);
                    tx.put(&merged)
                        .await
                        .map_err(|e| KvormError::from_store(table.name(), e))?;
                    Ok(vec![merged])
                }
            }
        }
    }
}

async fn handle_delete(
    table: &TableSchema,
    chain: &ClassifiedChain<'_>,
    tx: &mut dyn StoreTransaction,
) -> Result<(), KvormError> {
    // No filters means the whole table.
    if chain.filters.is_empty() {
        return tx
            .clear()
            .await
            .map_err(|e| KvormError::from_store(table.name(), e));
    }

    let filtered = filtered_records(table, chain, tx).await?;
    for record in &filtered {
        if let Some(key) = record.get(table.primary_key()) {
            tx.delete(key)
                .await
                .map_err(|e| KvormError::from_store(table.name(), e))?;
        }
    }
    Ok(())
}
