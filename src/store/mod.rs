//! The transactional key/value object store the pipeline drives.
//!
//! The engine only ever talks to the [`StoreAdapter`] and
//! [`StoreTransaction`] traits; [`MemoryStore`] is the bundled
//! implementation. The store owns conflict serialization between
//! concurrently executing pipelines and key assignment for auto-increment
//! tables.

pub mod memory;

pub use memory::MemoryStore;

use crate::schema::types::{Record, Value};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("key already exists: {key}")]
    DuplicateKey { key: String },
    #[error("record carries no key value")]
    MissingKey,
    #[error("object store '{table}' does not exist")]
    TableNotFound { table: String },
    #[error("transaction already completed")]
    TransactionCompleted,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// One open transaction scope against a single table. All reads within the
/// scope observe one consistent state; writes become visible to other
/// transactions once the scope is dropped or committed.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Full current record set of the table.
    async fn get_all(&mut self) -> Result<Vec<Record>, StoreError>;

    /// Single record by primary key value, or `None`.
    async fn get(&mut self, key: &Value) -> Result<Option<Record>, StoreError>;

    /// Writes a new record and returns the key it was stored under
    /// (store-assigned for auto-increment tables). Fails with
    /// [`StoreError::DuplicateKey`] if the key is already present.
    async fn add(&mut self, record: &Record) -> Result<Value, StoreError>;

    /// Insert-or-replace by key; returns the key written.
    async fn put(&mut self, record: &Record) -> Result<Value, StoreError>;

    async fn delete(&mut self, key: &Value) -> Result<(), StoreError>;

    async fn clear(&mut self) -> Result<(), StoreError>;

    /// Whether the store considers the transaction finished. The pipeline
    /// probes this before committing: a transaction that completed on its
    /// own while processing was still running is a broken atomicity
    /// contract, not a result to return.
    fn is_completed(&self) -> bool;

    /// Awaits transaction completion. Consumes the handle; the pipeline
    /// calls this exactly once, after all processing has finished.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Connection-level store operations consumed by the engine.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Opens one transaction scope covering a single table.
    async fn open_transaction(&self, table: &str)
    -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Ensures an object store exists for `table`, keyed on `key_path`.
    /// Invoked once per declared table at connect time.
    async fn create_table(
        &self,
        table: &str,
        key_path: &str,
        auto_increment: bool,
    ) -> Result<(), StoreError>;

    fn has_table(&self, table: &str) -> bool;

    fn table_names(&self) -> Vec<String>;

    /// Removes every record from every table, preserving table definitions.
    async fn clear_all(&self) -> Result<(), StoreError>;

    /// Drops the underlying store entirely, table definitions included.
    async fn destroy(&self) -> Result<(), StoreError>;
}
