//! kvorm is a schema-driven query and mutation engine over a transactional
//! key-value object store. Tables are described up front with recursive
//! field schemas, records are plain value maps, and every read or write is
//! phrased as a deferred operation chain that executes atomically when a
//! terminal call is made.
//!
//! ```no_run
//! use kvorm::{FieldSchema, KvormConfig, KvormInstance, Record, TableSpec};
//!
//! # async fn demo() -> Result<(), kvorm::KvormError> {
//! let db = KvormInstance::builder(KvormConfig::named("app"))
//!     .table(
//!         TableSpec::new("users")
//!             .field("id", FieldSchema::text().primary_key())
//!             .field("name", FieldSchema::text().required()),
//!     )
//!     .build()?;
//! db.connect_memory().await?;
//!
//! let created = db
//!     .from("users")?
//!     .insert(Record::new().with("name", "Ada"))
//!     .get()
//!     .await?;
//! assert_eq!(created.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolve;
pub mod schema;
pub mod store;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

pub use crate::config::KvormConfig;
pub use crate::error::{KvormError, KvormErrorCode};
pub use crate::pipeline::{Direction, FilterOp, TableHandle};
pub use crate::schema::field::FieldSchema;
pub use crate::schema::types::{IntoValue, Record, Value, lit};
pub use crate::schema::{DatabaseSchema, TableSchema, TableSpec};
pub use crate::store::{MemoryStore, StoreAdapter, StoreError, StoreTransaction};

/// A database handle: a schema plus an optional connected store adapter.
///
/// The instance is cheap to share; all interior state is behind locks.
/// Operation chains obtained through [`from`](KvormInstance::from) hold their
/// own `Arc` to the adapter, so disconnecting does not invalidate chains
/// already handed out.
pub struct KvormInstance {
    config: KvormConfig,
    schema: Arc<DatabaseSchema>,
    store: RwLock<Option<Arc<dyn StoreAdapter>>>,
}

impl std::fmt::Debug for KvormInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvormInstance")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl KvormInstance {
    /// Starts a fluent builder for an instance with the given config.
    pub fn builder(config: KvormConfig) -> KvormInstanceBuilder {
        KvormInstanceBuilder {
            config,
            schema: DatabaseSchema::builder(),
        }
    }

    pub fn new(config: KvormConfig, schema: DatabaseSchema) -> Self {
        Self {
            config,
            schema: Arc::new(schema),
            store: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &KvormConfig {
        &self.config
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    /// Attaches a store adapter and creates every table the schema declares
    /// that the adapter does not already have.
    pub async fn connect(&self, store: Arc<dyn StoreAdapter>) -> Result<(), KvormError> {
        for table in self.schema.tables() {
            if !store.has_table(table.name()) {
                store
                    .create_table(table.name(), table.primary_key(), table.auto_increment())
                    .await
                    .map_err(|e| KvormError::from_store(table.name(), e))?;
            }
        }
        info!(
            database = %self.config.name,
            version = self.config.version,
            tables = self.schema.table_names().len(),
            "connected"
        );
        *self.store.write() = Some(store);
        Ok(())
    }

    /// Connects to a fresh in-process [`MemoryStore`].
    pub async fn connect_memory(&self) -> Result<(), KvormError> {
        self.connect(Arc::new(MemoryStore::new())).await
    }

    /// Drops the adapter reference. Stored data is untouched; chains already
    /// obtained keep working.
    pub fn disconnect(&self) {
        if self.store.write().take().is_some() {
            info!(database = %self.config.name, "disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.store.read().is_some()
    }

    /// Opens a deferred operation chain on `table`.
    pub fn from(&self, table: &str) -> Result<TableHandle, KvormError> {
        let store = self.connected_store()?;
        let table = self
            .schema
            .table(table)
            .ok_or_else(|| KvormError::TableNotFound {
                table: table.to_string(),
            })?;
        Ok(TableHandle::new(
            Arc::new(table.clone()),
            store,
            self.config.strict_update,
        ))
    }

    /// Table names as the schema declares them, sorted.
    pub fn table_names(&self) -> Vec<String> {
        self.schema.table_names()
    }

    /// Empties every table while keeping table definitions intact.
    pub async fn clear_all(&self) -> Result<(), KvormError> {
        let store = self.connected_store()?;
        store
            .clear_all()
            .await
            .map_err(|e| KvormError::from_store("*", e))?;
        info!(database = %self.config.name, "cleared all tables");
        Ok(())
    }

    /// Destroys the backing database and disconnects.
    pub async fn destroy(&self) -> Result<(), KvormError> {
        let store = self.connected_store()?;
        store
            .destroy()
            .await
            .map_err(|e| KvormError::from_store("*", e))?;
        *self.store.write() = None;
        info!(database = %self.config.name, "destroyed");
        Ok(())
    }

    fn connected_store(&self) -> Result<Arc<dyn StoreAdapter>, KvormError> {
        self.store
            .read()
            .as_ref()
            .cloned()
            .ok_or(KvormError::NotConnected)
    }
}

/// Builder combining a config with a schema declaration.
pub struct KvormInstanceBuilder {
    config: KvormConfig,
    schema: crate::schema::DatabaseSchemaBuilder,
}

impl KvormInstanceBuilder {
    pub fn table(mut self, spec: TableSpec) -> Self {
        self.schema = self.schema.table(spec);
        self
    }

    pub fn build(self) -> Result<KvormInstance, KvormError> {
        Ok(KvormInstance::new(self.config, self.schema.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> KvormInstance {
        KvormInstance::builder(KvormConfig::default())
            .table(
                TableSpec::new("users")
                    .field("id", FieldSchema::text().primary_key())
                    .field("name", FieldSchema::text().required()),
            )
            .build()
            .expect("schema")
    }

    #[tokio::test]
    async fn from_requires_connection() {
        let db = instance();
        let err = db.from("users").unwrap_err();
        assert_eq!(err.code(), KvormErrorCode::NotConnected);
        db.connect_memory().await.expect("connect");
        assert!(db.from("users").is_ok());
    }

    #[tokio::test]
    async fn from_rejects_undeclared_table() {
        let db = instance();
        db.connect_memory().await.expect("connect");
        let err = db.from("ghosts").unwrap_err();
        assert_eq!(err.code(), KvormErrorCode::TableNotFound);
    }

    #[tokio::test]
    async fn disconnect_does_not_invalidate_open_chains() {
        let db = instance();
        db.connect_memory().await.expect("connect");
        let chain = db.from("users").expect("chain");
        db.disconnect();
        assert!(!db.is_connected());
        let rows = chain.get().await.expect("read");
        assert!(rows.is_empty());
    }
}
