//! In-memory store adapter. Behaves like an IndexedDB object store: records
//! keyed by the table's key path, a monotonic auto-increment counter that
//! survives deletes, and per-table serialization of conflicting
//! transactions.

use crate::schema::types::{Record, Value};
use crate::store::{StoreAdapter, StoreError, StoreTransaction};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug)]
struct TableData {
    key_path: String,
    auto_increment: bool,
    next_key: i64,
    records: BTreeMap<Value, Record>,
}

impl TableData {
    /// Resolves the key a record will be stored under, assigning from the
    /// auto-increment counter when the record carries none.
    fn resolve_key(&mut self, record: &Record) -> Result<Value, StoreError> {
        match record.get(&self.key_path) {
            Some(key) if !key.is_null() => {
                // Explicit numeric keys bump the counter so later
                // assignments never collide with them.
                if self.auto_increment
                    && let Some(n) = key.as_integer()
                    && n >= self.next_key
                {
                    self.next_key = n + 1;
                }
                Ok(key.clone())
            }
            _ if self.auto_increment => {
                let assigned = Value::Integer(self.next_key);
                self.next_key += 1;
                Ok(assigned)
            }
            _ => Err(StoreError::MissingKey),
        }
    }

    fn stored_record(&self, record: &Record, key: &Value) -> Record {
        let mut stored = record.clone();
        stored.set(self.key_path.clone(), key.clone());
        stored
    }
}

/// Bundled [`StoreAdapter`] backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Arc<Mutex<TableData>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, name: &str) -> Result<Arc<Mutex<TableData>>, StoreError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound {
                table: name.to_string(),
            })
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn open_transaction(
        &self,
        table: &str,
    ) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let data = self.table(table)?;
        // Holding the owned guard for the life of the transaction is what
        // serializes conflicting access to the table.
        let guard = data.lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            completed: false,
        }))
    }

    async fn create_table(
        &self,
        table: &str,
        key_path: &str,
        auto_increment: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.entry(table.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(TableData {
                key_path: key_path.to_string(),
                auto_increment,
                next_key: 1,
                records: BTreeMap::new(),
            }))
        });
        Ok(())
    }

    fn has_table(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let tables: Vec<Arc<Mutex<TableData>>> =
            self.tables.read().values().cloned().collect();
        for table in tables {
            table.lock().await.records.clear();
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<(), StoreError> {
        self.tables.write().clear();
        Ok(())
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<TableData>,
    completed: bool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.completed {
            Err(StoreError::TransactionCompleted)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get_all(&mut self) -> Result<Vec<Record>, StoreError> {
        self.ensure_open()?;
        Ok(self.guard.records.values().cloned().collect())
    }

    async fn get(&mut self, key: &Value) -> Result<Option<Record>, StoreError> {
        self.ensure_open()?;
        Ok(self.guard.records.get(key).cloned())
    }

    async fn add(&mut self, record: &Record) -> Result<Value, StoreError> {
        self.ensure_open()?;
        let key = self.guard.resolve_key(record)?;
        if self.guard.records.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                key: format!("{key:?}"),
            });
        }
        let stored = self.guard.stored_record(record, &key);
        self.guard.records.insert(key.clone(), stored);
        Ok(key)
    }

    async fn put(&mut self, record: &Record) -> Result<Value, StoreError> {
        self.ensure_open()?;
        let key = self.guard.resolve_key(record)?;
        let stored = self.guard.stored_record(record, &key);
        self.guard.records.insert(key.clone(), stored);
        Ok(key)
    }

    async fn delete(&mut self, key: &Value) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.guard.records.remove(key);
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.guard.records.clear();
        Ok(())
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.completed = true;
        Ok(())
    }
}
