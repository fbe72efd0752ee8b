pub mod field;
pub mod types;

use crate::error::KvormError;
use field::{FieldKind, FieldSchema};
use std::collections::BTreeMap;

/// Unvalidated fluent declaration of one table. Turned into a
/// [`TableSchema`] when the owning [`DatabaseSchema`] is built.
#[derive(Debug, Clone)]
pub struct TableSpec {
    name: String,
    fields: BTreeMap<String, FieldSchema>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.fields.insert(name.into(), schema);
        self
    }

    fn build(self) -> Result<TableSchema, KvormError> {
        let mut primary_key: Option<String> = None;
        for (name, field) in &self.fields {
            if field.primary_key {
                if primary_key.is_some() {
                    return Err(KvormError::Validation(format!(
                        "table '{}' declares more than one primary key field",
                        self.name
                    )));
                }
                primary_key = Some(name.clone());
            }
            if field.auto_increment {
                if !field.primary_key {
                    return Err(KvormError::Validation(format!(
                        "table '{}' field '{}': auto_increment requires primary_key",
                        self.name, name
                    )));
                }
                if !matches!(field.kind, FieldKind::Number) {
                    return Err(KvormError::Validation(format!(
                        "table '{}' field '{}': auto_increment requires a number field",
                        self.name, name
                    )));
                }
            }
        }

        let primary_key = primary_key.ok_or_else(|| KvormError::MissingPrimaryKey {
            table: self.name.clone(),
        })?;
        let auto_increment = self.fields[&primary_key].auto_increment;

        Ok(TableSchema {
            name: self.name,
            fields: self.fields,
            primary_key,
            auto_increment,
        })
    }
}

/// Validated per-table schema: field map plus the resolved primary key.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    fields: BTreeMap<String, FieldSchema>,
    primary_key: String,
    auto_increment: bool,
}

impl TableSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldSchema)> {
        self.fields.iter()
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn primary_key_field(&self) -> &FieldSchema {
        &self.fields[&self.primary_key]
    }
}

/// Immutable mapping from table name to table schema, shared by reference by
/// every handle derived from the owning engine instance.
#[derive(Debug, Clone)]
pub struct DatabaseSchema {
    tables: BTreeMap<String, TableSchema>,
}

impl DatabaseSchema {
    pub fn builder() -> DatabaseSchemaBuilder {
        DatabaseSchemaBuilder { tables: Vec::new() }
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSchemaBuilder {
    tables: Vec<TableSpec>,
}

impl DatabaseSchemaBuilder {
    pub fn table(mut self, spec: TableSpec) -> Self {
        self.tables.push(spec);
        self
    }

    pub fn build(self) -> Result<DatabaseSchema, KvormError> {
        let mut tables = BTreeMap::new();
        for spec in self.tables {
            let name = spec.name.clone();
            if tables.contains_key(&name) {
                return Err(KvormError::Validation(format!(
                    "table '{name}' is declared twice"
                )));
            }
            tables.insert(name, spec.build()?);
        }
        Ok(DatabaseSchema { tables })
    }
}

#[cfg(test)]
mod tests {
    use super::{DatabaseSchema, TableSpec};
    use crate::error::{KvormError, KvormErrorCode};
    use crate::schema::field::FieldSchema;

    #[test]
    fn build_resolves_primary_key() {
        let schema = DatabaseSchema::builder()
            .table(
                TableSpec::new("users")
                    .field("id", FieldSchema::text().primary_key())
                    .field("name", FieldSchema::text().required()),
            )
            .build()
            .expect("schema");
        let users = schema.table("users").expect("users");
        assert_eq!(users.primary_key(), "id");
        assert!(!users.auto_increment());
    }

    #[test]
    fn table_without_primary_key_is_rejected() {
        let err = DatabaseSchema::builder()
            .table(TableSpec::new("logs").field("message", FieldSchema::text()))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), KvormErrorCode::MissingPrimaryKey);
    }

    #[test]
    fn two_primary_keys_are_rejected() {
        let err = DatabaseSchema::builder()
            .table(
                TableSpec::new("pairs")
                    .field("a", FieldSchema::text().primary_key())
                    .field("b", FieldSchema::text().primary_key()),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, KvormError::Validation(_)));
    }

    #[test]
    fn auto_increment_requires_numeric_primary_key() {
        let err = DatabaseSchema::builder()
            .table(
                TableSpec::new("orders")
                    .field("id", FieldSchema::text().primary_key().auto_increment()),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, KvormError::Validation(_)));

        let ok = DatabaseSchema::builder()
            .table(
                TableSpec::new("orders")
                    .field("id", FieldSchema::number().primary_key().auto_increment()),
            )
            .build()
            .expect("schema");
        assert!(ok.table("orders").expect("orders").auto_increment());
    }
}
