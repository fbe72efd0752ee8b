use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvormErrorCode {
    NotConnected,
    MissingPrimaryKey,
    DuplicateKey,
    RecordNotFound,
    PrematureCommit,
    TableNotFound,
    InvalidChain,
    TypeMismatch,
    Validation,
    Store,
}

impl KvormErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            KvormErrorCode::NotConnected => "not_connected",
            KvormErrorCode::MissingPrimaryKey => "missing_primary_key",
            KvormErrorCode::DuplicateKey => "duplicate_key",
            KvormErrorCode::RecordNotFound => "record_not_found",
            KvormErrorCode::PrematureCommit => "premature_commit",
            KvormErrorCode::TableNotFound => "table_not_found",
            KvormErrorCode::InvalidChain => "invalid_chain",
            KvormErrorCode::TypeMismatch => "type_mismatch",
            KvormErrorCode::Validation => "validation",
            KvormErrorCode::Store => "store",
        }
    }
}

#[derive(Debug, Error)]
pub enum KvormError {
    #[error("engine has no open store connection")]
    NotConnected,
    #[error("table '{table}' declares no primary key field")]
    MissingPrimaryKey { table: String },
    #[error("duplicate key in table '{table}': {key}")]
    DuplicateKey { table: String, key: String },
    #[error("record not found in table '{table}': {key}")]
    RecordNotFound { table: String, key: String },
    #[error("transaction completed before pipeline processing finished")]
    PrematureCommit,
    #[error("table '{table}' is not declared in the schema")]
    TableNotFound { table: String },
    #[error("invalid operation chain: {reason}")]
    InvalidChain { reason: String },
    #[error("type mismatch: field '{field}' in table '{table}' expected {expected}, got {actual}")]
    TypeMismatch {
        table: String,
        field: String,
        expected: String,
        actual: String,
    },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
}

impl KvormError {
    pub fn code(&self) -> KvormErrorCode {
        match self {
            KvormError::NotConnected => KvormErrorCode::NotConnected,
            KvormError::MissingPrimaryKey { .. } => KvormErrorCode::MissingPrimaryKey,
            KvormError::DuplicateKey { .. } => KvormErrorCode::DuplicateKey,
            KvormError::RecordNotFound { .. } => KvormErrorCode::RecordNotFound,
            KvormError::PrematureCommit => KvormErrorCode::PrematureCommit,
            KvormError::TableNotFound { .. } => KvormErrorCode::TableNotFound,
            KvormError::InvalidChain { .. } => KvormErrorCode::InvalidChain,
            KvormError::TypeMismatch { .. } => KvormErrorCode::TypeMismatch,
            KvormError::Validation(_) => KvormErrorCode::Validation,
            KvormError::Store(_) => KvormErrorCode::Store,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    /// Maps a store-level failure into the engine error space, attaching the
    /// table the pipeline was operating on.
    pub(crate) fn from_store(table: &str, err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { key } => KvormError::DuplicateKey {
                table: table.to_string(),
                key,
            },
            StoreError::TableNotFound { table } => KvormError::TableNotFound { table },
            StoreError::MissingKey => KvormError::Validation(format!(
                "record for table '{table}' carries no primary key value"
            )),
            StoreError::TransactionCompleted => KvormError::PrematureCommit,
            StoreError::Backend(msg) => KvormError::Store(msg),
        }
    }
}
