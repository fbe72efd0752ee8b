/// Runtime configuration for a kvorm instance.
#[derive(Debug, Clone)]
pub struct KvormConfig {
    /// Database name, passed through to the store adapter.
    pub name: String,
    /// Schema version. Bump when table definitions change so adapters that
    /// persist definitions can migrate.
    pub version: u32,
    /// When set, a keyed update targeting a missing record is an error
    /// instead of an empty result.
    pub strict_update: bool,
}

impl Default for KvormConfig {
    fn default() -> Self {
        Self {
            name: "kvorm".to_string(),
            version: 1,
            strict_update: false,
        }
    }
}

impl KvormConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
