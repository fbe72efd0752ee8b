use crate::schema::types::{IntoValue, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Where a field's resolved value comes from when the caller omits it.
#[derive(Clone)]
pub enum DefaultValue {
    /// Deep-copied into every resolved record.
    Literal(Value),
    /// Invoked with no arguments at resolution time, so e.g. a current-time
    /// default captures the instant of insertion.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn materialize(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Array(Box<FieldSchema>),
    Object(BTreeMap<String, FieldSchema>),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array(_) => "array",
            FieldKind::Object(_) => "object",
        }
    }
}

/// Recursive descriptor for one declared field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub primary_key: bool,
    pub auto_increment: bool,
}

/// Error carrier for a runtime type check, path-qualified so nested
/// mismatches point at the offending sub-field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCheck {
    pub path: String,
    pub expected: &'static str,
    pub actual: &'static str,
}

impl FieldSchema {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            primary_key: false,
            auto_increment: false,
        }
    }

    pub fn text() -> Self {
        Self::of(FieldKind::Text)
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn array(items: FieldSchema) -> Self {
        Self::of(FieldKind::Array(Box::new(items)))
    }

    pub fn object(fields: impl IntoIterator<Item = (&'static str, FieldSchema)>) -> Self {
        Self::of(FieldKind::Object(
            fields
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
        ))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl IntoValue) -> Self {
        self.default = Some(DefaultValue::Literal(value.into_value()));
        self
    }

    pub fn default_factory(
        mut self,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(DefaultValue::Factory(Arc::new(factory)));
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// A field's resolved value is always present when it is explicitly
    /// required, carries a default, or is the primary key.
    pub fn effectively_required(&self) -> bool {
        self.required || self.default.is_some() || self.primary_key
    }

    /// Checks a raw value against this schema, recursing into arrays and
    /// objects. `Null` passes only for fields that are not effectively
    /// required.
    pub fn check(&self, path: &str, value: &Value) -> Result<(), TypeCheck> {
        if value.is_null() {
            if self.effectively_required() {
                return Err(TypeCheck {
                    path: path.to_string(),
                    expected: self.kind.name(),
                    actual: "null",
                });
            }
            return Ok(());
        }

        let ok = match (&self.kind, value) {
            (FieldKind::Text, Value::Text(_)) => true,
            (FieldKind::Number, Value::Integer(_) | Value::Float(_)) => true,
            (FieldKind::Boolean, Value::Boolean(_)) => true,
            (FieldKind::Array(items), Value::Array(elems)) => {
                for (idx, elem) in elems.iter().enumerate() {
                    items.check(&format!("{path}[{idx}]"), elem)?;
                }
                true
            }
            // Only declared sub-fields are checked; an object schema with no
            // declared sub-fields accepts any object value.
            (FieldKind::Object(fields), Value::Object(entries)) => {
                for (name, schema) in fields {
                    if let Some(sub) = entries.get(name) {
                        schema.check(&format!("{path}.{name}"), sub)?;
                    }
                }
                true
            }
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(TypeCheck {
                path: path.to_string(),
                expected: self.kind.name(),
                actual: value.kind_name(),
            })
        }
    }
}
