//! Managed-side values produced by the reference marshaller.

/// A marshalled value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer of any width, enums included; unsigned 64-bit values keep their bit pattern
    Integer(i64),
    /// `float` or `double`
    Float(f64),
    /// String payload
    String(String),
    /// Name handle
    Name(u64),
    /// Object or class handle, zero for null
    Object(u64),
    /// Struct members in declaration order
    Struct(Vec<(String, Value)>),
    /// Array elements
    Array(Vec<Value>),
}

impl Value {
    /// Member `name` of a struct value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Build a struct value from `(name, value)` pairs.
    pub fn structure<I, S>(fields: I) -> Value
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Value::Struct(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Name of the variant, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Name(_) => "name",
            Value::Object(_) => "object",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
        }
    }
}
