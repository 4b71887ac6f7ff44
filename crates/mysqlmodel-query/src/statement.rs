//! Generated statements and their bind specifications.

use std::fmt;

use mysqlmodel_core::{BindType, Field, PendingWrite, Value, Values, WriteKind};

/// Positional parameters of a statement: one bind type and one field name
/// per `?`, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindSpec {
    types: String,
    fields: Vec<String>,
}

impl BindSpec {
    /// Create an empty bind spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a placeholder bound to `field`.
    pub fn push(&mut self, field: &Field) {
        self.push_raw(field.bind_type(), &field.name);
    }

    /// Append a placeholder with an explicit type and name.
    pub fn push_raw(&mut self, bind_type: BindType, name: &str) {
        self.types.push(bind_type.as_char());
        self.fields.push(name.to_string());
    }

    /// Append every placeholder of `other`.
    pub fn extend(&mut self, other: &BindSpec) {
        self.types.push_str(&other.types);
        self.fields.extend(other.fields.iter().cloned());
    }

    /// The bind type prefix, e.g. `"isd"`.
    pub fn types(&self) -> &str {
        &self.types
    }

    /// Bound field names, in placeholder order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Parsed bind types, in placeholder order.
    pub fn bind_types(&self) -> Vec<BindType> {
        BindType::parse_prefix(&self.types)
    }

    /// Number of placeholders.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `[typePrefix, name1, name2, ...]`; empty when there are no placeholders.
    pub fn params(&self) -> Vec<String> {
        if self.is_empty() {
            return Vec::new();
        }
        std::iter::once(self.types.clone())
            .chain(self.fields.iter().cloned())
            .collect()
    }

    /// Resolve the bound names against a record's values. Missing names bind NULL.
    pub fn bind(&self, values: &Values) -> Vec<Value> {
        self.fields
            .iter()
            .map(|name| values.get(name).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

/// SQL text plus the description of its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    bind: BindSpec,
}

impl Statement {
    /// Create a statement.
    pub fn new(sql: impl Into<String>, bind: BindSpec) -> Self {
        Self {
            sql: sql.into(),
            bind,
        }
    }

    /// A statement without placeholders.
    pub fn plain(sql: impl Into<String>) -> Self {
        Self::new(sql, BindSpec::new())
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bind specification.
    pub fn bind_spec(&self) -> &BindSpec {
        &self.bind
    }

    /// `[typePrefix, name1, name2, ...]`.
    pub fn params(&self) -> Vec<String> {
        self.bind.params()
    }

    /// Values for the placeholders, taken from `values`.
    pub fn bind(&self, values: &Values) -> Vec<Value> {
        self.bind.bind(values)
    }

    /// Stage this statement as a write for a record holding `values`.
    pub fn stage(&self, kind: WriteKind, values: &Values) -> PendingWrite {
        PendingWrite {
            kind,
            sql: self.sql.clone(),
            types: self.bind.types.clone(),
            values: self.bind(values),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
