//! Field (column) definitions.

use std::fmt;

/// Storage class of a column, as seen by the MySQL bind protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Double,
    String,
    Blob,
}

impl FieldType {
    /// The single-character MySQL bind type for this field type.
    pub const fn bind_type(self) -> BindType {
        match self {
            FieldType::Integer => BindType::Integer,
            FieldType::Double => BindType::Double,
            FieldType::String => BindType::String,
            FieldType::Blob => BindType::Blob,
        }
    }
}

/// MySQL client bind type code (`i`, `d`, `s`, `b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindType {
    Integer,
    Double,
    String,
    Blob,
}

impl BindType {
    /// The bind type character.
    pub const fn as_char(self) -> char {
        match self {
            BindType::Integer => 'i',
            BindType::Double => 'd',
            BindType::String => 's',
            BindType::Blob => 'b',
        }
    }

    /// Parse a bind type character; anything unknown binds as blob.
    pub const fn from_char(c: char) -> Self {
        match c {
            'i' => BindType::Integer,
            'd' => BindType::Double,
            's' => BindType::String,
            _ => BindType::Blob,
        }
    }

    /// Parse a whole type prefix such as `"isd"`.
    pub fn parse_prefix(prefix: &str) -> Vec<Self> {
        prefix.chars().map(Self::from_char).collect()
    }
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Metadata about one column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name
    pub name: String,
    /// `table.column`, filled in when the field is attached to a table
    pub fully_qualified_name: String,
    /// Storage class
    pub field_type: FieldType,
    /// Part of the primary key
    pub primary_key: bool,
    /// Server-generated auto-increment value
    pub auto_increment: bool,
    /// Stamped with the write time on insert
    pub create_timestamp: bool,
    /// Stamped with the write time on insert and update
    pub update_timestamp: bool,
}

impl Field {
    /// Create a new field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            fully_qualified_name: name.clone(),
            name,
            field_type,
            primary_key: false,
            auto_increment: false,
            create_timestamp: false,
            update_timestamp: false,
        }
    }

    /// Integer column.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// Double column.
    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Double)
    }

    /// String column.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Blob column.
    pub fn blob(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Blob)
    }

    /// Mark as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as auto-increment. Auto-increment implies primary key.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.primary_key = true;
        self
    }

    /// Stamp with the write time when the record is inserted.
    pub fn create_timestamp(mut self) -> Self {
        self.create_timestamp = true;
        self
    }

    /// Stamp with the write time whenever the record is written.
    pub fn update_timestamp(mut self) -> Self {
        self.update_timestamp = true;
        self
    }

    /// The bind type character for this field.
    pub fn bind_type(&self) -> BindType {
        self.field_type.bind_type()
    }

    pub(crate) fn qualify(&mut self, table: &str) {
        self.fully_qualified_name = format!("{table}.{}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_type_mapping_is_total() {
        assert_eq!(FieldType::Integer.bind_type().as_char(), 'i');
        assert_eq!(FieldType::Double.bind_type().as_char(), 'd');
        assert_eq!(FieldType::String.bind_type().as_char(), 's');
        assert_eq!(FieldType::Blob.bind_type().as_char(), 'b');
    }

    #[test]
    fn unknown_bind_char_falls_back_to_blob() {
        assert_eq!(BindType::from_char('x'), BindType::Blob);
        assert_eq!(
            BindType::parse_prefix("isdb"),
            vec![
                BindType::Integer,
                BindType::String,
                BindType::Double,
                BindType::Blob
            ]
        );
    }

    #[test]
    fn auto_increment_implies_primary_key() {
        let field = Field::integer("id").auto_increment();
        assert!(field.primary_key);
        assert!(field.auto_increment);
    }
}
