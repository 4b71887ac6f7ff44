//! Table metadata and the static table registry.
//!
//! Tables are described once at startup with [`Table::builder`] and
//! registered in a [`TableRegistry`]; nothing is discovered at runtime.
//!
//! ```
//! use mysqlmodel_core::{Field, Table, TableRegistry};
//!
//! let users = Table::builder("users", "main")
//!     .field(Field::integer("id").auto_increment())
//!     .field(Field::string("name"))
//!     .build()
//!     .unwrap();
//!
//! let mut registry = TableRegistry::new();
//! registry.register(users).unwrap();
//! assert!(registry.get("users").is_some());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::error::{Error, Result};
use crate::field::{BindType, Field};

/// How multi-row upserts carry their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpsertMode {
    /// `?` placeholders with bound values.
    #[default]
    Parameterized,
    /// Values embedded as SQL literals, strings single-quoted without any
    /// escaping. Only for callers that need the exact legacy statement text:
    /// a quote inside a value breaks the statement and allows injection.
    Literal,
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
    })
}

/// Check that a table or column name is a plain SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

/// Metadata for one table: its columns in declaration order plus options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    database: String,
    fields: Vec<Field>,
    insert_ignore: bool,
    upsert_mode: UpsertMode,
}

impl Table {
    /// Start describing a table stored in the given logical database.
    pub fn builder(name: impl Into<String>, database: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            database: database.into(),
            fields: Vec::new(),
            insert_ignore: false,
            upsert_mode: UpsertMode::default(),
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical database name the table lives in.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// All fields, in column order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by column name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Primary-key fields, in declaration order.
    pub fn primary_key_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    /// Non-key fields, in declaration order.
    pub fn regular_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.primary_key)
    }

    /// The auto-increment field, if any.
    pub fn auto_increment_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.auto_increment)
    }

    /// Does the table declare a primary key?
    pub fn has_primary_key(&self) -> bool {
        self.fields.iter().any(|f| f.primary_key)
    }

    /// Does the table have at least one non-key field?
    pub fn has_regular_fields(&self) -> bool {
        self.fields.iter().any(|f| !f.primary_key)
    }

    /// Whether inserts use `INSERT IGNORE`.
    pub fn insert_ignore(&self) -> bool {
        self.insert_ignore
    }

    /// How upserts embed their values.
    pub fn upsert_mode(&self) -> UpsertMode {
        self.upsert_mode
    }

    /// Bind types of the given fields, concatenated into a prefix string.
    pub fn type_prefix<'a>(fields: impl IntoIterator<Item = &'a Field>) -> String {
        fields
            .into_iter()
            .map(|f| f.bind_type().as_char())
            .collect()
    }

    /// Bind type of a named field.
    pub fn bind_type_of(&self, name: &str) -> Option<BindType> {
        self.field(name).map(Field::bind_type)
    }
}

/// Builder for [`Table`].
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    database: String,
    fields: Vec<Field>,
    insert_ignore: bool,
    upsert_mode: UpsertMode,
}

impl TableBuilder {
    /// Append a column.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Use `INSERT IGNORE` for inserts.
    pub fn insert_ignore(mut self, enabled: bool) -> Self {
        self.insert_ignore = enabled;
        self
    }

    /// Choose how upserts embed values.
    pub fn upsert_mode(mut self, mode: UpsertMode) -> Self {
        self.upsert_mode = mode;
        self
    }

    /// Validate and build the table.
    pub fn build(self) -> Result<Table> {
        if !is_valid_identifier(&self.name) {
            return Err(Error::invalid_config(format!(
                "invalid table name '{}'",
                self.name
            )));
        }
        if self.fields.is_empty() {
            return Err(Error::invalid_config(format!(
                "table '{}' declares no fields",
                self.name
            )));
        }

        let mut fields = self.fields;
        for (i, field) in fields.iter().enumerate() {
            if !is_valid_identifier(&field.name) {
                return Err(Error::invalid_config(format!(
                    "invalid column name '{}' in table '{}'",
                    field.name, self.name
                )));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::invalid_config(format!(
                    "duplicate column '{}' in table '{}'",
                    field.name, self.name
                )));
            }
        }
        if fields.iter().filter(|f| f.auto_increment).count() > 1 {
            return Err(Error::invalid_config(format!(
                "table '{}' declares more than one auto-increment field",
                self.name
            )));
        }

        for field in &mut fields {
            if field.auto_increment {
                field.primary_key = true;
            }
            field.qualify(&self.name);
        }

        if !fields.iter().any(|f| f.primary_key) {
            tracing::debug!(
                table = %self.name,
                "table has no primary key; key-based operations are unavailable"
            );
        }

        Ok(Table {
            name: self.name,
            database: self.database,
            fields,
            insert_ignore: self.insert_ignore,
            upsert_mode: self.upsert_mode,
        })
    }
}

/// Startup-built mapping from table name to its metadata.
#[derive(Debug, Default, Clone)]
pub struct TableRegistry {
    tables: HashMap<String, Arc<Table>>,
}

impl TableRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Registering the same name twice is an error.
    pub fn register(&mut self, table: Table) -> Result<Arc<Table>> {
        if self.tables.contains_key(table.name()) {
            return Err(Error::invalid_config(format!(
                "table '{}' is already registered",
                table.name()
            )));
        }
        let table = Arc::new(table);
        self.tables
            .insert(table.name().to_string(), Arc::clone(&table));
        Ok(table)
    }

    /// Look up a table by name.
    pub fn get(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.get(name).cloned()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Is the registry empty?
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterate over registered tables (unordered).
    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn orders() -> Table {
        Table::builder("orders", "shop")
            .field(Field::integer("shop_id").primary_key())
            .field(Field::integer("order_no").primary_key())
            .field(Field::string("customer"))
            .field(Field::double("total"))
            .build()
            .unwrap()
    }

    #[test]
    fn field_subsets_keep_declaration_order() {
        let table = orders();
        let keys: Vec<_> = table.primary_key_fields().map(|f| f.name.as_str()).collect();
        let regular: Vec<_> = table.regular_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(keys, ["shop_id", "order_no"]);
        assert_eq!(regular, ["customer", "total"]);
        assert_eq!(Table::type_prefix(table.fields()), "iisd");
    }

    #[test]
    fn fields_are_qualified_with_table_name() {
        let table = orders();
        assert_eq!(
            table.field("customer").unwrap().fully_qualified_name,
            "orders.customer"
        );
    }

    #[test]
    fn rejects_two_auto_increment_fields() {
        let err = Table::builder("t", "main")
            .field(Field::integer("a").auto_increment())
            .field(Field::integer("b").auto_increment())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than one auto-increment"));
    }

    #[test]
    fn rejects_bad_identifiers_and_duplicates() {
        assert!(
            Table::builder("users; DROP", "main")
                .field(Field::integer("id"))
                .build()
                .is_err()
        );
        assert!(
            Table::builder("users", "main")
                .field(Field::integer("id"))
                .field(Field::new("id", FieldType::String))
                .build()
                .is_err()
        );
        assert!(Table::builder("empty", "main").build().is_err());
    }

    #[test]
    fn keyless_table_is_allowed() {
        let table = Table::builder("log", "main")
            .field(Field::string("line"))
            .build()
            .unwrap();
        assert!(!table.has_primary_key());
        assert!(table.auto_increment_field().is_none());
    }

    #[test]
    fn registry_rejects_duplicates() {
        let mut registry = TableRegistry::new();
        registry.register(orders()).unwrap();
        assert!(registry.register(orders()).is_err());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("orders").unwrap().database(), "shop");
    }
}
