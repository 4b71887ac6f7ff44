//! Multi-row `INSERT ... ON DUPLICATE KEY UPDATE`.
//!
//! ```text
//! INSERT INTO T (f1,f2) VALUES (r1),(r2) ON DUPLICATE KEY UPDATE f2=VALUES(f2);
//! ```
//!
//! Rows either become `?` placeholders with collected values
//! ([`UpsertMode::Parameterized`]) or are written into the statement as SQL
//! literals ([`UpsertMode::Literal`]).

use mysqlmodel_core::{Error, FieldType, Result, Table, UpsertMode, Value, Values};

use crate::statement::{BindSpec, Statement};

/// An upsert statement and the values for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertStatement {
    pub statement: Statement,
    /// Empty in literal mode.
    pub values: Vec<Value>,
    /// Number of rows folded into the statement
    pub rows: usize,
}

/// Accumulates rows into one upsert statement.
#[derive(Debug, Clone)]
pub struct UpsertBuilder<'t> {
    table: &'t Table,
    mode: UpsertMode,
    rows: Vec<String>,
    bind: BindSpec,
    values: Vec<Value>,
}

impl<'t> UpsertBuilder<'t> {
    /// Start an upsert using the table's configured mode.
    pub fn start(table: &'t Table) -> Result<Self> {
        Self::start_with_mode(table, table.upsert_mode())
    }

    /// Start an upsert with an explicit mode.
    pub fn start_with_mode(table: &'t Table, mode: UpsertMode) -> Result<Self> {
        if !table.has_primary_key() || !table.has_regular_fields() {
            return Err(Error::unsupported(format!(
                "upsert on '{}' needs a primary key and at least one non-key field",
                table.name()
            )));
        }
        Ok(Self {
            table,
            mode,
            rows: Vec::new(),
            bind: BindSpec::new(),
            values: Vec::new(),
        })
    }

    /// Append one record's row.
    pub fn record(&mut self, values: &Values) -> &mut Self {
        let row = match self.mode {
            UpsertMode::Parameterized => {
                for field in self.table.fields() {
                    self.bind.push(field);
                    self.values
                        .push(values.get(&field.name).cloned().unwrap_or(Value::Null));
                }
                vec!["?"; self.table.fields().len()].join(",")
            }
            UpsertMode::Literal => self
                .table
                .fields()
                .iter()
                .map(|field| {
                    literal(
                        field.field_type,
                        values.get(&field.name).unwrap_or(&Value::Null),
                    )
                })
                .collect::<Vec<_>>()
                .join(","),
        };
        self.rows.push(format!("({row})"));
        self
    }

    /// Rows appended so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Close the statement.
    pub fn finish(self) -> Result<UpsertStatement> {
        if self.rows.is_empty() {
            return Err(Error::unsupported(format!(
                "upsert on '{}' without any rows",
                self.table.name()
            )));
        }

        let columns: Vec<&str> = self.table.fields().iter().map(|f| f.name.as_str()).collect();
        let updates: Vec<String> = self
            .table
            .regular_fields()
            .map(|f| format!("{0}=VALUES({0})", f.name))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {} ON DUPLICATE KEY UPDATE {};",
            self.table.name(),
            columns.join(","),
            self.rows.join(","),
            updates.join(", ")
        );
        tracing::trace!(table = %self.table.name(), rows = self.rows.len(), mode = ?self.mode, "built upsert");

        Ok(UpsertStatement {
            statement: Statement::new(sql, self.bind),
            values: self.values,
            rows: self.rows.len(),
        })
    }
}

/// Render a value as a SQL literal.
///
/// Text and bytes are wrapped in single quotes as-is. Nothing is escaped: a
/// quote inside the value ends the literal early.
fn literal(field_type: FieldType, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => match field_type {
            FieldType::Integer | FieldType::Double => if *b { "1" } else { "0" }.to_string(),
            FieldType::String | FieldType::Blob => format!("'{}'", if *b { "1" } else { "0" }),
        },
        Value::Int(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Text(s) => format!("'{s}'"),
        Value::Bytes(b) => format!("'{}'", String::from_utf8_lossy(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysqlmodel_core::Field;

    fn profiles(mode: UpsertMode) -> Table {
        Table::builder("profiles", "main")
            .field(Field::integer("id").auto_increment())
            .field(Field::string("nickname"))
            .field(Field::integer("active"))
            .field(Field::double("score"))
            .upsert_mode(mode)
            .build()
            .unwrap()
    }

    fn row(id: i64, nickname: Option<&str>, active: bool, score: Option<f64>) -> Values {
        let mut values = Values::new();
        values.insert("id".into(), Value::Int(id));
        values.insert("nickname".into(), Value::from(nickname));
        values.insert("active".into(), Value::Bool(active));
        values.insert("score".into(), Value::from(score));
        values
    }

    #[test]
    fn parameterized_rows_repeat_placeholders() {
        let table = profiles(UpsertMode::Parameterized);
        let mut builder = UpsertBuilder::start(&table).unwrap();
        builder.record(&row(1, Some("a"), true, Some(1.5)));
        builder.record(&row(2, None, false, None));
        let upsert = builder.finish().unwrap();

        assert_eq!(
            upsert.statement.sql(),
            "INSERT INTO profiles (id,nickname,active,score) VALUES (?,?,?,?),(?,?,?,?) \
             ON DUPLICATE KEY UPDATE nickname=VALUES(nickname), active=VALUES(active), score=VALUES(score);"
        );
        assert_eq!(upsert.statement.bind_spec().types(), "isidisid");
        assert_eq!(upsert.values.len(), 8);
        assert_eq!(upsert.values[5], Value::Null);
        assert_eq!(upsert.rows, 2);
    }

    #[test]
    fn literal_rows_render_null_and_booleans() {
        let table = profiles(UpsertMode::Literal);
        let mut builder = UpsertBuilder::start(&table).unwrap();
        builder.record(&row(7, None, true, None));
        let upsert = builder.finish().unwrap();

        let sql = upsert.statement.sql();
        assert!(sql.contains("VALUES (7,NULL,1,NULL) ON DUPLICATE KEY UPDATE"));
        assert!(!sql.contains('?'));
        assert!(upsert.values.is_empty());
        assert!(upsert.statement.params().is_empty());
    }

    #[test]
    fn literal_strings_are_quoted_verbatim() {
        let table = profiles(UpsertMode::Literal);
        let mut builder = UpsertBuilder::start(&table).unwrap();
        builder.record(&row(1, Some("o'brien"), false, Some(2.5)));
        let sql = builder.finish().unwrap().statement.sql().to_string();
        assert!(sql.contains("(1,'o'brien',0,2.5)"));
    }

    #[test]
    fn missing_fields_render_null() {
        let table = profiles(UpsertMode::Literal);
        let mut builder = UpsertBuilder::start(&table).unwrap();
        let mut values = Values::new();
        values.insert("id".into(), Value::Int(3));
        builder.record(&values);
        assert!(
            builder
                .finish()
                .unwrap()
                .statement
                .sql()
                .contains("(3,NULL,NULL,NULL)")
        );
    }

    #[test]
    fn unsupported_shapes() {
        let key_only = Table::builder("links", "main")
            .field(Field::integer("a").primary_key())
            .build()
            .unwrap();
        assert!(matches!(
            UpsertBuilder::start(&key_only),
            Err(Error::Unsupported(_))
        ));

        let table = profiles(UpsertMode::Parameterized);
        let empty = UpsertBuilder::start(&table).unwrap();
        assert!(matches!(empty.finish(), Err(Error::Unsupported(_))));
    }
}
