//! Statement synthesis for SELECT, INSERT, UPDATE, DELETE and COUNT.
//!
//! Formatting is fixed: `col=?` without spaces, `, ` between SET items,
//! ` AND ` between conditions, `,` between insert columns and placeholders,
//! and a trailing `;`.

use mysqlmodel_core::{Error, Field, Result, Table};

use crate::statement::{BindSpec, Statement};
use crate::upsert::UpsertBuilder;

/// Column alias used by [`StatementGenerator::count`].
pub const COUNT_ALIAS: &str = "counter";

/// Generates statements for one table. Pure: no I/O, same input, same text.
#[derive(Debug, Clone, Copy)]
pub struct StatementGenerator<'t> {
    table: &'t Table,
}

impl<'t> StatementGenerator<'t> {
    /// Create a generator for `table`.
    pub fn new(table: &'t Table) -> Self {
        Self { table }
    }

    /// The table statements are generated for.
    pub fn table(&self) -> &'t Table {
        self.table
    }

    /// `SELECT * FROM T WHERE k1=? AND k2=?;`
    pub fn select_by_id(&self) -> Result<Statement> {
        let (conditions, bind) = self.key_conditions("select by id")?;
        Ok(Statement::new(
            format!("SELECT * FROM {} WHERE {};", self.table.name(), conditions),
            bind,
        ))
    }

    /// `SELECT * FROM T;`
    pub fn select_all(&self) -> Statement {
        Statement::plain(format!("SELECT * FROM {};", self.table.name()))
    }

    /// `SELECT * FROM T WHERE f=?;`
    pub fn select_by_field(&self, name: &str) -> Result<Statement> {
        let field = self.table.field(name).ok_or_else(|| {
            Error::unsupported(format!(
                "table '{}' has no field '{}'",
                self.table.name(),
                name
            ))
        })?;
        let mut bind = BindSpec::new();
        bind.push(field);
        Ok(Statement::new(
            format!("SELECT * FROM {} WHERE {}=?;", self.table.name(), field.name),
            bind,
        ))
    }

    /// `SELECT count(*) AS counter FROM T;`
    pub fn count(&self) -> Statement {
        Statement::plain(format!(
            "SELECT count(*) AS {COUNT_ALIAS} FROM {};",
            self.table.name()
        ))
    }

    /// `INSERT[ IGNORE] INTO T (f1,f2) VALUES (?,?);` over every field.
    pub fn insert(&self) -> Statement {
        let mut bind = BindSpec::new();
        let mut columns = Vec::with_capacity(self.table.fields().len());
        for field in self.table.fields() {
            bind.push(field);
            columns.push(field.name.as_str());
        }
        let placeholders = vec!["?"; columns.len()].join(",");
        let verb = if self.table.insert_ignore() {
            "INSERT IGNORE INTO"
        } else {
            "INSERT INTO"
        };
        Statement::new(
            format!(
                "{verb} {} ({}) VALUES ({placeholders});",
                self.table.name(),
                columns.join(",")
            ),
            bind,
        )
    }

    /// `UPDATE T SET nk1=?, nk2=? WHERE k1=? AND k2=?;`
    ///
    /// Bind order is the non-key fields then the key fields, each in
    /// declaration order.
    pub fn update(&self) -> Result<Statement> {
        if !self.table.has_regular_fields() {
            return Err(Error::unsupported(format!(
                "update on '{}': every field is part of the primary key",
                self.table.name()
            )));
        }
        let (conditions, key_bind) = self.key_conditions("update")?;

        let mut bind = BindSpec::new();
        let assignments: Vec<String> = self
            .table
            .regular_fields()
            .map(|field| {
                bind.push(field);
                format!("{}=?", field.name)
            })
            .collect();
        bind.extend(&key_bind);

        Ok(Statement::new(
            format!(
                "UPDATE {} SET {} WHERE {};",
                self.table.name(),
                assignments.join(", "),
                conditions
            ),
            bind,
        ))
    }

    /// `DELETE FROM T WHERE k1=? AND k2=?;`
    pub fn delete(&self) -> Result<Statement> {
        let (conditions, bind) = self.key_conditions("delete")?;
        Ok(Statement::new(
            format!("DELETE FROM {} WHERE {};", self.table.name(), conditions),
            bind,
        ))
    }

    /// Can writes to this table be folded into one upsert statement?
    ///
    /// Requires a primary key and at least one non-key field for the
    /// `ON DUPLICATE KEY UPDATE` clause.
    pub fn can_use_upsert(&self) -> bool {
        self.table.has_primary_key() && self.table.has_regular_fields()
    }

    /// Start a multi-row upsert.
    pub fn upsert(&self) -> Result<UpsertBuilder<'t>> {
        UpsertBuilder::start(self.table)
    }

    /// Join `joined` onto this table; see [`first_level_join`](crate::join::first_level_join).
    pub fn first_level_join(
        &self,
        joined: &Table,
        joined_pk: &str,
        joined_fk: &str,
    ) -> Result<Statement> {
        crate::join::first_level_join(self.table, joined, joined_pk, joined_fk)
    }

    /// `k1=? AND k2=?` over the primary key, with its bind spec.
    fn key_conditions(&self, operation: &str) -> Result<(String, BindSpec)> {
        let keys: Vec<&Field> = self.table.primary_key_fields().collect();
        if keys.is_empty() {
            return Err(Error::unsupported(format!(
                "{operation} on '{}': table has no primary key",
                self.table.name()
            )));
        }
        let mut bind = BindSpec::new();
        let conditions: Vec<String> = keys
            .into_iter()
            .map(|field| {
                bind.push(field);
                format!("{}=?", field.name)
            })
            .collect();
        Ok((conditions.join(" AND "), bind))
    }
}
