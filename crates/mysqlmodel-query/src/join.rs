//! First-level join between two registered tables.

use mysqlmodel_core::{BindType, Error, Result, Table};

use crate::statement::{BindSpec, Statement};

/// `SELECT J.*, T.* FROM T JOIN J ON T.pk=J.fk WHERE J.joined_pk=?;`
///
/// `table` must have a single-column primary key; `joined_pk` and
/// `joined_fk` must be columns of `joined`. The one parameter binds as an
/// integer under the name `joined_pk`.
pub fn first_level_join(
    table: &Table,
    joined: &Table,
    joined_pk: &str,
    joined_fk: &str,
) -> Result<Statement> {
    let mut keys = table.primary_key_fields();
    let (Some(pk), None) = (keys.next(), keys.next()) else {
        return Err(Error::unsupported(format!(
            "join from '{}' needs a single-column primary key",
            table.name()
        )));
    };
    for column in [joined_pk, joined_fk] {
        if joined.field(column).is_none() {
            return Err(Error::unsupported(format!(
                "joined table '{}' has no field '{}'",
                joined.name(),
                column
            )));
        }
    }

    let mut bind = BindSpec::new();
    bind.push_raw(BindType::Integer, joined_pk);
    let (t, j) = (table.name(), joined.name());
    Ok(Statement::new(
        format!(
            "SELECT {j}.*, {t}.* FROM {t} JOIN {j} ON {t}.{}={j}.{joined_fk} WHERE {j}.{joined_pk}=?;",
            pk.name
        ),
        bind,
    ))
}
