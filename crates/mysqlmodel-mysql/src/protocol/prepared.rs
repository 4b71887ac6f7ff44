//! COM_STMT_PREPARE / COM_STMT_EXECUTE / COM_STMT_CLOSE.
//!
//! Parameters are sent with the binary protocol. Each value is first
//! coerced to the wire type named by its bind character:
//!
//! | bind | wire type    | conversions                                   |
//! |------|--------------|-----------------------------------------------|
//! | `i`  | `LONGLONG`   | bool as 0/1, double truncated                 |
//! | `d`  | `DOUBLE`     | bool and int widened                          |
//! | `s`  | `VAR_STRING` | numbers rendered as text                      |
//! | `b`  | `BLOB`       | everything sent as its byte representation    |
//!
//! Text bound as `i` or `d` is sent as a string and left to the server
//! to convert. NULL is always carried by the NULL bitmap.

#![allow(clippy::cast_possible_truncation)]

use mysqlmodel_core::{BindType, Value};

use super::{Command, PacketWriter, command_payload};
use crate::types::FieldType;

/// Response from COM_STMT_PREPARE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StmtPrepareOk {
    pub statement_id: u32,
    /// Columns in the result set (0 for statements without one)
    pub num_columns: u16,
    /// `?` placeholders in the statement
    pub num_params: u16,
    pub warnings: u16,
}

/// COM_STMT_PREPARE payload.
pub fn stmt_prepare_payload(sql: &str) -> Vec<u8> {
    command_payload(Command::StmtPrepare, sql.as_bytes())
}

/// COM_STMT_EXECUTE payload.
///
/// Layout: command, statement id (u32), cursor flags (0 = no cursor),
/// iteration count (always 1), then when there are parameters the NULL
/// bitmap, the new-params-bound flag (1), a type/flag byte pair per
/// parameter and the non-NULL values in order.
///
/// `types` and `params` must have the same length.
pub fn stmt_execute_payload(statement_id: u32, types: &[BindType], params: &[Value]) -> Vec<u8> {
    debug_assert_eq!(types.len(), params.len());
    let mut writer = PacketWriter::with_capacity(16 + params.len() * 16);
    writer.write_u8(Command::StmtExecute as u8);
    writer.write_u32_le(statement_id);
    writer.write_u8(0x00);
    writer.write_u32_le(1);

    if !params.is_empty() {
        let coerced: Vec<Value> = types
            .iter()
            .zip(params)
            .map(|(bind, value)| coerce_param(*bind, value))
            .collect();

        let mut null_bitmap = vec![0u8; coerced.len().div_ceil(8)];
        for (i, value) in coerced.iter().enumerate() {
            if value.is_null() {
                null_bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        writer.write_bytes(&null_bitmap);
        writer.write_u8(1);

        for value in &coerced {
            writer.write_u8(wire_type(value) as u8);
            writer.write_u8(0x00);
        }
        for value in &coerced {
            encode_param(&mut writer, value);
        }
    }

    writer.into_bytes()
}

/// COM_STMT_CLOSE payload. The server sends no response.
pub fn stmt_close_payload(statement_id: u32) -> Vec<u8> {
    command_payload(Command::StmtClose, &statement_id.to_le_bytes())
}

/// Parse a COM_STMT_PREPARE_OK payload: status 0x00, statement id (u32),
/// column count (u16), param count (u16), a reserved byte and the
/// warning count (u16).
pub fn parse_stmt_prepare_ok(data: &[u8]) -> Option<StmtPrepareOk> {
    let mut reader = super::PacketReader::new(data);
    if reader.read_u8()? != 0x00 {
        return None;
    }
    let statement_id = reader.read_u32_le()?;
    let num_columns = reader.read_u16_le()?;
    let num_params = reader.read_u16_le()?;
    reader.skip(1);
    let warnings = reader.read_u16_le()?;
    Some(StmtPrepareOk {
        statement_id,
        num_columns,
        num_params,
        warnings,
    })
}

/// Convert a value to the representation its bind character asks for.
///
/// The result is always `Null`, `Int`, `Double`, `Text` or `Bytes`.
pub fn coerce_param(bind: BindType, value: &Value) -> Value {
    match (bind, value) {
        (_, Value::Null) => Value::Null,

        (BindType::Integer, Value::Bool(b)) => Value::Int(i64::from(*b)),
        (BindType::Integer, Value::Double(d)) => Value::Int(*d as i64),
        (BindType::Integer, Value::Bytes(b)) => Value::Text(String::from_utf8_lossy(b).into_owned()),

        (BindType::Double, Value::Bool(b)) => Value::Double(f64::from(u8::from(*b))),
        #[allow(clippy::cast_precision_loss)]
        (BindType::Double, Value::Int(i)) => Value::Double(*i as f64),
        (BindType::Double, Value::Bytes(b)) => Value::Text(String::from_utf8_lossy(b).into_owned()),

        (BindType::String, Value::Bytes(b)) => Value::Bytes(b.clone()),
        (BindType::String, other) => Value::Text(render(other)),

        (BindType::Blob, Value::Bytes(b)) => Value::Bytes(b.clone()),
        (BindType::Blob, other) => Value::Bytes(render(other).into_bytes()),

        (_, other) => other.clone(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => u8::from(*b).to_string(),
        Value::Int(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

fn wire_type(value: &Value) -> FieldType {
    match value {
        Value::Null => FieldType::Null,
        Value::Bool(_) => FieldType::Tiny,
        Value::Int(_) => FieldType::LongLong,
        Value::Double(_) => FieldType::Double,
        Value::Text(_) => FieldType::VarString,
        Value::Bytes(_) => FieldType::Blob,
    }
}

fn encode_param(writer: &mut PacketWriter, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => writer.write_u8(u8::from(*b)),
        Value::Int(i) => writer.write_u64_le(*i as u64),
        Value::Double(d) => writer.write_bytes(&d.to_le_bytes()),
        Value::Text(s) => writer.write_lenenc_string(s),
        Value::Bytes(b) => writer.write_lenenc_bytes(b),
    }
}
