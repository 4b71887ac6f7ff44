//! MySQL column types and binary row decoding.
//!
//! Binary-protocol values are mapped onto the dynamic [`Value`]:
//!
//! - every integer type becomes `Int` (unsigned BIGINT beyond `i64::MAX`
//!   becomes `Text` holding the decimal digits)
//! - FLOAT and DOUBLE become `Double`
//! - string and blob types become `Text`, or `Bytes` when the column uses
//!   the binary character set
//! - DECIMAL, dates and times become `Text` in their usual SQL spelling

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use mysqlmodel_core::Value;

use crate::protocol::{PacketReader, charset};

/// MySQL field type codes (`MYSQL_TYPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0A,
    Time = 0x0B,
    DateTime = 0x0C,
    Year = 0x0D,
    NewDate = 0x0E,
    VarChar = 0x0F,
    Bit = 0x10,
    Timestamp2 = 0x11,
    DateTime2 = 0x12,
    Time2 = 0x13,
    Json = 0xF5,
    NewDecimal = 0xF6,
    Enum = 0xF7,
    Set = 0xF8,
    TinyBlob = 0xF9,
    MediumBlob = 0xFA,
    LongBlob = 0xFB,
    Blob = 0xFC,
    VarString = 0xFD,
    String = 0xFE,
    Geometry = 0xFF,
}

impl FieldType {
    /// Parse a type code. Unknown codes are treated as `String`.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Decimal,
            0x01 => Self::Tiny,
            0x02 => Self::Short,
            0x03 => Self::Long,
            0x04 => Self::Float,
            0x05 => Self::Double,
            0x06 => Self::Null,
            0x07 => Self::Timestamp,
            0x08 => Self::LongLong,
            0x09 => Self::Int24,
            0x0A => Self::Date,
            0x0B => Self::Time,
            0x0C => Self::DateTime,
            0x0D => Self::Year,
            0x0E => Self::NewDate,
            0x0F => Self::VarChar,
            0x10 => Self::Bit,
            0x11 => Self::Timestamp2,
            0x12 => Self::DateTime2,
            0x13 => Self::Time2,
            0xF5 => Self::Json,
            0xF6 => Self::NewDecimal,
            0xF7 => Self::Enum,
            0xF8 => Self::Set,
            0xF9 => Self::TinyBlob,
            0xFA => Self::MediumBlob,
            0xFB => Self::LongBlob,
            0xFC => Self::Blob,
            0xFD => Self::VarString,
            0xFF => Self::Geometry,
            _ => Self::String,
        }
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny
                | FieldType::Short
                | FieldType::Long
                | FieldType::LongLong
                | FieldType::Int24
                | FieldType::Year
        )
    }
}

/// Column definition flags.
pub mod column_flags {
    pub const NOT_NULL: u16 = 1;
    pub const PRIMARY_KEY: u16 = 2;
    pub const UNSIGNED: u16 = 32;
    pub const BINARY: u16 = 128;
    pub const AUTO_INCREMENT: u16 = 512;
}

/// Column definition (Protocol::ColumnDefinition41).
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub schema: String,
    /// Table name or alias
    pub table: String,
    /// Column name or alias, the key rows are addressed by
    pub name: String,
    pub charset: u16,
    pub column_length: u32,
    pub column_type: FieldType,
    pub flags: u16,
    pub decimals: u8,
}

impl ColumnDef {
    /// Parse a column definition packet.
    ///
    /// Layout: lenenc catalog, schema, table, org_table, name, org_name,
    /// lenenc length of fixed fields (0x0c), charset u16, length u32,
    /// type u8, flags u16, decimals u8, two filler bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = PacketReader::new(data);
        let _catalog = reader.read_lenenc_slice()?;
        let schema = reader.read_lenenc_string()?;
        let table = reader.read_lenenc_string()?;
        let _org_table = reader.read_lenenc_slice()?;
        let name = reader.read_lenenc_string()?;
        let _org_name = reader.read_lenenc_slice()?;
        let _fixed_len = reader.read_lenenc_int()?;
        let charset = reader.read_u16_le()?;
        let column_length = reader.read_u32_le()?;
        let column_type = FieldType::from_u8(reader.read_u8()?);
        let flags = reader.read_u16_le()?;
        let decimals = reader.read_u8()?;
        Some(Self {
            schema,
            table,
            name,
            charset,
            column_length,
            column_type,
            flags,
            decimals,
        })
    }

    #[must_use]
    pub const fn is_not_null(&self) -> bool {
        self.flags & column_flags::NOT_NULL != 0
    }

    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        self.flags & column_flags::UNSIGNED != 0
    }

    #[must_use]
    pub const fn is_auto_increment(&self) -> bool {
        self.flags & column_flags::AUTO_INCREMENT != 0
    }

    /// Does the column hold raw bytes rather than text?
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.charset == u16::from(charset::BINARY)
    }
}

/// Decode a binary-protocol result row.
///
/// Layout: 0x00 header, NULL bitmap of `(n + 7 + 2) / 8` bytes with a bit
/// offset of 2, then the non-NULL values in column order.
pub fn decode_binary_row(columns: &[ColumnDef], data: &[u8]) -> Option<Vec<Value>> {
    let mut reader = PacketReader::new(data);
    if reader.read_u8()? != 0x00 {
        return None;
    }
    let bitmap = reader.read_bytes((columns.len() + 7 + 2) / 8)?;

    let mut values = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        let bit = i + 2;
        if bitmap[bit / 8] & (1 << (bit % 8)) != 0 {
            values.push(Value::Null);
        } else {
            values.push(decode_binary_value(&mut reader, column)?);
        }
    }
    Some(values)
}

/// Decode one non-NULL value at the reader's position, consuming exactly
/// its encoded length.
pub fn decode_binary_value(reader: &mut PacketReader<'_>, column: &ColumnDef) -> Option<Value> {
    let unsigned = column.is_unsigned();
    let value = match column.column_type {
        FieldType::Tiny => {
            let b = reader.read_u8()?;
            Value::Int(if unsigned { i64::from(b) } else { i64::from(b as i8) })
        }
        FieldType::Short | FieldType::Year => {
            let v = reader.read_u16_le()?;
            Value::Int(if unsigned { i64::from(v) } else { i64::from(v as i16) })
        }
        FieldType::Long | FieldType::Int24 => {
            let v = reader.read_u32_le()?;
            Value::Int(if unsigned { i64::from(v) } else { i64::from(v as i32) })
        }
        FieldType::LongLong => {
            let v = reader.read_u64_le()?;
            match i64::try_from(v) {
                Ok(i) => Value::Int(i),
                Err(_) if unsigned => Value::Text(v.to_string()),
                Err(_) => Value::Int(v as i64),
            }
        }
        FieldType::Float => Value::Double(f64::from(f32::from_bits(reader.read_u32_le()?))),
        FieldType::Double => Value::Double(f64::from_bits(reader.read_u64_le()?)),
        FieldType::Null => Value::Null,
        FieldType::Date
        | FieldType::NewDate
        | FieldType::DateTime
        | FieldType::Timestamp
        | FieldType::DateTime2
        | FieldType::Timestamp2 => {
            let len = usize::from(reader.read_u8()?);
            Value::Text(format_datetime(column.column_type, reader.read_bytes(len)?))
        }
        FieldType::Time | FieldType::Time2 => {
            let len = usize::from(reader.read_u8()?);
            Value::Text(format_time(reader.read_bytes(len)?))
        }
        _ => {
            let bytes = reader.read_lenenc_slice()?;
            if column.is_binary() && column.column_type != FieldType::NewDecimal {
                Value::Bytes(bytes.to_vec())
            } else {
                Value::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    };
    Some(value)
}

/// Render a binary DATE/DATETIME/TIMESTAMP. The payload is 0, 4, 7 or 11
/// bytes: year u16, month, day, hour, minute, second, microseconds u32.
fn format_datetime(field_type: FieldType, data: &[u8]) -> String {
    let mut reader = PacketReader::new(data);
    let year = reader.read_u16_le().unwrap_or(0);
    let month = reader.read_u8().unwrap_or(0);
    let day = reader.read_u8().unwrap_or(0);
    let date = format!("{year:04}-{month:02}-{day:02}");
    if matches!(field_type, FieldType::Date | FieldType::NewDate) {
        return date;
    }

    let hour = reader.read_u8().unwrap_or(0);
    let minute = reader.read_u8().unwrap_or(0);
    let second = reader.read_u8().unwrap_or(0);
    match reader.read_u32_le() {
        Some(micros) if micros > 0 => {
            format!("{date} {hour:02}:{minute:02}:{second:02}.{micros:06}")
        }
        _ => format!("{date} {hour:02}:{minute:02}:{second:02}"),
    }
}

/// Render a binary TIME. The payload is 0, 8 or 12 bytes: sign, days u32,
/// hour, minute, second, microseconds u32.
fn format_time(data: &[u8]) -> String {
    let mut reader = PacketReader::new(data);
    let negative = reader.read_u8().unwrap_or(0) != 0;
    let days = reader.read_u32_le().unwrap_or(0);
    let hours = days * 24 + u32::from(reader.read_u8().unwrap_or(0));
    let minutes = reader.read_u8().unwrap_or(0);
    let seconds = reader.read_u8().unwrap_or(0);
    let sign = if negative { "-" } else { "" };
    match reader.read_u32_le() {
        Some(micros) if micros > 0 => {
            format!("{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
        }
        _ => format!("{sign}{hours:02}:{minutes:02}:{seconds:02}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketWriter;

    fn column(name: &str, column_type: FieldType, flags: u16, charset: u16) -> ColumnDef {
        ColumnDef {
            schema: "main".into(),
            table: "t".into(),
            name: name.into(),
            charset,
            column_length: 0,
            column_type,
            flags,
            decimals: 0,
        }
    }

    #[test]
    fn parse_column_definition() {
        let mut w = PacketWriter::new();
        for part in ["def", "main", "users", "users", "name", "name"] {
            w.write_lenenc_string(part);
        }
        w.write_lenenc_int(0x0c);
        w.write_u16_le(45);
        w.write_u32_le(1020);
        w.write_u8(FieldType::VarString as u8);
        w.write_u16_le(column_flags::NOT_NULL);
        w.write_u8(0);
        w.write_zeros(2);

        let def = ColumnDef::parse(w.as_bytes()).unwrap();
        assert_eq!(def.schema, "main");
        assert_eq!(def.table, "users");
        assert_eq!(def.name, "name");
        assert_eq!(def.column_type, FieldType::VarString);
        assert!(def.is_not_null());
        assert!(!def.is_binary());
    }

    #[test]
    fn decode_row_with_nulls_and_mixed_types() {
        let columns = vec![
            column("id", FieldType::LongLong, column_flags::AUTO_INCREMENT, 63),
            column("name", FieldType::VarString, 0, 45),
            column("score", FieldType::Double, 0, 63),
            column("payload", FieldType::Blob, 0, 63),
            column("small", FieldType::Tiny, 0, 63),
        ];
        let mut w = PacketWriter::new();
        w.write_u8(0x00);
        // name (column 1) is NULL: bit 1 + 2 = 3
        w.write_bytes(&[0b0000_1000]);
        w.write_u64_le(42);
        w.write_bytes(&1.5f64.to_le_bytes());
        w.write_lenenc_bytes(&[0xDE, 0xAD]);
        w.write_u8(0xFF);

        let values = decode_binary_row(&columns, w.as_bytes()).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(42),
                Value::Null,
                Value::Double(1.5),
                Value::Bytes(vec![0xDE, 0xAD]),
                Value::Int(-1),
            ]
        );
    }

    #[test]
    fn text_blobs_decode_as_text() {
        let columns = vec![column("bio", FieldType::Blob, 0, 255)];
        let mut w = PacketWriter::new();
        w.write_u8(0x00);
        w.write_u8(0x00);
        w.write_lenenc_string("héllo");
        let values = decode_binary_row(&columns, w.as_bytes()).unwrap();
        assert_eq!(values, vec![Value::Text("héllo".into())]);
    }

    #[test]
    fn unsigned_integers() {
        let columns = vec![
            column("a", FieldType::Tiny, column_flags::UNSIGNED, 63),
            column("b", FieldType::LongLong, column_flags::UNSIGNED, 63),
        ];
        let mut w = PacketWriter::new();
        w.write_u8(0x00);
        w.write_u8(0x00);
        w.write_u8(200);
        w.write_u64_le(u64::MAX);
        let values = decode_binary_row(&columns, w.as_bytes()).unwrap();
        assert_eq!(values[0], Value::Int(200));
        assert_eq!(values[1], Value::Text(u64::MAX.to_string()));
    }

    #[test]
    fn datetimes_and_times() {
        let columns = vec![
            column("created", FieldType::DateTime, 0, 63),
            column("day", FieldType::Date, 0, 63),
            column("span", FieldType::Time, 0, 63),
        ];
        let mut w = PacketWriter::new();
        w.write_u8(0x00);
        w.write_u8(0x00);
        w.write_u8(7);
        w.write_u16_le(2024);
        w.write_bytes(&[3, 9, 14, 5, 30]);
        w.write_u8(4);
        w.write_u16_le(2024);
        w.write_bytes(&[12, 31]);
        w.write_u8(8);
        w.write_u8(1);
        w.write_u32_le(1);
        w.write_bytes(&[2, 3, 4]);

        let values = decode_binary_row(&columns, w.as_bytes()).unwrap();
        assert_eq!(values[0], Value::Text("2024-03-09 14:05:30".into()));
        assert_eq!(values[1], Value::Text("2024-12-31".into()));
        assert_eq!(values[2], Value::Text("-26:03:04".into()));
    }

    #[test]
    fn zero_length_datetime() {
        let columns = vec![column("t", FieldType::Timestamp, 0, 63)];
        let values = decode_binary_row(&columns, &[0x00, 0x00, 0x00]).unwrap();
        assert_eq!(values[0], Value::Text("0000-00-00 00:00:00".into()));
    }

    #[test]
    fn truncated_row_is_rejected() {
        let columns = vec![column("id", FieldType::LongLong, 0, 63)];
        assert!(decode_binary_row(&columns, &[0x00, 0x00, 1, 2]).is_none());
    }
}
