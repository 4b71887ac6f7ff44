//! Records and snapshot-based dirty tracking.
//!
//! A [`Record`] holds the current column values of one row, the snapshot
//! taken at the last successful read or write, and (transiently) the write
//! staged for it by a batch. The staged write lives beside the values, never
//! among them, so it cannot leak into what callers see.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::field::{Field, FieldType};
use crate::row::Row;
use crate::table::Table;
use crate::value::Value;

/// Column name -> value mapping.
pub type Values = BTreeMap<String, Value>;

/// Persistence status of a record, derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Never persisted (no snapshot).
    New,
    /// Every value strictly equals its snapshot.
    Unchanged,
    /// At least one value differs from its snapshot.
    Updated,
    /// Explicitly marked for deletion.
    Deleted,
}

/// Kind of write staged for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl WriteKind {
    /// The write that persists a record in the given status, if any.
    pub const fn for_status(status: RecordStatus) -> Option<Self> {
        match status {
            RecordStatus::New => Some(WriteKind::Insert),
            RecordStatus::Updated => Some(WriteKind::Update),
            RecordStatus::Deleted => Some(WriteKind::Delete),
            RecordStatus::Unchanged => None,
        }
    }
}

/// A write staged between "prepare batch" and "execute batch".
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub kind: WriteKind,
    pub sql: String,
    /// Bind type prefix, one character per value
    pub types: String,
    pub values: Vec<Value>,
}

/// One row of a table as held by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Values,
    snapshot: Option<Values>,
    pending: Option<PendingWrite>,
    deleted: bool,
}

impl Record {
    /// Create an empty, new record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new record from column values.
    pub fn from_values(values: Values) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Build a record from a fetched row and stamp its snapshot.
    pub fn from_row(row: Row) -> Self {
        let mut record = Self::from_values(row.into_pairs().collect());
        record.stamp_snapshot();
        record
    }

    /// Builder-style setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a column value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Get a column value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Current column values.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Snapshot taken at the last successful read or write.
    pub fn snapshot(&self) -> Option<&Values> {
        self.snapshot.as_ref()
    }

    /// Classify the record against its snapshot.
    pub fn status(&self) -> RecordStatus {
        if self.deleted {
            return RecordStatus::Deleted;
        }
        match &self.snapshot {
            None => RecordStatus::New,
            Some(snapshot) if *snapshot == self.values => RecordStatus::Unchanged,
            Some(_) => RecordStatus::Updated,
        }
    }

    /// Names of columns whose value differs from the snapshot.
    pub fn changed_fields(&self) -> Vec<&str> {
        let Some(snapshot) = &self.snapshot else {
            return self.values.keys().map(String::as_str).collect();
        };
        let mut changed: Vec<&str> = self
            .values
            .iter()
            .filter(|(name, value)| snapshot.get(*name) != Some(*value))
            .map(|(name, _)| name.as_str())
            .collect();
        changed.extend(
            snapshot
                .keys()
                .filter(|name| !self.values.contains_key(*name))
                .map(String::as_str),
        );
        changed
    }

    /// Force the record onto the delete path.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Was the record marked for deletion?
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Replace the snapshot with the current values.
    pub fn stamp_snapshot(&mut self) {
        tracing::trace!(columns = self.values.len(), "Stamping record snapshot");
        self.snapshot = Some(self.values.clone());
    }

    /// Write stamped by the current batch, if any.
    pub fn pending(&self) -> Option<&PendingWrite> {
        self.pending.as_ref()
    }

    /// Stage a write for the next batch execution.
    pub fn stage(&mut self, write: PendingWrite) {
        self.pending = Some(write);
    }

    /// Remove and return the staged write.
    pub fn take_pending(&mut self) -> Option<PendingWrite> {
        self.pending.take()
    }

    /// Set the write-time timestamp fields for the given write.
    ///
    /// Create-timestamp fields are stamped on insert only; update-timestamp
    /// fields on insert and update. Deletes stamp nothing.
    pub fn stamp_timestamps(&mut self, table: &Table, kind: WriteKind, now: DateTime<Utc>) {
        for field in table.fields() {
            let stamp = match kind {
                WriteKind::Insert => field.create_timestamp || field.update_timestamp,
                WriteKind::Update => field.update_timestamp,
                WriteKind::Delete => false,
            };
            if stamp {
                self.values
                    .insert(field.name.clone(), timestamp_value(field, now));
            }
        }
    }

    /// Render the record as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Consume the record, returning its values.
    pub fn into_values(self) -> Values {
        self.values
    }
}

/// Timestamp value in the representation the field's type calls for.
pub fn timestamp_value(field: &Field, now: DateTime<Utc>) -> Value {
    match field.field_type {
        FieldType::Integer => Value::Int(now.timestamp()),
        FieldType::Double => Value::Double(now.timestamp_micros() as f64 / 1_000_000.0),
        FieldType::String | FieldType::Blob => {
            Value::Text(now.format("%Y-%m-%d %H:%M:%S").to_string())
        }
    }
}
