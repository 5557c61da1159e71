use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::Record;

/// Row-level change kinds pushed by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Backing-store tables the feed can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Lists,
    Items,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lists => "lists",
            Self::Items => "items",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of one change. Rows stay raw JSON until the feed boundary
/// decodes them into the table's record type; a change for a table the
/// subscriber did not ask about is simply skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: Table,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<serde_json::Value>,
    /// Position in the backend change log, used as the poll cursor.
    pub seq: u64,
}

impl ChangeEvent {
    /// Decode the raw rows into `R`. Fails if the payload rows do not match
    /// the record shape; callers log and drop such events.
    pub fn decode<R: Record>(&self) -> Result<RowChange<R>, serde_json::Error> {
        let new = self
            .new
            .clone()
            .map(serde_json::from_value)
            .transpose()?;
        let old = self
            .old
            .clone()
            .map(serde_json::from_value)
            .transpose()?;
        Ok(RowChange {
            kind: self.kind,
            new,
            old,
        })
    }
}

/// Typed form of one change, as consumed by the reconciliation core.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange<R> {
    pub kind: ChangeKind,
    pub new: Option<R>,
    pub old: Option<R>,
}

impl<R: Record> RowChange<R> {
    /// The id this change refers to: the new row for inserts and updates,
    /// the old row for deletes.
    pub fn target_id(&self) -> Option<Uuid> {
        match self.kind {
            ChangeKind::Insert | ChangeKind::Update => self.new.as_ref().map(Record::id),
            ChangeKind::Delete => self.old.as_ref().map(Record::id),
        }
    }
}
