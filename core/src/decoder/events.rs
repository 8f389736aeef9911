//! Plain event types a decoder implementation produces (spec.md §3/§4.3).
//! These stand in for `canal.RowsEvent`/`canal.RowsEventAction` and the
//! go-mysql `schema.Table`/`schema.Index` shapes referenced by
//! `original_source`, reduced to what the translator (C3) actually reads.

use serde_json::Value;

/// The kind of row mutation a [`RowEvent`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// One index definition on a table, as surfaced by the decoder's schema
/// cache. The translator only cares about the index named `"PRIMARY"`.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
}

/// Table metadata accompanying a row event: enough to know column order
/// and which columns form the primary key.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub columns: Vec<String>,
    pub indexes: Vec<IndexInfo>,
}

impl TableInfo {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<String>) -> Self {
        TableInfo {
            schema: schema.into(),
            name: name.into(),
            columns,
            indexes: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        self.indexes.push(IndexInfo {
            name: "PRIMARY".to_string(),
            columns,
        });
        self
    }
}

/// A single column value, reduced to the variants the translator needs to
/// tell apart: it JSON-encodes structurally and, for `ctime`/`mtime`, is
/// rendered through its string form before being parsed as an unsigned
/// base-10 integer (spec.md §4.3, design note "dynamic polymorphism over
/// row values").
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl ColumnValue {
    /// Structural JSON encoding, used for `old_data`/`new_data`. `ctime`/
    /// `mtime` parsing reads this same JSON form back out as a string
    /// (spec.md §4.3: "Parsing takes the value's string form and decodes
    /// as unsigned base-10") — see `translate::extract_timestamp`.
    pub fn to_json(&self) -> Value {
        match self {
            ColumnValue::Null => Value::Null,
            ColumnValue::Bool(b) => Value::Bool(*b),
            ColumnValue::Int(i) => Value::from(*i),
            ColumnValue::UInt(u) => Value::from(*u),
            ColumnValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ColumnValue::Text(s) => Value::String(s.clone()),
            ColumnValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

/// A decoded row mutation. `rows` holds one row vector for `insert`/
/// `delete` and two (`[before, after]`) for `update`, each positionally
/// aligned with `table.columns` (spec.md §4.3 "Row shape rules").
#[derive(Debug, Clone)]
pub struct RowEvent {
    pub action: Action,
    pub table: TableInfo,
    pub rows: Vec<Vec<ColumnValue>>,
}

/// A binlog-file rotation, marking a safe checkpoint boundary.
#[derive(Debug, Clone)]
pub struct RotateEvent {
    pub next_log_name: String,
    pub position: u32,
}
