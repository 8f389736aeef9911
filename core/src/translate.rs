//! Event Translator (C3): converts a decoded row event into a canonical
//! outbound message (spec.md §4.3). Grounded on the message shape in
//! `original_source/handlers/events/kafka/messages.go` (`SyncMessage`,
//! `Key()`) and the field/behavior list in spec.md §3/§4.3/§8 (S3/S4).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use common::err::{CdcError, CdcResult, ErrorKind};

use crate::decoder::{Action, ColumnValue, RowEvent};

const PKG: &str = "core::translate";
const PRIMARY_INDEX: &str = "PRIMARY";
const CTIME_COLUMN: &str = "ctime";
const MTIME_COLUMN: &str = "mtime";
const PK_SEPARATOR: &str = "-";

/// The canonical outbound message (spec.md §3 `CanonicalMessage`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub action: String,
    pub schema: String,
    pub table: String,
    pub pk: Vec<String>,
    pub old_data: Map<String, Value>,
    pub new_data: Map<String, Value>,
    pub ctimestamp: u32,
    pub mtimestamp: u32,
}

impl CanonicalMessage {
    /// Partition/routing key: primary-key values joined by `"-"`. Values
    /// are read off `new_data`, falling back to `old_data` for deletes.
    pub fn routing_key(&self) -> String {
        self.pk
            .iter()
            .map(|col| {
                self.new_data
                    .get(col)
                    .or_else(|| self.old_data.get(col))
                    .map(value_to_key_part)
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(PK_SEPARATOR)
    }
}

fn value_to_key_part(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Translates one decoded row event into a [`CanonicalMessage`] (spec.md
/// §4.3). Row-shape handling:
///
/// - `insert`: `rows[0]` populates `new_data`; `old_data` is empty.
/// - `update`: `rows[0]` populates `old_data`, `rows[1]` populates
///   `new_data`.
/// - `delete`: `rows[0]` populates `old_data` only (spec.md's "safer
///   rule" resolution of the open question in §9 — `new_data` stays
///   empty rather than mirroring the source's out-of-bounds read of
///   `rows[1]`).
pub fn translate(event: &RowEvent) -> CdcResult<CanonicalMessage> {
    let columns = &event.table.columns;

    let old_data = match event.action {
        Action::Insert => Map::new(),
        Action::Update | Action::Delete => row_to_map(columns, event.rows.first())?,
    };

    let new_data = match event.action {
        Action::Insert => row_to_map(columns, event.rows.first())?,
        Action::Update => row_to_map(columns, event.rows.get(1))?,
        Action::Delete => Map::new(),
    };

    let pk = primary_key_columns(&event.table.indexes);

    let (ctimestamp, mtimestamp) = match event.action {
        Action::Insert | Action::Update => (
            extract_timestamp(&new_data, CTIME_COLUMN)?,
            extract_timestamp(&new_data, MTIME_COLUMN)?,
        ),
        Action::Delete => (0, 0),
    };

    Ok(CanonicalMessage {
        action: event.action.as_str().to_string(),
        schema: event.table.schema.clone(),
        table: event.table.name.clone(),
        pk,
        old_data,
        new_data,
        ctimestamp,
        mtimestamp,
    })
}

fn primary_key_columns(indexes: &[crate::decoder::IndexInfo]) -> Vec<String> {
    indexes
        .iter()
        .find(|idx| idx.name == PRIMARY_INDEX)
        .map(|idx| idx.columns.clone())
        .unwrap_or_default()
}

fn row_to_map(columns: &[String], row: Option<&Vec<ColumnValue>>) -> CdcResult<Map<String, Value>> {
    let Some(row) = row else {
        return Ok(Map::new());
    };

    let mut map = Map::with_capacity(columns.len());
    for (col, val) in columns.iter().zip(row.iter()) {
        map.insert(col.clone(), val.to_json());
    }

    serde_json::to_value(&map)
        .and_then(serde_json::from_value)
        .map_err(|e| CdcError::wrap(ErrorKind::Marshal, PKG, "fail to encode row data", e))
}

fn extract_timestamp(data: &Map<String, Value>, column: &str) -> CdcResult<u32> {
    let Some(value) = data.get(column) else {
        return Ok(0);
    };

    let text = match value {
        Value::Null => return Ok(0),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };

    text.parse::<u32>().map_err(|e| {
        CdcError::wrap(
            ErrorKind::Parse,
            PKG,
            format!("fail to parse {} value {:?}", column, text),
            e,
        )
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decoder::{IndexInfo, TableInfo};

    fn table() -> TableInfo {
        TableInfo::new("orders", "t_order", vec!["id".into(), "name".into(), "ctime".into()])
            .with_primary_key(vec!["id".into()])
    }

    #[test]
    fn insert_translation_s3() {
        let event = RowEvent {
            action: Action::Insert,
            table: table(),
            rows: vec![vec![
                ColumnValue::Int(7),
                ColumnValue::Text("x".into()),
                ColumnValue::UInt(1_700_000_000),
            ]],
        };

        let msg = translate(&event).unwrap();
        assert_eq!(msg.action, "insert");
        assert_eq!(msg.pk, vec!["id".to_string()]);
        assert!(msg.old_data.is_empty());
        assert_eq!(msg.new_data.get("name").unwrap(), "x");
        assert_eq!(msg.ctimestamp, 1_700_000_000);
        assert_eq!(msg.mtimestamp, 0);
        assert_eq!(msg.routing_key(), "7");
    }

    #[test]
    fn update_translation_s4() {
        let mut table = table();
        table.columns.push("mtime".into());

        let event = RowEvent {
            action: Action::Update,
            table,
            rows: vec![
                vec![
                    ColumnValue::Int(7),
                    ColumnValue::Text("x".into()),
                    ColumnValue::UInt(1_700_000_000),
                    ColumnValue::UInt(0),
                ],
                vec![
                    ColumnValue::Int(7),
                    ColumnValue::Text("y".into()),
                    ColumnValue::UInt(1_700_000_000),
                    ColumnValue::UInt(1_700_000_100),
                ],
            ],
        };

        let msg = translate(&event).unwrap();
        assert_eq!(msg.old_data.get("name").unwrap(), "x");
        assert_eq!(msg.new_data.get("name").unwrap(), "y");
        assert_eq!(msg.mtimestamp, 1_700_000_100);
    }

    #[test]
    fn delete_populates_old_data_only() {
        let event = RowEvent {
            action: Action::Delete,
            table: table(),
            rows: vec![vec![
                ColumnValue::Int(7),
                ColumnValue::Text("x".into()),
                ColumnValue::UInt(1_700_000_000),
            ]],
        };

        let msg = translate(&event).unwrap();
        assert!(msg.new_data.is_empty());
        assert_eq!(msg.old_data.get("name").unwrap(), "x");
        assert_eq!(msg.ctimestamp, 0);
    }

    #[test]
    fn missing_primary_index_yields_empty_pk() {
        let table = TableInfo::new("orders", "t_order", vec!["id".into()]);
        let event = RowEvent {
            action: Action::Insert,
            table,
            rows: vec![vec![ColumnValue::Int(1)]],
        };

        assert!(translate(&event).unwrap().pk.is_empty());
    }

    #[test]
    fn unparseable_ctime_is_parse_error() {
        let event = RowEvent {
            action: Action::Insert,
            table: table(),
            rows: vec![vec![
                ColumnValue::Int(7),
                ColumnValue::Text("x".into()),
                ColumnValue::Text("not-a-number".into()),
            ]],
        };

        let err = translate(&event).unwrap_err();
        assert!(err.is_kind(ErrorKind::Parse));
    }
}
