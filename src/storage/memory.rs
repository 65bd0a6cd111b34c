use super::{DataStore, Filter};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Map<String, Value>>,
    next_id: i64,
}

impl Table {
    fn push(&mut self, mut row: Map<String, Value>) -> Value {
        self.next_id += 1;
        row.insert("id".to_string(), Value::from(self.next_id));
        self.rows.push(row.clone());
        Value::Object(row)
    }
}

/// Store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row of `table`, in insertion order
    pub fn rows(&self, table: &str) -> Vec<Value> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables
            .get(table)
            .map(|t| t.rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }
}

fn as_object(table: &str, record: Value) -> Result<Map<String, Value>, StoreError> {
    match record {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject { table: table.to_string() }),
    }
}

fn matches(row: &Map<String, Value>, filter: &Filter<'_>) -> bool {
    filter.iter().all(|(column, value)| row.get(*column) == Some(value))
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn upsert(
        &self,
        table: &str,
        record: Value,
        conflict_key: &[&str],
    ) -> Result<Value, StoreError> {
        let record = as_object(table, record)?;
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let entry = tables.entry(table.to_string()).or_default();

        let existing = entry.rows.iter_mut().find(|row| {
            conflict_key
                .iter()
                .all(|column| row.get(*column) == record.get(*column))
        });

        match existing {
            Some(row) => {
                for (column, value) in record {
                    if column != "id" {
                        row.insert(column, value);
                    }
                }
                Ok(Value::Object(row.clone()))
            }
            None => Ok(entry.push(record)),
        }
    }

    async fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError> {
        let record = as_object(table, record)?;
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        Ok(tables.entry(table.to_string()).or_default().push(record))
    }

    async fn select(&self, table: &str, filter: &Filter<'_>) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        Ok(tables
            .get(table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|row| matches(row, filter))
                    .cloned()
                    .map(Value::Object)
                    .collect()
            })
            .unwrap_or_default())
    }
}
