//! In-memory record store shared by unit tests.

use crate::domain::model::SourceRecord;
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, TranscriptError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    pub tables: Mutex<HashMap<String, Vec<SourceRecord>>>,
    pub failing_tables: HashSet<String>,
    pub lookups: Mutex<Vec<(String, String)>>,
    pub queries: Mutex<Vec<(String, String)>>,
    pub updates: Mutex<Vec<(String, String, HashMap<String, Value>)>>,
    next_id: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, table: &str, id: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(SourceRecord {
                id: id.to_string(),
                table: table.to_string(),
                fields,
            });
        self
    }

    pub fn failing(mut self, table: &str) -> Self {
        self.failing_tables.insert(table.to_string());
        self
    }

    pub fn records(&self, table: &str) -> Vec<SourceRecord> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn check_available(&self, table: &str) -> Result<()> {
        if self.failing_tables.contains(table) {
            return Err(TranscriptError::StoreError {
                status: 503,
                message: format!("table {} unavailable", table),
            });
        }
        Ok(())
    }
}

/// Understands only `{Field} = "value"` formulas with `\"` escapes.
fn matches_formula(record: &SourceRecord, formula: &str) -> bool {
    let Some((lhs, rhs)) = formula.split_once(" = ") else {
        return false;
    };
    let field = lhs.trim().trim_start_matches('{').trim_end_matches('}');
    let expected = rhs
        .trim()
        .trim_start_matches('"')
        .trim_end_matches('"')
        .replace("\\\"", "\"");
    record.fields.get(field).and_then(Value::as_str) == Some(expected.as_str())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, table: &str, record_id: &str) -> Result<SourceRecord> {
        self.lookups
            .lock()
            .unwrap()
            .push((table.to_string(), record_id.to_string()));
        self.check_available(table)?;
        self.records(table)
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| TranscriptError::StoreError {
                status: 404,
                message: "NOT_FOUND".to_string(),
            })
    }

    async fn list_records(&self, table: &str, formula: &str) -> Result<Vec<SourceRecord>> {
        self.queries
            .lock()
            .unwrap()
            .push((table.to_string(), formula.to_string()));
        self.check_available(table)?;
        Ok(self
            .records(table)
            .into_iter()
            .filter(|r| matches_formula(r, formula))
            .collect())
    }

    async fn create_record(
        &self,
        table: &str,
        fields: HashMap<String, Value>,
    ) -> Result<SourceRecord> {
        self.check_available(table)?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("recLog{}", *next)
        };
        let record = SourceRecord {
            id,
            table: table.to_string(),
            fields,
        };
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: HashMap<String, Value>,
    ) -> Result<SourceRecord> {
        self.check_available(table)?;
        self.updates
            .lock()
            .unwrap()
            .push((table.to_string(), record_id.to_string(), fields.clone()));
        let mut tables = self.tables.lock().unwrap();
        let record = tables
            .get_mut(table)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| TranscriptError::StoreError {
                status: 404,
                message: "NOT_FOUND".to_string(),
            })?;
        record.fields.extend(fields);
        Ok(record.clone())
    }
}
