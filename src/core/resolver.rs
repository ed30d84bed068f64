use crate::domain::model::SourceRecord;
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, TranscriptError};

/// Finds which candidate table holds a record.
pub struct TableResolver<'a, R: RecordStore + ?Sized> {
    store: &'a R,
    candidates: &'a [String],
}

impl<'a, R: RecordStore + ?Sized> TableResolver<'a, R> {
    pub fn new(store: &'a R, candidates: &'a [String]) -> Self {
        Self { store, candidates }
    }

    /// Point lookup in each candidate in order; the first hit wins and later
    /// tables are not queried. A miss in one table is final for that table.
    pub async fn resolve(&self, record_id: &str) -> Result<SourceRecord> {
        let mut last_error = None;

        for table in self.candidates {
            match self.store.get_record(table, record_id).await {
                Ok(record) => {
                    tracing::debug!("🔎 {} resolved in table '{}'", record_id, table);
                    return Ok(record);
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{} not in table '{}'", record_id, table);
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Lookup of {} in table '{}' failed: {}", record_id, table, e);
                    last_error = Some(e);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| TranscriptError::ConfigError {
            message: "no candidate tables configured".to_string(),
        });
        Err(TranscriptError::RecordNotFound {
            record_id: record_id.to_string(),
            tables: self.candidates.join(", "),
            last: Box::new(last),
        })
    }
}
