use crate::domain::model::SourceRecord;
use crate::domain::ports::RecordStore;
use std::collections::HashSet;

/// `{Field} = "value"` with double quotes in the value backslash-escaped.
pub fn equality_formula(field: &str, value: &str) -> String {
    format!("{{{}}} = \"{}\"", field, value.replace('"', "\\\""))
}

/// Collects the source rows belonging to one student.
pub struct EnrollmentMerger<'a, R: RecordStore + ?Sized> {
    store: &'a R,
    candidates: &'a [String],
    student_name_field: &'a str,
    cross_table: bool,
}

impl<'a, R: RecordStore + ?Sized> EnrollmentMerger<'a, R> {
    pub fn new(
        store: &'a R,
        candidates: &'a [String],
        student_name_field: &'a str,
        cross_table: bool,
    ) -> Self {
        Self {
            store,
            candidates,
            student_name_field,
            cross_table,
        }
    }

    /// Rows for `student_name`. Always contains `resolved`; in cross-table mode
    /// also every row of every candidate table whose student name matches.
    pub async fn merge(&self, student_name: &str, resolved: &SourceRecord) -> Vec<SourceRecord> {
        if !self.cross_table {
            return vec![resolved.clone()];
        }

        let formula = equality_formula(self.student_name_field, student_name);
        let mut merged = Vec::new();

        for table in self.candidates {
            match self.store.list_records(table, &formula).await {
                Ok(records) => {
                    tracing::debug!(
                        "📂 {} row(s) for '{}' in table '{}'",
                        records.len(),
                        student_name,
                        table
                    );
                    merged.extend(records);
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Cross-table search in '{}' failed, skipping it: {}",
                        table,
                        e
                    );
                }
            }
        }

        if merged.is_empty() {
            tracing::info!(
                "No cross-table matches for '{}'; using the resolved record only",
                student_name
            );
        }

        let mut with_resolved = vec![resolved.clone()];
        with_resolved.extend(merged);
        dedupe_records(with_resolved)
    }
}

/// Drops repeated `(table, id)` pairs, keeping the first occurrence.
pub fn dedupe_records(records: Vec<SourceRecord>) -> Vec<SourceRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.table.clone(), r.id.clone())))
        .collect()
}
