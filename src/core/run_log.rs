use crate::config::LogFields;
use crate::domain::model::TranscriptBundle;
use crate::domain::ports::{AttachmentRequest, AttachmentTransport, RecordStore};
use crate::utils::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq)]
pub struct LogResult {
    pub record_id: String,
    pub attached_via: Option<String>,
}

/// Writes the audit record for a run and attaches the rendered artifact.
///
/// The audit record is the source of truth; the attachment is best effort and
/// its failure never fails the run.
pub struct RunLogger<R: RecordStore + ?Sized> {
    store: Arc<R>,
    log_table: String,
    attachment_field: String,
    fields: LogFields,
    transports: Vec<Box<dyn AttachmentTransport>>,
}

impl<R: RecordStore + ?Sized> RunLogger<R> {
    pub fn new(
        store: Arc<R>,
        log_table: String,
        attachment_field: String,
        fields: LogFields,
    ) -> Self {
        Self {
            store,
            log_table,
            attachment_field,
            fields,
            transports: Vec::new(),
        }
    }

    /// Appends a transport; transports are tried in the order they were added.
    pub fn with_transport(mut self, transport: Box<dyn AttachmentTransport>) -> Self {
        self.transports.push(transport);
        self
    }

    pub fn audit_fields(
        &self,
        bundle: &TranscriptBundle,
        run_at: DateTime<Utc>,
    ) -> HashMap<String, Value> {
        let header = &bundle.header;
        let courses = bundle
            .rows
            .iter()
            .filter(|r| !r.is_placeholder())
            .map(|r| r.display_name())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let source_ids = bundle
            .source_record_ids
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");

        HashMap::from([
            (self.fields.student_name.clone(), Value::from(header.name.clone())),
            (self.fields.student_id.clone(), Value::from(header.external_id.clone())),
            (self.fields.school_year.clone(), Value::from(header.school_year.clone())),
            (self.fields.grade_level.clone(), Value::from(header.grade_level.clone())),
            (
                self.fields.run_at.clone(),
                Value::from(run_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ),
            (self.fields.courses.clone(), Value::from(courses)),
            (self.fields.source_records.clone(), Value::from(source_ids)),
        ])
    }

    /// Creates the audit record, then attaches `content` through the first
    /// transport that succeeds.
    pub async fn log_run(
        &self,
        bundle: &TranscriptBundle,
        run_at: DateTime<Utc>,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<LogResult> {
        let record = self
            .store
            .create_record(&self.log_table, self.audit_fields(bundle, run_at))
            .await?;
        tracing::info!(
            "📝 Logged run for '{}' as {} in '{}'",
            bundle.header.name,
            record.id,
            self.log_table
        );

        let request = AttachmentRequest {
            table: self.log_table.clone(),
            record_id: record.id.clone(),
            field: self.attachment_field.clone(),
            filename: filename.to_string(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            content,
        };
        let attached_via = self.attach(&request).await;

        Ok(LogResult {
            record_id: record.id,
            attached_via,
        })
    }

    /// Name of the transport that attached the file, `None` when all failed.
    pub async fn attach(&self, request: &AttachmentRequest) -> Option<String> {
        for transport in &self.transports {
            match transport.attach(request).await {
                Ok(()) => {
                    tracing::info!(
                        "📎 Attached {} to {} via {}",
                        request.filename,
                        request.record_id,
                        transport.name()
                    );
                    return Some(transport.name().to_string());
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Attachment via {} failed for {}: {}",
                        transport.name(),
                        request.record_id,
                        e
                    );
                }
            }
        }

        tracing::warn!(
            "Audit record {} kept without attachment; upload {} manually",
            request.record_id,
            request.filename
        );
        None
    }
}
