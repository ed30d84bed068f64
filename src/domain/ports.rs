use crate::domain::model::{Extraction, RunOutcome, SourceRecord, StudentSources, TranscriptBundle};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Read/write access to the hosted tabular record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point lookup; a record missing from `table` is an error, not `None`.
    async fn get_record(&self, table: &str, record_id: &str) -> Result<SourceRecord>;

    /// All records of `table` matching a filter formula.
    async fn list_records(&self, table: &str, formula: &str) -> Result<Vec<SourceRecord>>;

    async fn create_record(
        &self,
        table: &str,
        fields: HashMap<String, Value>,
    ) -> Result<SourceRecord>;

    async fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: HashMap<String, Value>,
    ) -> Result<SourceRecord>;
}

/// A rendered artifact headed for an attachment field on an audit record.
#[derive(Debug, Clone)]
pub struct AttachmentRequest {
    pub table: String,
    pub record_id: String,
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// One way of getting a file onto a record. Transports are tried in order.
#[async_trait]
pub trait AttachmentTransport: Send + Sync {
    fn name(&self) -> &str;
    async fn attach(&self, request: &AttachmentRequest) -> Result<()>;
}

pub trait DocumentRenderer: Send + Sync {
    fn render(&self, bundle: &TranscriptBundle) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, record_ids: &[String]) -> Result<Extraction>;
    async fn transform(&self, students: Vec<StudentSources>) -> Result<Vec<TranscriptBundle>>;
    async fn load(&self, bundles: Vec<TranscriptBundle>) -> Result<Vec<RunOutcome>>;
}
