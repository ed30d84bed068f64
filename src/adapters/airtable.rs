use crate::config::TranscriptConfig;
use crate::domain::model::SourceRecord;
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, TranscriptError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct RecordPayload {
    id: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ListPayload {
    #[serde(default)]
    records: Vec<RecordPayload>,
    offset: Option<String>,
}

impl RecordPayload {
    fn into_record(self, table: &str) -> SourceRecord {
        SourceRecord {
            id: self.id,
            table: table.to_string(),
            fields: self.fields,
        }
    }
}

/// Airtable-compatible REST client.
#[derive(Debug, Clone)]
pub struct AirtableClient {
    client: Client,
    api_url: String,
    base_id: String,
    api_key: String,
}

impl AirtableClient {
    pub fn new(api_url: &str, base_id: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            base_id: base_id.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &TranscriptConfig) -> Result<Self> {
        Self::new(
            &config.api_url,
            &config.base_id,
            &config.api_key,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// `{api_url}/{base_id}/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        build_url(&self.api_url, &self.base_id, segments)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(TranscriptError::StoreError {
            status: status.as_u16(),
            message,
        })
    }
}

pub(crate) fn build_url(root: &str, base_id: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(root).map_err(|e| TranscriptError::InvalidConfigValueError {
        field: "api_url".to_string(),
        value: root.to_string(),
        reason: e.to_string(),
    })?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| TranscriptError::InvalidConfigValueError {
                field: "api_url".to_string(),
                value: root.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            })?;
        path.pop_if_empty().push(base_id);
        path.extend(segments);
    }
    Ok(url)
}

#[async_trait]
impl RecordStore for AirtableClient {
    async fn get_record(&self, table: &str, record_id: &str) -> Result<SourceRecord> {
        let url = self.endpoint(&[table, record_id])?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let payload: RecordPayload = Self::check(response).await?.json().await?;
        Ok(payload.into_record(table))
    }

    async fn list_records(&self, table: &str, formula: &str) -> Result<Vec<SourceRecord>> {
        let url = self.endpoint(&[table])?;
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        // 依 offset 逐頁取回
        loop {
            let mut query = vec![("filterByFormula", formula.to_string())];
            if let Some(offset) = &offset {
                query.push(("offset", offset.clone()));
            }
            tracing::debug!("GET {} filterByFormula={}", url, formula);

            let response = self
                .client
                .get(url.clone())
                .bearer_auth(&self.api_key)
                .query(&query)
                .send()
                .await?;
            let page: ListPayload = Self::check(response).await?.json().await?;
            records.extend(page.records.into_iter().map(|r| r.into_record(table)));

            match page.offset {
                Some(next) if offset.as_deref() == Some(next.as_str()) => {
                    tracing::warn!("⚠️ '{}' returned offset {} twice; stopping", table, next);
                    break;
                }
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn create_record(
        &self,
        table: &str,
        fields: HashMap<String, Value>,
    ) -> Result<SourceRecord> {
        let url = self.endpoint(&[table])?;
        let body = serde_json::json!({ "fields": fields, "typecast": true });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let payload: RecordPayload = Self::check(response).await?.json().await?;
        Ok(payload.into_record(table))
    }

    async fn update_record(
        &self,
        table: &str,
        record_id: &str,
        fields: HashMap<String, Value>,
    ) -> Result<SourceRecord> {
        let url = self.endpoint(&[table, record_id])?;
        let body = serde_json::json!({ "fields": fields, "typecast": true });

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let payload: RecordPayload = Self::check(response).await?.json().await?;
        Ok(payload.into_record(table))
    }
}
