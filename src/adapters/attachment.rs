use crate::adapters::airtable::build_url;
use crate::domain::ports::{AttachmentRequest, AttachmentTransport, RecordStore};
use crate::utils::error::{Result, TranscriptError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

async fn ensure_success(transport: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TranscriptError::AttachmentError {
        transport: transport.to_string(),
        message: format!("HTTP {}: {}", status.as_u16(), body),
    })
}

/// Primary transport: the content API's `uploadAttachment` call, which
/// appends the file to the record's attachment field in one request.
pub struct UploadAttachmentTransport {
    client: Client,
    content_url: String,
    base_id: String,
    api_key: String,
}

impl UploadAttachmentTransport {
    pub const NAME: &'static str = "upload-attachment";

    pub fn new(client: Client, content_url: &str, base_id: &str, api_key: &str) -> Self {
        Self {
            client,
            content_url: content_url.to_string(),
            base_id: base_id.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl AttachmentTransport for UploadAttachmentTransport {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn attach(&self, request: &AttachmentRequest) -> Result<()> {
        let url = build_url(
            &self.content_url,
            &self.base_id,
            &[&request.record_id, &request.field, "uploadAttachment"],
        )?;
        let body = json!({
            "contentType": request.content_type,
            "file": STANDARD.encode(&request.content),
            "filename": request.filename,
        });
        tracing::debug!("POST {} ({} bytes)", url, request.content.len());

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        ensure_success(Self::NAME, response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UploadedAsset {
    id: Option<String>,
    url: Option<String>,
}

/// Fallback transport: raw multipart upload to an attachment endpoint, then a
/// PATCH that points the record's attachment field at the returned asset.
pub struct MultipartUploadTransport<R: RecordStore + ?Sized> {
    client: Client,
    upload_url: String,
    api_key: String,
    store: Arc<R>,
}

impl<R: RecordStore + ?Sized> MultipartUploadTransport<R> {
    pub const NAME: &'static str = "multipart-upload";

    pub fn new(client: Client, upload_url: &str, api_key: &str, store: Arc<R>) -> Self {
        Self {
            client,
            upload_url: upload_url.to_string(),
            api_key: api_key.to_string(),
            store,
        }
    }

    async fn upload(&self, request: &AttachmentRequest) -> Result<UploadedAsset> {
        let part = Part::bytes(request.content.clone())
            .file_name(request.filename.clone())
            .mime_str(&request.content_type)?;
        let form = Form::new()
            .text("filename", request.filename.clone())
            .part("file", part);
        tracing::debug!("POST {} (multipart, {} bytes)", self.upload_url, request.content.len());

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let asset: UploadedAsset = ensure_success(Self::NAME, response).await?.json().await?;
        Ok(asset)
    }
}

#[async_trait]
impl<R: RecordStore + ?Sized> AttachmentTransport for MultipartUploadTransport<R> {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn attach(&self, request: &AttachmentRequest) -> Result<()> {
        let asset = self.upload(request).await?;
        let reference = match (asset.id, asset.url) {
            (Some(id), _) if !id.is_empty() => json!([{ "id": id }]),
            (_, Some(url)) if !url.is_empty() => {
                json!([{ "url": url, "filename": request.filename }])
            }
            _ => {
                return Err(TranscriptError::AttachmentError {
                    transport: Self::NAME.to_string(),
                    message: "upload response carried neither an asset id nor a url".to_string(),
                })
            }
        };

        let fields = HashMap::from([(request.field.clone(), reference)]);
        self.store
            .update_record(&request.table, &request.record_id, fields)
            .await?;
        Ok(())
    }
}
