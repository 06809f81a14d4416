use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::debug;

use super::{UploadSink, image_part};
use crate::convert::ConvertedImage;
use crate::error::UploadError;

/// Generic storage endpoint accepting multipart uploads with
/// `source`, `target` and `upload` fields.
pub struct StorageSink {
    client: Client,
    upload_url: String,
    source: String,
    bucket: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageResponse {
    path: Option<String>,
    error: Option<String>,
}

impl StorageSink {
    pub fn new(client: Client, upload_url: String, source: String, bucket: Option<String>) -> Self {
        Self {
            client,
            upload_url,
            source,
            bucket,
        }
    }
}

/// Map the endpoint's answer onto the uploaded path or an error.
fn interpret_response(status: StatusCode, body: &str, size: usize) -> Result<String, UploadError> {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return Err(UploadError::PayloadTooLarge { size });
    }

    // Unparseable bodies are treated like an empty answer.
    let response: StorageResponse = serde_json::from_str(body).unwrap_or_default();

    if let Some(error) = response.error {
        return Err(UploadError::Rejected(error));
    }
    match response.path {
        Some(path) if status.is_success() => Ok(path),
        _ if !status.is_success() => Err(UploadError::Rejected(format!("HTTP {}", status))),
        _ => Err(UploadError::Rejected("unexpected response".to_string())),
    }
}

#[async_trait]
impl UploadSink for StorageSink {
    async fn upload(
        &self,
        image: &ConvertedImage,
        destination_folder: &str,
    ) -> Result<String, UploadError> {
        let mut form = Form::new()
            .text("source", self.source.clone())
            .text("target", destination_folder.to_string())
            .part("upload", image_part(image)?);
        if let Some(bucket) = &self.bucket {
            form = form.text("bucket", bucket.clone());
        }

        debug!(url = %self.upload_url, file = %image.file_name, "posting upload");
        let resp = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        interpret_response(status, &body, image.len())
    }

    fn name(&self) -> &'static str {
        "storage"
    }
}
