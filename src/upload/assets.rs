use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::debug;

use super::{UploadSink, image_part};
use crate::convert::ConvertedImage;
use crate::error::UploadError;

/// Hosted asset API: files are posted to `<api_url>/assets/upload` and the
/// API answers with the public URL of the stored asset.
pub struct AssetApiSink {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetResponse {
    url: Option<String>,
    error: Option<String>,
}

impl AssetApiSink {
    pub fn new(client: Client, api_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/assets/upload", self.api_url.trim_end_matches('/'))
    }
}

fn interpret_response(status: StatusCode, body: &str, size: usize) -> Result<String, UploadError> {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return Err(UploadError::PayloadTooLarge { size });
    }

    let response: AssetResponse = serde_json::from_str(body).unwrap_or_default();
    match response {
        AssetResponse {
            error: Some(error), ..
        } => Err(UploadError::Rejected(error)),
        AssetResponse { url: Some(url), .. } if status.is_success() => Ok(url),
        _ => Err(UploadError::Rejected(format!(
            "unknown error accessing the asset API (HTTP {})",
            status
        ))),
    }
}

#[async_trait]
impl UploadSink for AssetApiSink {
    async fn upload(
        &self,
        image: &ConvertedImage,
        destination_folder: &str,
    ) -> Result<String, UploadError> {
        let target = format!(
            "{}/{}",
            destination_folder.trim_end_matches('/'),
            image.file_name
        );
        let form = Form::new()
            .part("file", image_part(image)?)
            .text("path", target);

        let endpoint = self.endpoint();
        debug!(url = %endpoint, file = %image.file_name, "posting asset");
        let mut request = self.client.post(&endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        interpret_response(status, &body, image.len())
    }

    fn name(&self) -> &'static str {
        "assets"
    }
}
