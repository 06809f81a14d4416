//! Upload sinks: where converted images end up.
//!
//! The pipeline only sees [`UploadSink`]; which backend sits behind it is
//! decided by [`SinkConfig`](crate::config::SinkConfig) at construction time.

mod assets;
mod local;
mod storage;

pub use assets::AssetApiSink;
pub use local::LocalDirSink;
pub use storage::StorageSink;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SinkConfig;
use crate::convert::ConvertedImage;
use crate::error::UploadError;

/// Destination for converted images.
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Store `image` under `destination_folder`, returning the path or URL
    /// the backend reports for it.
    async fn upload(
        &self,
        image: &ConvertedImage,
        destination_folder: &str,
    ) -> std::result::Result<String, UploadError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Build the sink described by `config`.
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn UploadSink>> {
    let sink: Arc<dyn UploadSink> = match config {
        SinkConfig::Local { root, max_bytes } => Arc::new(LocalDirSink::new(root.clone(), *max_bytes)),
        SinkConfig::Storage {
            upload_url,
            source,
            bucket,
        } => Arc::new(StorageSink::new(
            http_client()?,
            upload_url.clone(),
            source.clone(),
            bucket.clone(),
        )),
        SinkConfig::Assets { api_url, api_key } => Arc::new(AssetApiSink::new(
            http_client()?,
            api_url.clone(),
            api_key.clone(),
        )),
    };
    Ok(sink)
}

fn http_client() -> Result<Client> {
    Ok(Client::builder().timeout(Duration::from_secs(120)).build()?)
}

/// Multipart part carrying a converted image.
fn image_part(image: &ConvertedImage) -> std::result::Result<reqwest::multipart::Part, UploadError> {
    Ok(reqwest::multipart::Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(ConvertedImage::MIME_TYPE)?)
}
