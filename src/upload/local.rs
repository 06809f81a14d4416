use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::UploadSink;
use crate::convert::ConvertedImage;
use crate::error::UploadError;

/// Writes converted images below a directory on the local filesystem.
pub struct LocalDirSink {
    root: PathBuf,
    max_bytes: Option<usize>,
}

impl LocalDirSink {
    pub fn new(root: PathBuf, max_bytes: Option<usize>) -> Self {
        Self { root, max_bytes }
    }

    fn target_dir(&self, destination_folder: &str) -> Result<PathBuf, UploadError> {
        let folder = Path::new(destination_folder.trim_matches('/'));
        if folder
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(UploadError::Rejected(format!(
                "destination folder escapes the storage root: {}",
                destination_folder
            )));
        }
        Ok(self.root.join(folder))
    }
}

#[async_trait]
impl UploadSink for LocalDirSink {
    async fn upload(
        &self,
        image: &ConvertedImage,
        destination_folder: &str,
    ) -> Result<String, UploadError> {
        if let Some(max) = self.max_bytes {
            if image.len() > max {
                return Err(UploadError::PayloadTooLarge { size: image.len() });
            }
        }

        let dir = self.target_dir(destination_folder)?;
        fs::create_dir_all(&dir).await?;

        let mut file = fs::File::create(dir.join(&image.file_name)).await?;
        file.write_all(&image.bytes).await?;
        file.flush().await?;

        Ok(format!(
            "{}/{}",
            destination_folder.trim_end_matches('/'),
            image.file_name
        ))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
