use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::debug;

use crate::error::UploadError;

static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Producer of the local image handed to an upload.
///
/// The returned path is expected to exist when the upload starts; its content is
/// not validated as JPEG here.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn image_path(&self) -> Result<PathBuf, UploadError>;
}

/// An image already on disk, e.g. a camera capture.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn image_path(&self) -> Result<PathBuf, UploadError> {
        Ok(self.path.clone())
    }
}

/// An image copied out of an arbitrary byte stream into a cache directory,
/// for sources that do not hand out a file (gallery picks, stdin).
#[derive(Debug, Clone)]
pub struct StagedImageSource {
    path: PathBuf,
}

impl StagedImageSource {
    /// Copy `reader` to `<cache_dir>/temp_image_<millis>_<n>.jpg`.
    pub async fn stage<R>(cache_dir: &Path, reader: &mut R) -> Result<Self, UploadError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        tokio::fs::create_dir_all(cache_dir)
            .await
            .map_err(|e| UploadError::input(cache_dir, e))?;

        let path = cache_dir.join(staged_file_name());
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| UploadError::input(&path, e))?;
        let copied = tokio::io::copy(reader, &mut file)
            .await
            .map_err(|e| UploadError::input(&path, e))?;
        file.flush().await.map_err(|e| UploadError::input(&path, e))?;

        debug!(path = %path.display(), bytes = copied, "staged image");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged copy.
    pub async fn remove(self) -> Result<(), UploadError> {
        tokio::fs::remove_file(&self.path)
            .await
            .map_err(|e| UploadError::input(&self.path, e))
    }
}

#[async_trait]
impl ImageSource for StagedImageSource {
    async fn image_path(&self) -> Result<PathBuf, UploadError> {
        Ok(self.path.clone())
    }
}

fn staged_file_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis();
    let n = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("temp_image_{millis}_{n}.jpg")
}
