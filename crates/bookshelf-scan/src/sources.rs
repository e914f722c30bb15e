use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::AsyncRead;
use tracing::warn;

use bookshelf_common::{FileImageSource, ImageSource, StagedImageSource};

const STDIN_ARG: &str = "-";

pub fn is_stdin(image: &Path) -> bool {
    image.as_os_str() == STDIN_ARG
}

/// stdin holds one photo; a second `-` would upload an empty file.
pub fn validate_images(images: &[PathBuf]) -> anyhow::Result<()> {
    if images.iter().filter(|image| is_stdin(image)).count() > 1 {
        anyhow::bail!("`-` (stdin) may be given only once");
    }
    Ok(())
}

/// The photo behind one command-line argument.
pub enum ScanSource {
    File(FileImageSource),
    Staged(StagedImageSource),
}

impl ScanSource {
    pub async fn open<R>(image: &Path, cache_dir: &Path, stdin: &mut R) -> anyhow::Result<Self>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if is_stdin(image) {
            let staged = StagedImageSource::stage(cache_dir, stdin)
                .await
                .context("failed to stage photo from stdin")?;
            return Ok(ScanSource::Staged(staged));
        }
        Ok(ScanSource::File(FileImageSource::new(image)))
    }

    pub fn as_image_source(&self) -> &dyn ImageSource {
        match self {
            ScanSource::File(file) => file,
            ScanSource::Staged(staged) => staged,
        }
    }

    /// Delete any staged copy. Failures are logged, not returned.
    pub async fn finish(self) {
        if let ScanSource::Staged(staged) = self {
            let path = staged.path().to_path_buf();
            if let Err(e) = staged.remove().await {
                warn!(path = %path.display(), error = %e, "failed to remove staged photo");
            }
        }
    }
}
