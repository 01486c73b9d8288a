/// Local staging of uploads
///
/// A `StagedUpload` owns a temp file in the configured upload directory.
/// The file is deleted when the value is dropped or released, whichever
/// comes first, and never twice.
use crate::error::{HubError, HubResult};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Prefix of every staged file, used by the stale-upload sweeper
pub const STAGED_PREFIX: &str = "upload-";

/// A multipart upload written to local disk
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
    writer: Option<tokio::fs::File>,
    file_name: String,
    extension: String,
    content_type: Option<String>,
    size: u64,
}

/// Lowercased alphanumeric extension of a client file name, `bin` otherwise
fn sanitize_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

impl StagedUpload {
    /// Open an empty staged file inside `dir`
    pub async fn create(
        dir: &Path,
        file_name: &str,
        content_type: Option<String>,
    ) -> HubResult<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let extension = sanitize_extension(file_name);
        let named = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(&format!(".{}", extension))
            .tempfile_in(dir)?;
        let (file, path) = named.into_parts();

        Ok(Self {
            path,
            writer: Some(tokio::fs::File::from_std(file)),
            file_name: file_name.to_string(),
            extension,
            content_type,
            size: 0,
        })
    }

    /// Stage an in-memory buffer in one step
    pub async fn from_bytes(dir: &Path, file_name: &str, data: &[u8]) -> HubResult<Self> {
        let mut staged = Self::create(dir, file_name, None).await?;
        staged.append(data).await?;
        staged.finish().await?;
        Ok(staged)
    }

    /// Append a chunk to the staged file
    pub async fn append(&mut self, chunk: &[u8]) -> HubResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| HubError::Internal("staged upload already finished".to_string()))?;
        writer.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flush and close the writer; the file is then ready for upload
    pub async fn finish(&mut self) -> HubResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.sync_all().await?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check the leading bytes against known image signatures
    pub async fn sniff_image_format(&self) -> HubResult<image::ImageFormat> {
        let mut file = tokio::fs::File::open(&*self.path).await?;
        let mut head = Vec::with_capacity(64);
        (&mut file).take(64).read_to_end(&mut head).await?;
        image::guess_format(&head)
            .map_err(|_| HubError::Validation("thumbnail is not a recognised image".to_string()))
    }

    /// Delete the staged file now, reporting failures instead of ignoring them
    pub fn release(mut self) {
        self.writer.take();
        let path: PathBuf = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_staged_file_is_removed_on_drop() {
        let dir = tempdir().unwrap();
        let staged = StagedUpload::from_bytes(dir.path(), "clip.MP4", b"frames").await.unwrap();
        let path = staged.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(staged.size(), 6);
        assert_eq!(staged.extension(), "mp4");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(STAGED_PREFIX));

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_removes_file() {
        let dir = tempdir().unwrap();
        let staged = StagedUpload::from_bytes(dir.path(), "a.png", b"x").await.unwrap();
        let path = staged.path().to_path_buf();

        staged.release();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_append_after_finish_fails() {
        let dir = tempdir().unwrap();
        let mut staged = StagedUpload::from_bytes(dir.path(), "a.bin", b"x").await.unwrap();
        assert!(staged.append(b"more").await.is_err());
    }

    #[test]
    fn test_extension_sanitizing() {
        assert_eq!(sanitize_extension("movie.webm"), "webm");
        assert_eq!(sanitize_extension("noext"), "bin");
        assert_eq!(sanitize_extension("evil.p/hp"), "bin");
        assert_eq!(sanitize_extension("x.verylongextension"), "bin");
    }

    #[tokio::test]
    async fn test_image_sniffing() {
        let dir = tempdir().unwrap();
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let staged = StagedUpload::from_bytes(dir.path(), "t.png", &png).await.unwrap();
        assert_eq!(staged.sniff_image_format().await.unwrap(), image::ImageFormat::Png);

        let staged = StagedUpload::from_bytes(dir.path(), "t.png", b"plain text").await.unwrap();
        assert!(matches!(
            staged.sniff_image_format().await,
            Err(HubError::Validation(_))
        ));
    }
}
