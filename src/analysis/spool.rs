use std::path::Path;

use anyhow::Context;
use axum::extract::multipart::Field;
use base64::{engine::general_purpose::STANDARD, Engine};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::ApiError;

const DEFAULT_MIME: &str = "image/jpeg";

/// An uploaded image streamed to a temporary file.
///
/// The file is unlinked when the spool is dropped, whichever way the request ends.
pub struct SpooledUpload {
    file: NamedTempFile,
    content_type: String,
    len: usize,
}

impl SpooledUpload {
    pub async fn from_field(
        mut field: Field<'_>,
        dir: &Path,
        max_bytes: usize,
    ) -> Result<Self, ApiError> {
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        if !content_type.starts_with("image/") {
            return Err(ApiError::BadRequest(format!(
                "Unsupported content type {content_type}"
            )));
        }

        let file = NamedTempFile::new_in(dir).context("create upload spool")?;
        let mut writer = tokio::fs::File::from_std(file.reopen().context("open upload spool")?);

        let mut len = 0usize;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::multipart(e, max_bytes))?
        {
            len += chunk.len();
            if len > max_bytes {
                return Err(ApiError::PayloadTooLarge(max_bytes));
            }
            writer
                .write_all(&chunk)
                .await
                .context("write upload spool")?;
        }
        writer.flush().await.context("flush upload spool")?;

        if len == 0 {
            return Err(ApiError::BadRequest("No image uploaded".into()));
        }

        debug!(path = %file.path().display(), len, %content_type, "upload spooled");
        Ok(Self {
            file,
            content_type,
            len,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> usize {
        self.len
    }

    /// `data:<mime>;base64,<payload>` for the vision model.
    pub async fn data_uri(&self) -> anyhow::Result<String> {
        let bytes = tokio::fs::read(self.path())
            .await
            .context("read upload spool")?;
        Ok(format!("data:{};base64,{}", self.content_type, STANDARD.encode(bytes)))
    }
}
