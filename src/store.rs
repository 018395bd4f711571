use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::Builder;
use tracing::debug;

use crate::catalog::ImageClient;
use crate::error::ScryError;
use crate::fs_util::{ensure_dir, sanitize_file_name};
use crate::planner::DownloadTask;

/// Suffix marking a full-resolution card image.
pub const IMAGE_SUFFIX: &str = ".full.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreAction {
    /// File was already on disk; nothing was requested.
    Existing,
    Downloaded,
}

/// Download root laid out as `<root>/<SET>/<name>.full.jpg`.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn set_dir(&self, set_code: &str) -> Utf8PathBuf {
        self.root.join(set_code.trim().to_uppercase())
    }

    /// Fails when nothing of the name survives sanitization.
    pub fn image_path(&self, task: &DownloadTask) -> Result<Utf8PathBuf, ScryError> {
        let stem = sanitize_file_name(&task.name);
        if stem.is_empty() {
            return Err(ScryError::Filesystem(format!(
                "no usable file name for '{}'",
                task.name
            )));
        }
        Ok(self.set_dir(&task.set_code).join(format!("{stem}{IMAGE_SUFFIX}")))
    }

    /// Idempotent: an existing file counts as done and no request is made.
    /// New images are streamed into a temp file beside the target and only
    /// renamed into place once the body is complete.
    pub fn fetch<C: ImageClient + ?Sized>(
        &self,
        task: &DownloadTask,
        client: &C,
    ) -> Result<StoreAction, ScryError> {
        let path = self.image_path(task)?;
        let dir = self.set_dir(&task.set_code);
        ensure_dir(dir.as_std_path())?;

        if path.as_std_path().exists() {
            debug!(path = %path, "image already present");
            return Ok(StoreAction::Existing);
        }

        let mut temp = Builder::new()
            .prefix(".scry-dl")
            .suffix(".part")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        let bytes = client.download_image(&task.url, temp.as_file_mut())?;
        temp.as_file()
            .sync_all()
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;

        debug!(path = %path, bytes, "image stored");
        Ok(StoreAction::Downloaded)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ScryError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
