use std::path::{Path, PathBuf};

use anyhow::Context;

pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl DownloadArtifact {
    pub fn png(timestamp: i64, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("generated_image_{timestamp}.png"),
            mime_type: PNG_MIME,
            bytes,
        }
    }

    /// Writes the image into `dir`. Same-second duplicates overwrite each
    /// other.
    pub fn save_in(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}
