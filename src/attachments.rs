//! Attachment files named after the case number.

use std::path::{Path, PathBuf};

use crate::config::AttachmentsConfig;

#[derive(Debug, Clone)]
pub struct AttachmentLocator {
    dir: PathBuf,
    pattern: String,
}

impl AttachmentLocator {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            pattern: pattern.into(),
        }
    }

    pub fn from_config(config: &AttachmentsConfig) -> Self {
        Self::new(&config.dir, &config.pattern)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the attachment for a case; the file may not exist.
    pub fn path_for(&self, case_number: &str) -> PathBuf {
        self.dir
            .join(self.pattern.replace("{case}", case_number.trim()))
    }

    pub fn exists(&self, case_number: &str) -> bool {
        self.path_for(case_number).is_file()
    }
}
