use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("store directory missing or not writable: {0}")]
    StoreDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` when missing and checks that it is a writable directory.
pub fn ensure_store_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StoreDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StoreDir(format!("{} is not a directory", dir.display())));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StoreDir(e.to_string()))?;
    }
    Ok(())
}

/// Replaces one file atomically: write a sibling temp file, sync, rename.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    target: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(target: PathBuf) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn write(&self, content: &[u8]) -> Result<(), PersistError> {
        let dir = match self.target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_store_dir(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.target).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }
}
