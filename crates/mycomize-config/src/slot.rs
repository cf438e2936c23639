// File-backed transient credential slot.
//
// The capture step writes the scanned value to a single file; the
// handoff reads it and deletes it.

use std::path::{Path, PathBuf};

use mycomize_core::{CoreError, CredentialSlot};

#[derive(Debug, Clone)]
pub struct FileCredentialSlot {
    path: PathBuf,
}

impl FileCredentialSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writer side, used by the capture step.
    pub fn put(&self, value: &str) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| slot_error(&e))?;
        }
        std::fs::write(&self.path, value).map_err(|e| slot_error(&e))
    }
}

impl CredentialSlot for FileCredentialSlot {
    fn read(&self) -> Result<Option<String>, CoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(slot_error(&e)),
        }
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(slot_error(&e)),
        }
    }
}

fn slot_error(err: &std::io::Error) -> CoreError {
    CoreError::Internal(format!("credential slot: {err}"))
}
