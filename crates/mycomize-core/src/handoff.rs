// ── Credential handoff ──
//
// An external capture step (QR scan) drops a credential string into a
// transient slot. When a gateway form is resumed, the value is moved into
// the form's api-key field and the slot is cleared. The capture step is
// optional, so slot errors are logged and otherwise ignored.

use std::sync::{Mutex, PoisonError};

use secrecy::SecretString;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::GatewayForm;

/// A single ephemeral value written by someone else.
pub trait CredentialSlot: Send + Sync {
    fn read(&self) -> Result<Option<String>, CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// In-memory slot.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, value: impl Into<String>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl CredentialSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>, CoreError> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

pub struct CredentialHandoff<S> {
    slot: S,
}

impl<S: CredentialSlot> CredentialHandoff<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Move a pending scanned credential into `form`. Returns whether the
    /// form was changed. Never fails.
    pub fn on_resume(&self, form: &mut GatewayForm) -> bool {
        let value = match self.slot.read() {
            Ok(Some(value)) => value,
            Ok(None) => return false,
            Err(e) => {
                debug!(error = %e, "credential slot unreadable, skipping handoff");
                return false;
            }
        };

        let trimmed = value.trim();
        let applied = !trimmed.is_empty();
        if applied {
            form.api_key = SecretString::from(trimmed.to_owned());
            debug!("applied scanned credential to gateway form");
        }

        if let Err(e) = self.slot.clear() {
            warn!(error = %e, "failed to clear credential slot");
        }
        applied
    }
}
