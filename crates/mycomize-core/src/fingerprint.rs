// ── Credential fingerprint ──
//
// SHA-256 over the normalized (base-url, api-key) pair. Used as the cache
// key alongside the gateway id, so any credential edit is detected by a
// plain equality check. Never persisted, never logged in full.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// Length of the hex prefix used in logs and `Display`.
const SHORT_LEN: usize = 12;

/// Stable identity of one (base-url, api-key) pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialFingerprint([u8; 32]);

impl CredentialFingerprint {
    pub fn derive(base_url: &str, api_key: &SecretString) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_url(base_url).as_bytes());
        // Separator keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update([0u8]);
        hasher.update(api_key.expose_secret().trim().as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_LEN);
        hex
    }
}

fn normalize_url(raw: &str) -> &str {
    raw.trim().trim_end_matches('/')
}

impl fmt::Debug for CredentialFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialFingerprint({})", self.short())
    }
}

impl fmt::Display for CredentialFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}
