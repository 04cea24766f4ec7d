//! Code storage utilities.
//!
//! Controls the form a code takes at rest. Hashing uses HMAC-SHA256 keyed by a
//! server secret, which is deterministic: verification can still look a record
//! up by exact `(identity, code, purpose)` match on the stored form.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use carwash_auth_core::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

/// How codes should be stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeStorageMode {
    /// Store codes in plain text.
    #[default]
    Plain,
    /// Store a keyed hash of the code; plaintext is never persisted.
    Hashed,
}

/// Configuration for code storage.
#[derive(Clone, Default)]
pub struct CodeStorage {
    mode: CodeStorageMode,
    secret: Vec<u8>,
}

impl CodeStorage {
    /// Creates a plain text storage.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Creates a hashed storage keyed by `secret`.
    pub fn hashed(secret: impl AsRef<[u8]>) -> Self {
        Self {
            mode: CodeStorageMode::Hashed,
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Returns the storage mode.
    pub fn mode(&self) -> CodeStorageMode {
        self.mode
    }

    /// Rejects a hashed storage without a secret.
    pub fn validate(&self) -> AuthResult<()> {
        if self.mode == CodeStorageMode::Hashed && self.secret.is_empty() {
            return Err(AuthError::config("hashed code storage requires a non-empty secret"));
        }
        Ok(())
    }

    /// Prepares a code for storage (and for lookup by stored form).
    pub fn prepare_for_storage(&self, code: &str) -> String {
        match self.mode {
            CodeStorageMode::Plain => code.to_string(),
            CodeStorageMode::Hashed => hex::encode(self.mac(code).finalize().into_bytes()),
        }
    }

    fn mac(&self, code: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(code.as_bytes());
        mac
    }
}

impl fmt::Debug for CodeStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeStorage")
            .field("mode", &self.mode)
            .field("secret", &if self.secret.is_empty() { "<none>" } else { "<redacted>" })
            .finish()
    }
}
