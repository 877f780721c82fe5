//! Password-based authenticated encryption of exported snapshots.
//!
//! # Blob Layout
//!
//! ```text
//! [Salt: 16 bytes] [IV: 12 bytes] [AES-256-GCM ciphertext + 16-byte tag]
//! ```
//!
//! The key is derived with PBKDF2-HMAC-SHA256 (100 000 iterations) from the
//! password and the embedded salt. Salt and IV are freshly random on every
//! call, so encrypting the same payload twice never yields the same blob.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use sha2::Sha256;
use tracing::{debug, instrument};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// Fixed prefix length: salt + IV.
pub const HEADER_LEN: usize = SALT_LEN + IV_LEN;
/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Errors from snapshot encryption and decryption.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// Blob is too short to contain the salt and IV prefix.
    #[error("encrypted blob is truncated: expected at least {expected} bytes, got {actual}")]
    Format {
        /// Minimum required length.
        expected: usize,
        /// Actual blob length.
        actual: usize,
    },
    /// Authentication tag did not verify.
    #[error("wrong password or corrupted data")]
    Authentication,
    /// The cipher refused to encrypt the payload.
    #[error("failed to encrypt payload")]
    Encryption,
}

/// A 256-bit key derived from a password. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// An encrypted snapshot in its raw byte layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob(Vec<u8>);

impl EncryptedBlob {
    /// Wraps raw bytes after checking the fixed-length prefix is present.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Format`] when the blob is shorter than [`HEADER_LEN`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CipherError> {
        if bytes.len() < HEADER_LEN {
            return Err(CipherError::Format {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// The embedded salt.
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.0[..SALT_LEN]
    }

    /// The embedded nonce.
    #[must_use]
    pub fn iv(&self) -> &[u8] {
        &self.0[SALT_LEN..HEADER_LEN]
    }

    /// Ciphertext including the trailing tag.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.0[HEADER_LEN..]
    }

    /// Full blob bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Total length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a valid blob; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Derives an AES-256 key from a password and salt.
#[must_use]
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> DerivedKey {
    derive_key_from_slice(password, salt)
}

fn derive_key_from_slice(password: &str, salt: &[u8]) -> DerivedKey {
    let mut key = [0_u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    DerivedKey(key)
}

/// Encrypts a payload under a password with a fresh salt and nonce.
///
/// # Errors
///
/// Returns [`CipherError::Encryption`] if the AEAD rejects the payload.
#[instrument(level = "debug", skip_all, fields(plaintext_len = plaintext.len()))]
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<EncryptedBlob, CipherError> {
    let mut salt = [0_u8; SALT_LEN];
    let mut iv = [0_u8; IV_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CipherError::Encryption)?;

    let mut output = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    output.extend_from_slice(&salt);
    output.extend_from_slice(&iv);
    output.extend_from_slice(&ciphertext);
    debug!(blob_len = output.len(), "payload encrypted");
    Ok(EncryptedBlob(output))
}

/// Decrypts a blob produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CipherError::Authentication`] on a wrong password or corrupted data.
#[instrument(level = "debug", skip_all, fields(blob_len = blob.len()))]
pub fn decrypt(blob: &EncryptedBlob, password: &str) -> Result<Vec<u8>, CipherError> {
    let key = derive_key_from_slice(password, blob.salt());
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(blob.iv()), blob.ciphertext())
        .map_err(|_| CipherError::Authentication)
}
