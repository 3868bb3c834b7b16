//! Zeroizing AES key material
//!
//! The ASL container is encrypted with a 256-bit AES key and a 128-bit CBC
//! IV that both parties agree on out of band. These wrappers validate the
//! lengths once, clear memory on drop and keep the bytes out of `Debug`
//! output.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key length in bytes
pub const AES_KEY_LEN: usize = 32;

/// AES block / CBC IV length in bytes
pub const AES_IV_LEN: usize = 16;

/// AES-256 key (32 bytes) that zeroizes on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AesKey(pub(crate) [u8; AES_KEY_LEN]);

impl AesKey {
    /// Create a new AES key from a 32-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != AES_KEY_LEN {
            return Err(KeyError::InvalidLength {
                what: "key",
                expected: AES_KEY_LEN,
                got: bytes.len(),
            });
        }
        let mut key = [0u8; AES_KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(AesKey(key))
    }

    /// Decode a Base64 (standard alphabet) key
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let mut bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| KeyError::NotBase64 { what: "key" })?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    /// Generate a fresh random key from the OS RNG
    pub fn generate() -> Self {
        let mut key = [0u8; AES_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        AesKey(key)
    }

    /// Get a reference to the key bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Encode the key as Base64 for provisioning
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesKey(..)")
    }
}

/// 128-bit CBC initialization vector that zeroizes on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AesIv(pub(crate) [u8; AES_IV_LEN]);

impl AesIv {
    /// Create a new IV from a 16-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != AES_IV_LEN {
            return Err(KeyError::InvalidLength {
                what: "iv",
                expected: AES_IV_LEN,
                got: bytes.len(),
            });
        }
        let mut iv = [0u8; AES_IV_LEN];
        iv.copy_from_slice(bytes);
        Ok(AesIv(iv))
    }

    /// Decode a Base64 (standard alphabet) IV
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| KeyError::NotBase64 { what: "iv" })?;
        Self::from_slice(&bytes)
    }

    /// Generate a fresh random IV from the OS RNG
    pub fn generate() -> Self {
        let mut iv = [0u8; AES_IV_LEN];
        OsRng.fill_bytes(&mut iv);
        AesIv(iv)
    }

    /// Get a reference to the IV bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Encode the IV as Base64 for provisioning
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

impl std::fmt::Debug for AesIv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesIv(..)")
    }
}

/// Key-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid {what} length: expected {expected}, got {got}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid {what} encoding: expected Base64")]
    NotBase64 { what: &'static str },
}
