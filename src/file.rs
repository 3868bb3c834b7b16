//! `.ASL` files on disk
//!
//! A license file holds the raw AES ciphertext. The codec works with its
//! Base64 form, so saving decodes and loading encodes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Conventional license file extension
pub const ASL_EXTENSION: &str = "asl";

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("License data is not valid Base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("License file is empty")]
    Empty,
}

/// Write a Base64 ASL string to `path` as raw bytes
pub fn save_license_file(path: impl AsRef<Path>, asl: &str) -> Result<(), FileError> {
    let bytes = BASE64.decode(asl.trim())?;
    if bytes.is_empty() {
        return Err(FileError::Empty);
    }
    fs::write(path.as_ref(), &bytes)?;
    debug!(path = %path.as_ref().display(), bytes = bytes.len(), "Saved license file");
    Ok(())
}

/// Read raw bytes from `path` and return them as a Base64 ASL string
pub fn load_license_file(path: impl AsRef<Path>) -> Result<String, FileError> {
    let bytes = fs::read(path.as_ref())?;
    if bytes.is_empty() {
        return Err(FileError::Empty);
    }
    debug!(path = %path.as_ref().display(), bytes = bytes.len(), "Loaded license file");
    Ok(BASE64.encode(bytes))
}
