//! Unified error type for the public API
//!
//! Each module keeps its own precise error. This type gathers them so callers
//! that drive several stages can use a single `Result`.
//!
//! # Example
//!
//! ```no_run
//! use asl_codec::{AslError, CryptoSettings, LicenseCodec};
//!
//! fn open_from_env(asl: &str) -> Result<(), AslError> {
//!     let codec = LicenseCodec::from_settings(&CryptoSettings::from_env()?);
//!     let opened = codec.open(asl)?;
//!     println!("{}", opened.record.company_name);
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all ASL operations
///
/// # Error Categories
///
/// - **Canonical**: JSON that cannot be put in canonical form
/// - **Validation**: License record missing required fields or with a bad period
/// - **Payload / Integrity**: Checksum missing or not matching
/// - **Cipher / Key / Config**: Encryption, decryption or key material problems
/// - **File**: Reading or writing `.ASL` files
/// - **KeyGen**: License key generation
/// - **License**: Outward-facing license failures
#[derive(Debug, Error)]
pub enum AslError {
    #[error("Canonical JSON error: {0}")]
    Canonical(#[from] crate::canonical::CanonicalError),

    #[error("Validation error: {0}")]
    Validation(#[from] crate::record::ValidationError),

    #[error("Payload error: {0}")]
    Payload(#[from] crate::payload::PayloadError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] crate::payload::IntegrityError),

    #[error("Cipher error: {0}")]
    Cipher(#[from] crate::cipher::CipherError),

    #[error("Key error: {0}")]
    Key(#[from] crate::keys::KeyError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("File error: {0}")]
    File(#[from] crate::file::FileError),

    #[error("Key generation error: {0}")]
    KeyGen(#[from] crate::keygen::KeyGenError),

    #[error("{0}")]
    License(#[from] crate::codec::LicenseError),
}

impl AslError {
    /// Returns a suggestion for resolving this error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Config(e) => e.suggestion(),
            Self::Validation(_) => Some("Fill in all required fields and make ValidToUtc later than ValidFromUtc"),
            Self::Integrity(_) => Some("The license file was modified; request a new file from the issuer"),
            Self::Payload(e) if e.is_integrity_error() => {
                Some("The license file was modified; request a new file from the issuer")
            }
            Self::License(crate::codec::LicenseError::InvalidLicenseFile) => {
                Some("Check that the file was issued for this installation and has not been edited")
            }
            Self::License(e) if e.is_expired() => Some("Request a renewed license from your dealer"),
            Self::KeyGen(_) => Some("Retry; if the problem persists check the license key registry"),
            _ => None,
        }
    }

    /// Returns true if this is a cryptographic error
    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Self::Cipher(_) | Self::Key(_) | Self::Config(_))
    }

    /// Returns true if a checksum was missing or did not match
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Self::Integrity(_) => true,
            Self::Payload(e) => e.is_integrity_error(),
            _ => false,
        }
    }

    /// Returns true if the license record itself was rejected
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Payload(crate::payload::PayloadError::Validation(_))
                | Self::License(crate::codec::LicenseError::Validation(_))
        )
    }

    /// Returns true if this is a file IO error
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::File(_))
    }
}
