//! License file facade
//!
//! This is the only layer that generalizes errors. Opening a file collapses
//! every failure (bad Base64, wrong key, bad padding, broken JSON, checksum
//! mismatch, invalid record) into [`LicenseError::InvalidLicenseFile`] so a
//! caller cannot tell a wrong key from a tampered file. Creating a file keeps
//! validation errors precise and hides everything else behind
//! [`LicenseError::OperationFailed`].
//!
//! # Example
//!
//! ```rust
//! use asl_codec::{LicenseCodec, LicenseRecord, LicenseType};
//! use asl_codec::keys::{AesIv, AesKey};
//! use chrono::{TimeZone, Utc};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = LicenseCodec::new(AesKey::generate(), AesIv::generate());
//! let record = LicenseRecord::new(
//!     "Acme", "P1", "D1", "K1", LicenseType::Demo,
//!     Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
//! );
//!
//! let asl = codec.create(&record)?;
//! let opened = codec.open(&asl)?;
//! assert!(opened.verified);
//! assert_eq!(opened.record.without_checksum(), record);
//! # Ok(())
//! # }
//! ```

use crate::cipher::{self, CipherError};
use crate::config::CryptoSettings;
use crate::keygen::{KeyRegistry, LicenseKeyGenerator};
use crate::keys::{AesIv, AesKey};
use crate::payload::{self, PayloadError};
use crate::record::{LicenseRecord, ValidationError};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

/// Outward-facing license errors
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The record handed in for issuing is incomplete or inconsistent
    #[error("Invalid license data: {0}")]
    Validation(#[from] ValidationError),

    /// The file could not be decrypted, parsed or verified
    #[error("Invalid license file.")]
    InvalidLicenseFile,

    /// Issuing failed for an internal reason
    #[error("Operation failed. Contact admin.")]
    OperationFailed,

    #[error("Demo license expired.")]
    DemoExpired,

    #[error("License expired.")]
    Expired,
}

impl LicenseError {
    /// Returns true if the file itself was rejected
    pub fn is_invalid_file(&self) -> bool {
        matches!(self, Self::InvalidLicenseFile)
    }

    /// Returns true if the license was genuine but is past its end date
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::DemoExpired | Self::Expired)
    }
}

/// A license file that decrypted and passed its checksum check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedLicense {
    pub record: LicenseRecord,
    pub verified: bool,
}

/// A freshly issued license file together with the license key it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLicense {
    pub asl: String,
    pub license_key: String,
}

/// Assemble, checksum and encrypt `record` into a Base64 ASL string.
pub fn create_license_file(
    record: &LicenseRecord,
    key: &[u8],
    iv: &[u8],
) -> Result<String, LicenseError> {
    let key = AesKey::from_slice(key).map_err(|e| operation_failed("key", &e))?;
    let iv = AesIv::from_slice(iv).map_err(|e| operation_failed("iv", &e))?;
    create_with(record, &key, &iv)
}

/// Decrypt a Base64 ASL string and verify its embedded checksum.
pub fn open_license_file(asl: &str, key: &[u8], iv: &[u8]) -> Result<OpenedLicense, LicenseError> {
    let key = AesKey::from_slice(key).map_err(|_| invalid_file("key"))?;
    let iv = AesIv::from_slice(iv).map_err(|_| invalid_file("iv"))?;
    open_with(asl, &key, &iv)
}

/// Open a license file and additionally reject it if it has expired at `now`.
pub fn import_license_file(
    asl: &str,
    key: &[u8],
    iv: &[u8],
    now: DateTime<Utc>,
) -> Result<OpenedLicense, LicenseError> {
    let opened = open_license_file(asl, key, iv)?;
    check_not_expired(opened, now)
}

/// The canonical JSON, checksum included, that `create_license_file` encrypts.
pub fn preview(record: &LicenseRecord) -> Result<String, LicenseError> {
    payload::assemble(record).map_err(create_error)
}

/// License codec bound to one key/IV pair
///
/// Holds no other state; every call is independent and the codec can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct LicenseCodec {
    key: AesKey,
    iv: AesIv,
}

impl LicenseCodec {
    pub fn new(key: AesKey, iv: AesIv) -> Self {
        Self { key, iv }
    }

    pub fn from_settings(settings: &CryptoSettings) -> Self {
        Self::new(settings.key().clone(), settings.iv().clone())
    }

    /// Create a Base64 ASL for `record`
    pub fn create(&self, record: &LicenseRecord) -> Result<String, LicenseError> {
        create_with(record, &self.key, &self.iv)
    }

    /// Create a Base64 ASL, generating a license key first when the record has none
    pub fn create_with_generated_key<R: KeyRegistry>(
        &self,
        record: &LicenseRecord,
        generator: &LicenseKeyGenerator<R>,
    ) -> Result<IssuedLicense, LicenseError> {
        let mut record = record.clone();
        if record.license_key.trim().is_empty() {
            record.license_key = generator
                .generate(&record.company_name, &record.product_id, None)
                .map_err(|e| operation_failed("keygen", &e))?;
        }

        let asl = create_with(&record, &self.key, &self.iv)?;
        Ok(IssuedLicense {
            asl,
            license_key: record.license_key,
        })
    }

    /// Decrypt and verify a Base64 ASL
    pub fn open(&self, asl: &str) -> Result<OpenedLicense, LicenseError> {
        open_with(asl, &self.key, &self.iv)
    }

    /// Decrypt, verify and reject expired licenses
    pub fn import(&self, asl: &str, now: DateTime<Utc>) -> Result<OpenedLicense, LicenseError> {
        let opened = self.open(asl)?;
        check_not_expired(opened, now)
    }
}

fn create_with(record: &LicenseRecord, key: &AesKey, iv: &AesIv) -> Result<String, LicenseError> {
    let json = payload::assemble(record).map_err(create_error)?;
    cipher::encrypt_with(&json, key, iv).map_err(|e| operation_failed("cipher", &e))
}

fn open_with(asl: &str, key: &AesKey, iv: &AesIv) -> Result<OpenedLicense, LicenseError> {
    let json = cipher::decrypt_with(asl, key, iv).map_err(|e| invalid_file(cipher_stage(&e)))?;
    let verified = payload::extract_and_verify(&json).map_err(|e| invalid_file(payload_stage(&e)))?;

    Ok(OpenedLicense {
        record: verified.record,
        verified: verified.verified,
    })
}

fn check_not_expired(opened: OpenedLicense, now: DateTime<Utc>) -> Result<OpenedLicense, LicenseError> {
    if !opened.record.is_expired_at(now) {
        return Ok(opened);
    }
    if opened.record.license_type.is_demo() {
        Err(LicenseError::DemoExpired)
    } else {
        Err(LicenseError::Expired)
    }
}

fn create_error(err: PayloadError) -> LicenseError {
    match err {
        PayloadError::Validation(violations) => LicenseError::Validation(violations),
        other => operation_failed("payload", &other),
    }
}

fn operation_failed(stage: &'static str, err: &dyn std::error::Error) -> LicenseError {
    warn!(stage, error = %err, "License creation failed");
    LicenseError::OperationFailed
}

// Only the stage is logged; digests and plaintext stay out of the logs.
fn invalid_file(stage: &'static str) -> LicenseError {
    debug!(stage, "Rejected license file");
    LicenseError::InvalidLicenseFile
}

fn cipher_stage(err: &CipherError) -> &'static str {
    match err {
        CipherError::Key(_) => "key",
        CipherError::Base64Error(_) => "base64",
        CipherError::InvalidCiphertextLength(_) => "block-length",
        CipherError::InvalidPadding => "padding",
        CipherError::InvalidUtf8 => "utf8",
    }
}

fn payload_stage(err: &PayloadError) -> &'static str {
    match err {
        PayloadError::Validation(_) => "validation",
        PayloadError::Canonical(_) => "canonical",
        PayloadError::Integrity(_) => "integrity",
        PayloadError::Malformed(_) => "malformed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LicenseType;
    use chrono::TimeZone;

    const KEY: [u8; 32] = [0x11; 32];
    const IV: [u8; 16] = [0x22; 16];

    fn record() -> LicenseRecord {
        LicenseRecord::new(
            "Acme",
            "P1",
            "D1",
            "K1",
            LicenseType::Demo,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_create_open_roundtrip() {
        let asl = create_license_file(&record(), &KEY, &IV).unwrap();
        let opened = open_license_file(&asl, &KEY, &IV).unwrap();
        assert!(opened.verified);
        assert_eq!(opened.record.without_checksum(), record());
    }

    #[test]
    fn test_validation_error_is_kept_on_create() {
        let mut bad = record();
        bad.product_id.clear();
        let err = create_license_file(&bad, &KEY, &IV).unwrap_err();
        assert!(matches!(err, LicenseError::Validation(ref v) if v.has_field("ProductID")));
    }

    #[test]
    fn test_bad_key_length_on_create_is_operation_failed() {
        let err = create_license_file(&record(), &KEY[..16], &IV).unwrap_err();
        assert!(matches!(err, LicenseError::OperationFailed));
        assert_eq!(err.to_string(), "Operation failed. Contact admin.");
    }

    #[test]
    fn test_every_open_failure_looks_the_same() {
        let asl = create_license_file(&record(), &KEY, &IV).unwrap();
        let failures = [
            open_license_file("%%%", &KEY, &IV),
            open_license_file(&asl, &[0x12; 32], &IV),
            open_license_file(&asl, &KEY, &[0x23; 16]),
            open_license_file(&asl, &KEY[..31], &IV),
            open_license_file(&asl[..asl.len() - 4], &KEY, &IV),
        ];
        for result in failures {
            let err = result.unwrap_err();
            assert!(err.is_invalid_file());
            assert_eq!(err.to_string(), "Invalid license file.");
        }
    }

    #[test]
    fn test_wrong_iv_only_garbles_first_block() {
        // CBC with a wrong IV still unpads; the checksum must catch it
        let asl = create_license_file(&record(), &KEY, &IV).unwrap();
        let mut iv = IV;
        iv[0] ^= 1;
        assert!(open_license_file(&asl, &KEY, &iv)
            .unwrap_err()
            .is_invalid_file());
    }

    #[test]
    fn test_import_classifies_expiry() {
        let codec = LicenseCodec::new(
            AesKey::from_slice(&KEY).unwrap(),
            AesIv::from_slice(&IV).unwrap(),
        );
        let later = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let during = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();

        let demo = codec.create(&record()).unwrap();
        assert!(codec.import(&demo, during).is_ok());
        assert!(matches!(
            codec.import(&demo, later),
            Err(LicenseError::DemoExpired)
        ));

        let mut paid = record();
        paid.license_type = LicenseType::Subscription;
        let paid = codec.create(&paid).unwrap();
        let err = codec.import(&paid, later).unwrap_err();
        assert!(matches!(err, LicenseError::Expired));
        assert!(err.is_expired());
    }

    #[test]
    fn test_preview_matches_decrypted_payload() {
        let json = preview(&record()).unwrap();
        let asl = create_license_file(&record(), &KEY, &IV).unwrap();
        assert_eq!(cipher::decrypt_from_base64(&asl, &KEY, &IV).unwrap(), json);
    }

    #[test]
    fn test_generated_key_is_filled_in() {
        let codec = LicenseCodec::new(AesKey::generate(), AesIv::generate());
        let mut keyless = record();
        keyless.license_key.clear();

        let issued = codec
            .create_with_generated_key(&keyless, &LicenseKeyGenerator::new())
            .unwrap();
        assert!(issued.license_key.starts_with("P1-"));

        let opened = codec.open(&issued.asl).unwrap();
        assert_eq!(opened.record.license_key, issued.license_key);
        assert!(keyless.license_key.is_empty());
    }

    #[test]
    fn test_existing_key_is_kept() {
        let codec = LicenseCodec::new(AesKey::generate(), AesIv::generate());
        let issued = codec
            .create_with_generated_key(&record(), &LicenseKeyGenerator::new())
            .unwrap();
        assert_eq!(issued.license_key, "K1");
    }
}
