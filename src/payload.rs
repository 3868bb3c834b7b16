//! Checksum assembly and verification for license payloads
//!
//! Assembly:
//! 1. project the record to JSON and drop `ChecksumSHA256`
//! 2. canonicalize and hash the UTF-8 bytes
//! 3. insert the hex digest as `ChecksumSHA256`
//! 4. canonicalize again; that text is what gets encrypted
//!
//! Verification runs the same steps backwards on the decrypted text. The
//! digest is computed over the parsed JSON, so fields this crate does not
//! model are still covered.

use crate::canonical::{self, CanonicalError};
use crate::checksum;
use crate::record::{LicenseRecord, ValidationError, CHECKSUM_FIELD};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Integrity failures. Never carries the digests involved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("license payload has no checksum")]
    MissingChecksum,

    #[error("license payload checksum does not match; file is corrupt or tampered")]
    ChecksumMismatch,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Invalid license record: {0}")]
    Validation(#[from] ValidationError),

    #[error("Canonicalization error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

impl PayloadError {
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}

/// A decoded payload whose checksum matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayload {
    /// The record including its `checksum_sha256`
    pub record: LicenseRecord,
    pub verified: bool,
}

/// Canonical JSON of `record` with its checksum removed.
pub fn canonical_without_checksum(record: &LicenseRecord) -> Result<String, PayloadError> {
    let object = project_without_checksum(record)?;
    Ok(canonical::canonicalize(&Value::Object(object))?)
}

/// The checksum `assemble` would embed for `record`.
pub fn checksum_of(record: &LicenseRecord) -> Result<String, PayloadError> {
    let canonical = canonical_without_checksum(record)?;
    Ok(checksum::compute_sha256_hex(canonical.as_bytes()))
}

/// Build the final canonical JSON, checksum included, for `record`.
///
/// The caller's record is not modified; any checksum it already carries is
/// ignored and recomputed.
pub fn assemble(record: &LicenseRecord) -> Result<String, PayloadError> {
    record.validate()?;

    let mut object = project_without_checksum(record)?;
    let canonical = canonical::canonicalize(&Value::Object(object.clone()))?;
    let digest = checksum::compute_sha256_hex(canonical.as_bytes());

    object.insert(CHECKSUM_FIELD.to_string(), Value::String(digest));
    let assembled = canonical::canonicalize(&Value::Object(object))?;

    debug!(
        product_id = %record.product_id,
        bytes = assembled.len(),
        "Assembled license payload"
    );
    Ok(assembled)
}

/// Parse final canonical JSON, check its embedded checksum and return the record.
pub fn extract_and_verify(json: &str) -> Result<VerifiedPayload, PayloadError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| PayloadError::Malformed(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(PayloadError::Malformed(
            "payload is not a JSON object".to_string(),
        ));
    };

    let expected = match object.remove(CHECKSUM_FIELD) {
        Some(Value::String(hex)) if !hex.trim().is_empty() => hex,
        _ => return Err(IntegrityError::MissingChecksum.into()),
    };

    let canonical = canonical::canonicalize(&Value::Object(object.clone()))?;
    if !checksum::verify(canonical.as_bytes(), &expected) {
        return Err(IntegrityError::ChecksumMismatch.into());
    }

    object.insert(CHECKSUM_FIELD.to_string(), Value::String(expected));
    let record: LicenseRecord = serde_json::from_value(Value::Object(object))
        .map_err(|e| PayloadError::Malformed(e.to_string()))?;
    record.validate()?;

    Ok(VerifiedPayload {
        record,
        verified: true,
    })
}

fn project_without_checksum(record: &LicenseRecord) -> Result<Map<String, Value>, PayloadError> {
    match serde_json::to_value(record).map_err(CanonicalError::from)? {
        Value::Object(mut object) => {
            object.remove(CHECKSUM_FIELD);
            Ok(object)
        }
        _ => Err(PayloadError::Malformed(
            "license record did not serialize to an object".to_string(),
        )),
    }
}
