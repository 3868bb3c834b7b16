use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// JSON key of the embedded checksum.
pub const CHECKSUM_FIELD: &str = "ChecksumSHA256";

/// Kind of license issued to a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseType {
    Demo,
    Subscription,
    Permanent,
}

impl LicenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::Demo => "Demo",
            LicenseType::Subscription => "Subscription",
            LicenseType::Permanent => "Permanent",
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, LicenseType::Demo)
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a license is still inside its validity window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseStatus {
    Valid,
    Expired,
}

/// The license payload carried inside an ASL file.
///
/// Field names on the wire follow the issued-file format (`CompanyName`,
/// `ProductID`, ...). Optional fields that are `None` are omitted, never
/// written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    #[serde(rename = "CompanyName")]
    pub company_name: String,
    #[serde(rename = "ProductID")]
    pub product_id: String,
    #[serde(rename = "DealerCode")]
    pub dealer_code: String,
    #[serde(rename = "LicenseKey")]
    pub license_key: String,
    #[serde(rename = "LicenseType")]
    pub license_type: LicenseType,
    #[serde(
        rename = "CurrencyCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub currency_code: Option<String>,
    #[serde(rename = "ValidFromUtc", with = "iso_utc")]
    pub valid_from_utc: DateTime<Utc>,
    #[serde(rename = "ValidToUtc", with = "iso_utc")]
    pub valid_to_utc: DateTime<Utc>,
    #[serde(
        rename = "ModuleCodes",
        default,
        deserialize_with = "deserialize_null_as_empty_vec"
    )]
    pub module_codes: Vec<String>,
    #[serde(
        rename = "ChecksumSHA256",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub checksum_sha256: Option<String>,
}

impl LicenseRecord {
    /// Create a record with no currency, no modules and no checksum
    pub fn new(
        company_name: impl Into<String>,
        product_id: impl Into<String>,
        dealer_code: impl Into<String>,
        license_key: impl Into<String>,
        license_type: LicenseType,
        valid_from_utc: DateTime<Utc>,
        valid_to_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            product_id: product_id.into(),
            dealer_code: dealer_code.into(),
            license_key: license_key.into(),
            license_type,
            currency_code: None,
            valid_from_utc,
            valid_to_utc,
            module_codes: Vec::new(),
            checksum_sha256: None,
        }
    }

    pub fn with_currency_code(mut self, currency_code: impl Into<String>) -> Self {
        self.currency_code = Some(currency_code.into());
        self
    }

    pub fn with_module_codes<I, S>(mut self, module_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module_codes = module_codes.into_iter().map(Into::into).collect();
        self
    }

    /// A copy of this record with the checksum unset
    pub fn without_checksum(&self) -> Self {
        Self {
            checksum_sha256: None,
            ..self.clone()
        }
    }

    /// Check if the license has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_to_utc < now
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> LicenseStatus {
        if self.is_expired_at(now) {
            LicenseStatus::Expired
        } else {
            LicenseStatus::Valid
        }
    }

    /// Validate the structural preconditions and return all violations found
    ///
    /// Checked:
    /// - company, product, dealer and license key are non-blank
    /// - `valid_to_utc` is strictly after `valid_from_utc`
    ///
    /// Business rules (allowed period per license type, key uniqueness) are
    /// the issuer's concern and not checked here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        let required = [
            ("CompanyName", &self.company_name),
            ("ProductID", &self.product_id),
            ("DealerCode", &self.dealer_code),
            ("LicenseKey", &self.license_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                violations.push(FieldViolation {
                    field,
                    kind: ViolationKind::Required,
                    message: format!("{} is required", field),
                });
            }
        }

        if self.valid_to_utc <= self.valid_from_utc {
            violations.push(FieldViolation {
                field: "ValidToUtc",
                kind: ViolationKind::OutOfRange,
                message: format!(
                    "ValidToUtc ({}) must be after ValidFromUtc ({})",
                    self.valid_to_utc, self.valid_from_utc
                ),
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }
}

/// Types of validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Required,
    OutOfRange,
}

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub kind: ViolationKind,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A license record that does not satisfy its structural preconditions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("license record failed validation with {} error(s)", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Check whether a given field is among the violations
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

/// Deserialize null as empty Vec so older payloads with `"ModuleCodes":null` still load
fn deserialize_null_as_empty_vec<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// UTC timestamps as ISO-8601 with a `Z` suffix and only as many fractional
/// digits as needed (`2025-01-01T00:00:00Z`).
mod iso_utc {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
