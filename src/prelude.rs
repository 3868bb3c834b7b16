//! ASL Prelude
//!
//! Commonly used types in one import.
//!
//! # Example
//!
//! ```rust
//! use asl_codec::prelude::*;
//! use chrono::{TimeZone, Utc};
//!
//! # fn example() -> Result<(), AslError> {
//! let codec = LicenseCodec::from_settings(&CryptoSettings::generate());
//! let record = LicenseRecord::new(
//!     "Acme", "PROD-001", "DEALER-001", "", LicenseType::Subscription,
//!     Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
//! );
//! let issued = codec.create_with_generated_key(&record, &LicenseKeyGenerator::new())?;
//! let opened = codec.open(&issued.asl)?;
//! assert_eq!(opened.record.license_key, issued.license_key);
//! # Ok(())
//! # }
//! ```

pub use crate::codec::{IssuedLicense, LicenseCodec, LicenseError, OpenedLicense};
pub use crate::config::CryptoSettings;
pub use crate::error::AslError;
pub use crate::keygen::{KeyRegistry, LicenseKeyGenerator};
pub use crate::keys::{AesIv, AesKey};
pub use crate::record::{LicenseRecord, LicenseStatus, LicenseType};
