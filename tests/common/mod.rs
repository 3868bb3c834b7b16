//! Common test utilities for asl-codec integration tests

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::path::PathBuf;

pub use asl_codec::{AesIv, AesKey, LicenseCodec, LicenseRecord, LicenseType};

/// Development key material shared with the desktop issuer
pub const DEV_KEY_B64: &str = "Zkfwt0M/OOZcMAb5qSLjOKKw6LeqIm9/PYtuZlRpBdw=";
pub const DEV_IV_B64: &str = "Fvwy7WRbrjUaNmk6QGZsAg==";

/// Checksum of [`acme_corp`] without its checksum field
pub const ACME_CHECKSUM: &str = "3f70a0d091d4600cbc66fefa3ced94001e567596d125ea240ca16bdabd36c13c";

pub fn dev_key() -> AesKey {
    AesKey::from_base64(DEV_KEY_B64).expect("dev key")
}

pub fn dev_iv() -> AesIv {
    AesIv::from_base64(DEV_IV_B64).expect("dev iv")
}

pub fn dev_codec() -> LicenseCodec {
    LicenseCodec::new(dev_key(), dev_iv())
}

/// One-month subscription for Acme Corp with a single module
pub fn acme_corp() -> LicenseRecord {
    LicenseRecord::new(
        "Acme Corp",
        "PROD-001",
        "DEALER-001",
        "CAEC138C83624A2A9CA6BBB54D33999B",
        LicenseType::Subscription,
        Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    )
    .with_module_codes(["MODULE-001"])
}

pub fn demo_record() -> LicenseRecord {
    LicenseRecord::new(
        "Demo Trading Sdn Bhd",
        "PROD-002",
        "DEALER-007",
        "DEMO-KEY-0001",
        LicenseType::Demo,
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap(),
    )
    .with_currency_code("MYR")
    .with_module_codes(["POS", "INVENTORY"])
}

pub fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Base64 ASL of [`acme_corp`] produced by the desktop issuer with the dev key
pub fn acme_fixture() -> String {
    std::fs::read_to_string(data_path("acme_corp.asl"))
        .expect("fixture")
        .trim()
        .to_string()
}
