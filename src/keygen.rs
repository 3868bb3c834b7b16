//! Human-readable license key generation
//!
//! Keys look like `PROD-1A2B-3C4D-5E6F-7A8B-9C0D`: a prefix taken from the
//! product id followed by the first 80 bits of a SHA-256 digest over
//! `company|product|timestamp|uuid|seed|attempt`, in five groups of four
//! uppercase hex characters.

use crate::checksum::compute_sha256_hex;
use chrono::Utc;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default number of attempts before giving up on a unique key
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Prefix used when the product id has no usable characters
pub const FALLBACK_PREFIX: &str = "GEN";

const PREFIX_LEN: usize = 4;
const GROUP_COUNT: usize = 5;
const GROUP_LEN: usize = 4;

/// Errors reported by a [`KeyRegistry`]
pub type RegistryError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum KeyGenError {
    #[error("Could not generate a unique license key after {attempts} attempt(s)")]
    Exhausted { attempts: usize },
}

/// Lookup of license keys that have already been issued
pub trait KeyRegistry {
    fn license_key_exists(&self, key: &str) -> Result<bool, RegistryError>;
}

/// Registry that knows no keys; the first generated key is accepted
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegistry;

impl KeyRegistry for NoRegistry {
    fn license_key_exists(&self, _key: &str) -> Result<bool, RegistryError> {
        Ok(false)
    }
}

impl KeyRegistry for HashSet<String> {
    fn license_key_exists(&self, key: &str) -> Result<bool, RegistryError> {
        Ok(self.contains(key))
    }
}

impl<T: KeyRegistry + ?Sized> KeyRegistry for &T {
    fn license_key_exists(&self, key: &str) -> Result<bool, RegistryError> {
        (**self).license_key_exists(key)
    }
}

/// License key generator with an optional uniqueness check
#[derive(Debug, Clone)]
pub struct LicenseKeyGenerator<R = NoRegistry> {
    registry: R,
    max_attempts: usize,
}

impl LicenseKeyGenerator<NoRegistry> {
    pub fn new() -> Self {
        Self {
            registry: NoRegistry,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for LicenseKeyGenerator<NoRegistry> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: KeyRegistry> LicenseKeyGenerator<R> {
    /// Check every candidate against `registry`, trying at most `max_attempts` times
    ///
    /// `max_attempts` is clamped to at least one.
    pub fn with_registry(registry: R, max_attempts: usize) -> Self {
        Self {
            registry,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Generate a key for `company_name` / `product_id`
    ///
    /// A registry lookup that fails counts as a collision and the next
    /// attempt is made.
    pub fn generate(
        &self,
        company_name: &str,
        product_id: &str,
        seed: Option<i64>,
    ) -> Result<String, KeyGenError> {
        let prefix = prefix_for(product_id);

        for attempt in 0..self.max_attempts {
            let raw = raw_input(company_name, product_id, seed, attempt);
            let key = format_key(&prefix, &compute_sha256_hex(raw.as_bytes()));

            match self.registry.license_key_exists(&key) {
                Ok(false) => {
                    debug!(attempt, "Generated license key");
                    return Ok(key);
                }
                Ok(true) => debug!(attempt, "License key already issued, retrying"),
                Err(e) => warn!(attempt, error = %e, "License key lookup failed, retrying"),
            }
        }

        Err(KeyGenError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}

/// First four uppercase alphanumerics of `product_id`, or `GEN`
pub fn prefix_for(product_id: &str) -> String {
    let prefix: String = product_id
        .to_uppercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(PREFIX_LEN)
        .collect();

    if prefix.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        prefix
    }
}

fn raw_input(company_name: &str, product_id: &str, seed: Option<i64>, attempt: usize) -> String {
    let now = Utc::now().format("%Y%m%d%H%M%S%3f");
    let nonce = Uuid::new_v4().simple();
    let seed = seed.map(|s| s.to_string()).unwrap_or_default();
    format!("{company_name}|{product_id}|{now}|{nonce}|{seed}|{attempt}")
}

fn format_key(prefix: &str, digest_hex: &str) -> String {
    let hex = digest_hex.to_ascii_uppercase();
    let mut key = String::with_capacity(prefix.len() + GROUP_COUNT * (GROUP_LEN + 1));
    key.push_str(prefix);
    for group in 0..GROUP_COUNT {
        key.push('-');
        key.push_str(&hex[group * GROUP_LEN..(group + 1) * GROUP_LEN]);
    }
    key
}
