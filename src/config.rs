//! Key material configuration
//!
//! Issuer and consumer must share the same AES key and IV. Both are
//! provisioned as Base64 strings, usually through the environment:
//!
//! | Variable      | Content                      |
//! |---------------|------------------------------|
//! | `ASL_AES_KEY` | Base64 of 32 key bytes       |
//! | `ASL_AES_IV`  | Base64 of 16 IV bytes        |

use crate::keys::{AesIv, AesKey, KeyError};
use thiserror::Error;
use tracing::debug;

pub const KEY_ENV: &str = "ASL_AES_KEY";
pub const IV_ENV: &str = "ASL_AES_IV";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {name}")]
    Missing { name: &'static str },

    #[error("Invalid configuration value {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: KeyError,
    },
}

impl ConfigError {
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Missing { .. } => Some("Set ASL_AES_KEY and ASL_AES_IV to Base64-encoded key material"),
            Self::Invalid { .. } => Some("The key must decode to 32 bytes and the IV to 16 bytes"),
        }
    }
}

/// AES key and IV used to create and open license files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoSettings {
    key: AesKey,
    iv: AesIv,
}

impl CryptoSettings {
    pub fn new(key: AesKey, iv: AesIv) -> Self {
        Self { key, iv }
    }

    /// Decode Base64 key and IV, checking their lengths
    pub fn from_base64(key: &str, iv: &str) -> Result<Self, ConfigError> {
        let key = AesKey::from_base64(key).map_err(|source| ConfigError::Invalid {
            name: KEY_ENV,
            source,
        })?;
        let iv = AesIv::from_base64(iv).map_err(|source| ConfigError::Invalid {
            name: IV_ENV,
            source,
        })?;
        Ok(Self { key, iv })
    }

    /// Load from `ASL_AES_KEY` / `ASL_AES_IV`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing { name })
        };

        let settings = Self::from_base64(&read(KEY_ENV)?, &read(IV_ENV)?)?;
        debug!("Loaded license key material");
        Ok(settings)
    }

    /// Fresh random key and IV
    pub fn generate() -> Self {
        Self {
            key: AesKey::generate(),
            iv: AesIv::generate(),
        }
    }

    pub fn key(&self) -> &AesKey {
        &self.key
    }

    pub fn iv(&self) -> &AesIv {
        &self.iv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const DEV_KEY: &str = "Zkfwt0M/OOZcMAb5qSLjOKKw6LeqIm9/PYtuZlRpBdw=";
    const DEV_IV: &str = "Fvwy7WRbrjUaNmk6QGZsAg==";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_base64() {
        let settings = CryptoSettings::from_base64(DEV_KEY, DEV_IV).unwrap();
        assert_eq!(
            hex::encode(settings.key().as_slice()),
            "6647f0b7433f38e65c3006f9a922e338a2b0e8b7aa226f7f3d8b6e66546905dc"
        );
        assert_eq!(
            hex::encode(settings.iv().as_slice()),
            "16fc32ed645bae351a36693a40666c02"
        );
    }

    #[test]
    fn test_swapped_values_are_rejected() {
        let err = CryptoSettings::from_base64(DEV_IV, DEV_KEY).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: KEY_ENV,
                source: KeyError::InvalidLength { got: 16, .. }
            }
        ));
    }

    #[test]
    fn test_from_lookup() {
        let settings =
            CryptoSettings::from_lookup(lookup(&[(KEY_ENV, DEV_KEY), (IV_ENV, DEV_IV)])).unwrap();
        assert_eq!(settings, CryptoSettings::from_base64(DEV_KEY, DEV_IV).unwrap());
    }

    #[test]
    fn test_missing_and_blank_values() {
        let err = CryptoSettings::from_lookup(lookup(&[(KEY_ENV, DEV_KEY)])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: IV_ENV }));
        assert!(err.suggestion().is_some());

        let err =
            CryptoSettings::from_lookup(lookup(&[(KEY_ENV, "  "), (IV_ENV, DEV_IV)])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: KEY_ENV }));
    }

    #[test]
    fn test_generate_is_random() {
        assert_ne!(CryptoSettings::generate(), CryptoSettings::generate());
    }
}
