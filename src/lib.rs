pub mod canonical;
pub mod checksum;
pub mod cipher;
pub mod codec;
pub mod config;
pub mod error;
pub mod file;
pub mod keygen;
pub mod keys;
pub mod payload;
pub mod prelude;
pub mod record;

pub use canonical::{canonicalize, to_canonical_json, CanonicalError};
pub use cipher::{decrypt_from_base64, encrypt_to_base64, CipherError};
pub use codec::{
    create_license_file, import_license_file, open_license_file, preview, IssuedLicense,
    LicenseCodec, LicenseError, OpenedLicense,
};
pub use config::{ConfigError, CryptoSettings};
pub use error::AslError;
pub use file::{load_license_file, save_license_file, FileError};
pub use keygen::{KeyGenError, KeyRegistry, LicenseKeyGenerator};
pub use keys::{AesIv, AesKey, KeyError};
pub use payload::{assemble, extract_and_verify, IntegrityError, PayloadError, VerifiedPayload};
pub use record::{LicenseRecord, LicenseStatus, LicenseType, ValidationError};
