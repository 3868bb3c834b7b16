use crate::keys::{AesIv, AesKey, KeyError};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, Iv, Key, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;
use zeroize::Zeroize;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Invalid key material: {0}")]
    Key(#[from] KeyError),
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
    #[error("Ciphertext length {0} is not a positive multiple of the block size")]
    InvalidCiphertextLength(usize),
    #[error("Decryption failed: invalid padding")]
    InvalidPadding,
    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Encrypt UTF-8 text with AES-256-CBC / PKCS7 and return the Base64 ciphertext
///
/// The IV is not prepended to the output; both sides must already agree on it.
pub fn encrypt_to_base64(plaintext: &str, key: &[u8], iv: &[u8]) -> Result<String, CipherError> {
    let key = AesKey::from_slice(key)?;
    let iv = AesIv::from_slice(iv)?;
    encrypt_with(plaintext, &key, &iv)
}

/// Decrypt Base64 AES-256-CBC / PKCS7 ciphertext back to UTF-8 text
pub fn decrypt_from_base64(encoded: &str, key: &[u8], iv: &[u8]) -> Result<String, CipherError> {
    let key = AesKey::from_slice(key)?;
    let iv = AesIv::from_slice(iv)?;
    decrypt_with(encoded, &key, &iv)
}

/// Same as [`encrypt_to_base64`] for already validated key material
pub fn encrypt_with(plaintext: &str, key: &AesKey, iv: &AesIv) -> Result<String, CipherError> {
    let ciphertext = encrypt_bytes(plaintext.as_bytes(), key, iv);
    Ok(BASE64.encode(ciphertext))
}

/// Same as [`decrypt_from_base64`] for already validated key material
pub fn decrypt_with(encoded: &str, key: &AesKey, iv: &AesIv) -> Result<String, CipherError> {
    let ciphertext = BASE64.decode(encoded.trim())?;
    let plaintext = decrypt_bytes(&ciphertext, key, iv)?;
    String::from_utf8(plaintext).map_err(|err| {
        let mut bytes = err.into_bytes();
        bytes.zeroize();
        CipherError::InvalidUtf8
    })
}

/// Raw AES-256-CBC / PKCS7 encryption
pub fn encrypt_bytes(plaintext: &[u8], key: &AesKey, iv: &AesIv) -> Vec<u8> {
    Aes256CbcEnc::new(
        Key::<Aes256CbcEnc>::from_slice(key.as_slice()),
        Iv::<Aes256CbcEnc>::from_slice(iv.as_slice()),
    )
    .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Raw AES-256-CBC / PKCS7 decryption
pub fn decrypt_bytes(ciphertext: &[u8], key: &AesKey, iv: &AesIv) -> Result<Vec<u8>, CipherError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::InvalidCiphertextLength(ciphertext.len()));
    }

    Aes256CbcDec::new(
        Key::<Aes256CbcDec>::from_slice(key.as_slice()),
        Iv::<Aes256CbcDec>::from_slice(iv.as_slice()),
    )
    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
    .map_err(|_| CipherError::InvalidPadding)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];
    const IV: [u8; 16] = [0x24; 16];

    #[test]
    fn test_encryption_decryption() -> Result<(), CipherError> {
        let plaintext = r#"{"CompanyName":"Acme"}"#;
        let encoded = encrypt_to_base64(plaintext, &KEY, &IV)?;
        assert_ne!(encoded, plaintext);
        assert_eq!(decrypt_from_base64(&encoded, &KEY, &IV)?, plaintext);
        Ok(())
    }

    #[test]
    fn test_output_is_padded_to_block_size() -> Result<(), CipherError> {
        let key = AesKey::from_slice(&KEY)?;
        let iv = AesIv::from_slice(&IV)?;
        // PKCS7 always adds at least one byte
        assert_eq!(encrypt_bytes(b"", &key, &iv).len(), 16);
        assert_eq!(encrypt_bytes(&[0u8; 16], &key, &iv).len(), 32);
        assert_eq!(encrypt_bytes(&[0u8; 17], &key, &iv).len(), 32);
        Ok(())
    }

    #[test]
    fn test_known_vector() -> Result<(), CipherError> {
        // NIST SP 800-38A F.2.5 first block, padded with a full PKCS7 block
        let key = hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .unwrap();
        let iv = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let block = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();

        let key = AesKey::from_slice(&key)?;
        let iv = AesIv::from_slice(&iv)?;
        let ciphertext = encrypt_bytes(&block, &key, &iv);
        assert_eq!(
            hex::encode(&ciphertext[..16]),
            "f58c4c04d6e5f1ba779eabfb5f7bfbd6"
        );
        assert_eq!(decrypt_bytes(&ciphertext, &key, &iv)?, block);
        Ok(())
    }

    #[test]
    fn test_invalid_key_and_iv_length() {
        assert!(matches!(
            encrypt_to_base64("x", &[0u8; 16], &IV),
            Err(CipherError::Key(KeyError::InvalidLength { what: "key", .. }))
        ));
        assert!(matches!(
            decrypt_from_base64("AAAA", &KEY, &[0u8; 8]),
            Err(CipherError::Key(KeyError::InvalidLength { what: "iv", .. }))
        ));
    }

    #[test]
    fn test_malformed_base64() {
        assert!(matches!(
            decrypt_from_base64("***", &KEY, &IV),
            Err(CipherError::Base64Error(_))
        ));
    }

    #[test]
    fn test_wrong_block_length() {
        let encoded = BASE64.encode([0u8; 15]);
        assert!(matches!(
            decrypt_from_base64(&encoded, &KEY, &IV),
            Err(CipherError::InvalidCiphertextLength(15))
        ));
        assert!(matches!(
            decrypt_from_base64("", &KEY, &IV),
            Err(CipherError::InvalidCiphertextLength(0))
        ));
    }

    #[test]
    fn test_wrong_key_fails_or_garbles() -> Result<(), CipherError> {
        let plaintext = "license payload that spans more than one block";
        let encoded = encrypt_to_base64(plaintext, &KEY, &IV)?;
        match decrypt_from_base64(&encoded, &[0x43; 32], &IV) {
            Ok(decrypted) => assert_ne!(decrypted, plaintext),
            Err(err) => assert!(matches!(
                err,
                CipherError::InvalidPadding | CipherError::InvalidUtf8
            )),
        }
        Ok(())
    }
}
