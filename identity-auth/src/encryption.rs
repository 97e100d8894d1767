//! AES-256-GCM encryption for OAuth tokens stored at rest.
//!
//! Session rows hold the token pair encrypted; the key is a 32-byte value
//! provided as a hex-encoded string (64 characters) in process
//! configuration. The random nonce is prepended to the ciphertext and the
//! whole blob is base64-encoded for storage in a text column.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;

use crate::error::{storage_error, Error, ErrorKind, StorageErrorKind};

/// 12-byte nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

fn parse_key(key_hex: &str) -> Result<Vec<u8>, Error> {
    let key = hex::decode(key_hex).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Storage(StorageErrorKind::EncryptionFailed),
    })?;
    if key.len() != 32 {
        return Err(storage_error(StorageErrorKind::EncryptionFailed));
    }
    Ok(key)
}

/// Encrypts plaintext with a random nonce; returns base64(nonce || ciphertext).
pub fn encrypt(plaintext: &str, key_hex: &str) -> Result<String, Error> {
    let key = parse_key(key_hex)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| storage_error(StorageErrorKind::EncryptionFailed))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| storage_error(StorageErrorKind::EncryptionFailed))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend(ciphertext);

    Ok(BASE64.encode(combined))
}

/// Decrypts a blob produced by [`encrypt`].
pub fn decrypt(ciphertext_b64: &str, key_hex: &str) -> Result<String, Error> {
    let key = parse_key(key_hex)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| storage_error(StorageErrorKind::DecryptionFailed))?;

    let combined = BASE64.decode(ciphertext_b64).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Storage(StorageErrorKind::DecryptionFailed),
    })?;

    if combined.len() < NONCE_SIZE {
        return Err(storage_error(StorageErrorKind::DecryptionFailed));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext_bytes = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| storage_error(StorageErrorKind::DecryptionFailed))?;

    String::from_utf8(plaintext_bytes).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Storage(StorageErrorKind::DecryptionFailed),
    })
}

/// Encrypts a value only when present (refresh tokens are optional).
pub fn encrypt_optional(plaintext: Option<&str>, key_hex: &str) -> Result<Option<String>, Error> {
    plaintext.map(|pt| encrypt(pt, key_hex)).transpose()
}
