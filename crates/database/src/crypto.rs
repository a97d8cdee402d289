//! At-rest encryption for tenant secrets.
//!
//! Access tokens are sealed with an XSalsa20-Poly1305 secretbox and stored as
//! base64 of `nonce || ciphertext`. They are only opened in memory when a
//! webhook signature has to be checked.

use std::env;
use std::fmt;

use base64::Engine;
use rand_core::{OsRng, RngCore};
use thiserror::Error;
use xsalsa20poly1305::aead::{Aead, KeyInit};
use xsalsa20poly1305::{Key, Nonce, XSalsa20Poly1305};

const SECRETBOX_KEY_LEN: usize = 32;
const SECRETBOX_NONCE_LEN: usize = 24;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("missing secretbox key")]
    MissingKey,
    #[error("invalid secretbox key length: {0}")]
    InvalidKeyLength(usize),
    #[error("invalid ciphertext length: {0}")]
    InvalidCiphertextLength(usize),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("hex error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("decrypted secret is not valid UTF-8")]
    Utf8,
    #[error("crypto failure")]
    Aead,
}

/// Symmetric codec for secrets stored in the database.
#[derive(Clone)]
pub struct SecretBoxCodec {
    key: [u8; SECRETBOX_KEY_LEN],
}

impl fmt::Debug for SecretBoxCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBoxCodec").finish_non_exhaustive()
    }
}

impl SecretBoxCodec {
    pub fn from_env(var: &str) -> Result<Self, CryptoError> {
        let value = env::var(var).map_err(|_| CryptoError::MissingKey)?;
        Self::from_key_str(&value)
    }

    /// Build a codec from a 32-byte key given as hex (optionally `hex:`-prefixed) or base64.
    pub fn from_key_str(value: &str) -> Result<Self, CryptoError> {
        let key = decode_key(value)?;
        Ok(Self { key })
    }

    /// Seal a plain-text secret into its stored form.
    pub fn seal(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.key));
        let mut nonce_bytes = [0u8; SECRETBOX_NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Aead)?;

        let mut out = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(out))
    }

    /// Open a stored secret.
    pub fn open(&self, sealed: &str) -> Result<String, CryptoError> {
        let input = base64::engine::general_purpose::STANDARD.decode(sealed.trim())?;
        if input.len() < SECRETBOX_NONCE_LEN {
            return Err(CryptoError::InvalidCiphertextLength(input.len()));
        }
        let (nonce_bytes, ciphertext) = input.split_at(SECRETBOX_NONCE_LEN);
        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.key));
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::Aead)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
    }
}

fn decode_key(value: &str) -> Result<[u8; SECRETBOX_KEY_LEN], CryptoError> {
    let trimmed = value.trim();
    let bytes = if let Some(hex_value) = trimmed.strip_prefix("hex:") {
        hex::decode(hex_value)?
    } else if is_probably_hex(trimmed) {
        hex::decode(trimmed)?
    } else {
        base64::engine::general_purpose::STANDARD.decode(trimmed)?
    };

    if bytes.len() != SECRETBOX_KEY_LEN {
        return Err(CryptoError::InvalidKeyLength(bytes.len()));
    }

    let mut key = [0u8; SECRETBOX_KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(key)
}

fn is_probably_hex(value: &str) -> bool {
    value.len() == SECRETBOX_KEY_LEN * 2 && value.chars().all(|c| c.is_ascii_hexdigit())
}
