use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use rand::{rngs::OsRng, RngCore};
use tracing::warn;

use super::key_store::{KeyMaterial, KeyStore};
use crate::error::{FormuliteError, Result};

const TOKEN_VERSION: u8 = 0x01;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encrypts and decrypts stored API secrets with AES-256-GCM.
///
/// Token format: URL-safe base64 of `version (1) + nonce (12) + ciphertext + tag (16)`.
/// The empty string always maps to itself and means "no secret configured".
#[derive(Debug, Clone)]
pub struct CredentialCipher {
    key_store: KeyStore,
}

impl CredentialCipher {
    pub fn new(key_store: KeyStore) -> Self {
        Self { key_store }
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    /// Encrypt a secret, creating the key file if this is the first use.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let key = self.key_store.load_or_create()?;
        seal(&key, plaintext.as_bytes())
    }

    /// Decrypt a stored secret.
    ///
    /// Any failure (missing or different key, corrupted token) is logged
    /// and yields the empty string, i.e. "no secret configured".
    pub fn decrypt(&self, token: &str) -> String {
        match self.try_decrypt(token) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(
                    error = %e,
                    key_path = %self.key_store.path().display(),
                    "Failed to decrypt stored credential, treating it as unset"
                );
                String::new()
            }
        }
    }

    /// Like [`decrypt`](Self::decrypt) but reports why decryption failed.
    /// Never creates a key file.
    pub fn try_decrypt(&self, token: &str) -> Result<String> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let key = self.key_store.load()?.ok_or_else(|| {
            FormuliteError::KeyStore(format!(
                "No key file at {}",
                self.key_store.path().display()
            ))
        })?;
        open(&key, token)
    }
}

fn cipher_for(key: &KeyMaterial) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| FormuliteError::Crypto(format!("Cipher error: {e}")))
}

fn seal(key: &KeyMaterial, plaintext: &[u8]) -> Result<String> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| FormuliteError::Crypto(format!("Encryption failed: {e}")))?;

    let mut token = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    token.push(TOKEN_VERSION);
    token.extend_from_slice(&nonce_bytes);
    token.extend_from_slice(&ciphertext);

    Ok(URL_SAFE.encode(token))
}

fn open(key: &KeyMaterial, token: &str) -> Result<String> {
    let raw = URL_SAFE
        .decode(token.trim())
        .map_err(|e| FormuliteError::Crypto(format!("Ciphertext is not valid base64: {e}")))?;

    if raw.len() < 1 + NONCE_LEN + TAG_LEN {
        return Err(FormuliteError::Crypto("Ciphertext too short".to_string()));
    }
    if raw[0] != TOKEN_VERSION {
        return Err(FormuliteError::Crypto(format!(
            "Unknown ciphertext version: {}",
            raw[0]
        )));
    }

    let (nonce_bytes, ciphertext) = raw[1..].split_at(NONCE_LEN);
    let plaintext = cipher_for(key)?
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| {
            FormuliteError::Crypto("Decryption failed - wrong key or corrupted data".to_string())
        })?;

    String::from_utf8(plaintext)
        .map_err(|e| FormuliteError::Crypto(format!("Decrypted secret is not UTF-8: {e}")))
}
