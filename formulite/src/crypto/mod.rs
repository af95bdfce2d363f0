//! Encryption of API secrets at rest.
//!
//! Secrets entered by the user are stored in the settings file as
//! ciphertext produced by [`CredentialCipher`]. The symmetric key lives in
//! a single key file managed by [`KeyStore`], which is created on first
//! use and read thereafter. The key store is an explicit dependency so
//! callers and tests choose its location.
//!
//! ```rust,ignore
//! let cipher = CredentialCipher::new(KeyStore::new(&config.storage.key_path));
//! let stored = cipher.encrypt("my-api-secret")?;
//! assert_eq!(cipher.decrypt(&stored), "my-api-secret");
//! ```

mod cipher;
mod key_store;

pub use cipher::CredentialCipher;
pub use key_store::{KeyMaterial, KeyStore, KEY_LEN};
