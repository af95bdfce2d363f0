use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::URL_SAFE, Engine};
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::error::{FormuliteError, Result};

pub const KEY_LEN: usize = 32;

/// A 256-bit symmetric key. Zeroized on drop.
pub struct KeyMaterial([u8; KEY_LEN]);

impl KeyMaterial {
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn encode(&self) -> String {
        URL_SAFE.encode(self.0)
    }

    fn decode(text: &str) -> Result<Self> {
        let mut raw = URL_SAFE
            .decode(text.trim())
            .map_err(|e| FormuliteError::KeyStore(format!("Key file is not valid base64: {e}")))?;

        if raw.len() != KEY_LEN {
            let len = raw.len();
            raw.zeroize();
            return Err(FormuliteError::KeyStore(format!(
                "Key file holds {len} bytes, expected {KEY_LEN}"
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&raw);
        raw.zeroize();
        Ok(Self(bytes))
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

/// Owns the location of the key file.
///
/// The key is created on first need and never rotated. Nothing is cached:
/// every call reads the file, so deleting it invalidates all ciphertext
/// produced under the old key.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the key if the key file exists.
    pub fn load(&self) -> Result<Option<KeyMaterial>> {
        match fs::read_to_string(&self.path) {
            Ok(mut text) => {
                let key = KeyMaterial::decode(&text);
                text.zeroize();
                key.map(Some)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the key, generating and persisting a fresh one if none exists.
    pub fn load_or_create(&self) -> Result<KeyMaterial> {
        if let Some(key) = self.load()? {
            return Ok(key);
        }
        self.create()
    }

    fn create(&self) -> Result<KeyMaterial> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let key = KeyMaterial::generate();
        let temp_path = self.temp_path();

        let mut encoded = key.encode();
        let written = write_private(&temp_path, encoded.as_bytes());
        encoded.zeroize();
        written?;

        // hard_link refuses to replace an existing file, so the first
        // process to publish its key wins and everyone else adopts it.
        let linked = fs::hard_link(&temp_path, &self.path);
        let _ = fs::remove_file(&temp_path);

        match linked {
            Ok(()) => {
                info!(path = %self.path.display(), "Created credential key file");
                Ok(key)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %self.path.display(), "Key file created concurrently, adopting it");
                self.load()?.ok_or_else(|| {
                    FormuliteError::KeyStore(format!(
                        "Key file {} disappeared during creation",
                        self.path.display()
                    ))
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "secret.key".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()))
    }
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_key_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path().join("secret.key"));

        assert!(!store.exists());
        assert!(store.load().unwrap().is_none());
        assert!(!store.exists(), "load must not create the key file");
    }

    #[test]
    fn test_load_or_create_persists_key() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path().join("resource").join("secret.key"));

        let created = store.load_or_create().unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(created.as_bytes(), loaded.as_bytes());

        let again = store.load_or_create().unwrap();
        assert_eq!(created.as_bytes(), again.as_bytes());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path().join("secret.key"));
        store.load_or_create().unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "secret.key");
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path().join("secret.key"));
        store.load_or_create().unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_existing_key_is_adopted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.key");
        let first = KeyStore::new(&path).load_or_create().unwrap();

        // A second store pointing at the same file behaves like another
        // process starting later.
        let second = KeyStore::new(&path).load_or_create().unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_corrupt_key_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.key");
        fs::write(&path, "not a key").unwrap();

        let result = KeyStore::new(&path).load();
        assert!(matches!(result, Err(FormuliteError::KeyStore(_))));
    }

    #[test]
    fn test_short_key_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.key");
        fs::write(&path, URL_SAFE.encode([7u8; 16])).unwrap();

        let err = KeyStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("expected 32"));
    }

    #[test]
    fn test_key_material_debug_is_redacted() {
        let key = KeyMaterial::generate();
        assert_eq!(format!("{key:?}"), "KeyMaterial(..)");
    }
}
