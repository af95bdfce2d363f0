use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::crypto::CredentialCipher;
use crate::error::Result;
use crate::recognition::{Credentials, ProviderKind};

/// The `API` section of the settings file. `key` is always stored as
/// ciphertext produced by [`CredentialCipher`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(rename = "Service", default, deserialize_with = "lenient_service")]
    pub service: ProviderKind,
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Key", default)]
    pub key: String,
}

/// Contents of the settings file. Sections other than `API` belong to
/// the UI and are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "API", default)]
    pub api: ApiSettings,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl Settings {
    /// Store a credential pair, encrypting the secret first.
    pub fn set_credentials(
        &mut self,
        cipher: &CredentialCipher,
        service: ProviderKind,
        id: &str,
        secret: &str,
    ) -> Result<()> {
        let key = cipher.encrypt(secret)?;
        self.api = ApiSettings {
            service,
            id: id.to_string(),
            key,
        };
        Ok(())
    }

    /// `None` means nothing usable is configured: an empty ID, an empty
    /// key, or a key that no longer decrypts.
    pub fn credentials(&self, cipher: &CredentialCipher) -> Option<Credentials> {
        if self.api.id.is_empty() {
            return None;
        }
        let secret = cipher.decrypt(&self.api.key);
        if secret.is_empty() {
            return None;
        }
        Some(Credentials::new(self.api.id.clone(), secret))
    }
}

/// Unknown service tokens fall back to the default service.
fn lenient_service<'de, D>(deserializer: D) -> std::result::Result<ProviderKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse().unwrap_or_else(|e| {
        warn!("Invalid API service in settings: {}. Using default.", e);
        ProviderKind::default()
    }))
}

/// Loads and saves [`Settings`] as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// A missing file yields the defaults.
    pub fn load(&self) -> Result<Settings> {
        if !self.exists() {
            debug!(path = %self.path.display(), "Settings file not found, using defaults");
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}
