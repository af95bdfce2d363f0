use std::env;
use std::path::PathBuf;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub recognition: RecognitionConfig,
    pub logging: LoggingConfig,
}

/// Locations of the persisted settings file and the credential key file.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub settings_path: PathBuf,
    pub key_path: PathBuf,
}

/// Transport knobs shared by every recognition provider.
///
/// The endpoint overrides replace the vendor base URL (scheme + host) and
/// exist for proxies and mock servers. `None` means the vendor default.
/// SimpleTex requests go to `<simpletex_url>/api/latex_ocr`.
#[derive(Debug, Clone, Default)]
pub struct RecognitionConfig {
    pub timeout_secs: Option<u64>,
    pub simpletex_url: Option<String>,
    pub tencent_endpoint: Option<String>,
    pub aliyun_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("resource/config.json"),
            key_path: PathBuf::from("resource/secret.key"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let storage_defaults = StorageConfig::default();

        Self {
            storage: StorageConfig {
                settings_path: env::var("FORMULITE_SETTINGS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(storage_defaults.settings_path),
                key_path: env::var("FORMULITE_KEY_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(storage_defaults.key_path),
            },
            recognition: RecognitionConfig {
                timeout_secs: parse_env_opt("FORMULITE_OCR_TIMEOUT"),
                simpletex_url: env::var("FORMULITE_SIMPLETEX_URL").ok(),
                tencent_endpoint: env::var("FORMULITE_TENCENT_ENDPOINT").ok(),
                aliyun_endpoint: env::var("FORMULITE_ALIYUN_ENDPOINT").ok(),
            },
            logging: LoggingConfig {
                format: parse_env_or("FORMULITE_LOG_FORMAT", LogFormat::Text),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
