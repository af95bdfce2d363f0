use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::FormuliteError;

/// Image payload of one recognition call: a file on disk or bytes already
/// in memory. Providers borrow it for the duration of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Both arms yield the same raw bytes, so providers encode them
    /// identically regardless of where they came from.
    pub async fn load(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match self {
            ImageSource::Path(path) => tokio::fs::read(path).await.map(Cow::Owned),
            ImageSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes.as_slice())),
        }
    }

    /// Drain a reader (stdin, a pipe) into an in-memory image. Empty input
    /// is rejected.
    pub async fn from_reader<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        if bytes.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no image data to read",
            ));
        }
        Ok(ImageSource::Bytes(bytes))
    }

    /// File name sent with multipart uploads.
    pub fn file_name(&self) -> String {
        match self {
            ImageSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image.png".to_string()),
            ImageSource::Bytes(_) => "image.png".to_string(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(bytes: &[u8]) -> Self {
        ImageSource::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

/// One recognized formula.
///
/// `detail` carries the vendor's structured record when the vendor returns
/// more than plain LaTeX (detection polygons and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaLine {
    pub latex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl FormulaLine {
    pub fn text(latex: impl Into<String>) -> Self {
        Self {
            latex: latex.into(),
            detail: None,
        }
    }

    pub fn with_detail(latex: impl Into<String>, detail: serde_json::Value) -> Self {
        Self {
            latex: latex.into(),
            detail: Some(detail),
        }
    }
}

/// Result of one provider call. Expected failure modes (transport, HTTP
/// status, vendor-reported errors, malformed payloads) all land in
/// `Failure`; nothing here is an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecognitionOutcome {
    Success { lines: Vec<FormulaLine> },
    Failure { message: String },
}

impl RecognitionOutcome {
    pub fn success(lines: Vec<FormulaLine>) -> Self {
        RecognitionOutcome::Success { lines }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        RecognitionOutcome::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecognitionOutcome::Success { .. })
    }
}

/// The three supported vendors. Serialized with the tokens used in the
/// settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    SimpleTex,
    TencentCloud,
    #[default]
    Aliyun,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::SimpleTex,
        ProviderKind::TencentCloud,
        ProviderKind::Aliyun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::SimpleTex => "SimpleTex",
            ProviderKind::TencentCloud => "TencentCloud",
            ProviderKind::Aliyun => "Aliyun",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = FormuliteError;

    /// Accepts settings tokens (`SimpleTex`) and legacy enum tokens
    /// (`API.SIMPLETEX`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        let token = token.strip_prefix("api.").unwrap_or(&token);

        match token {
            "simpletex" => Ok(ProviderKind::SimpleTex),
            "tencentcloud" | "tencent" => Ok(ProviderKind::TencentCloud),
            "aliyun" => Ok(ProviderKind::Aliyun),
            _ => Err(FormuliteError::UnsupportedService(s.to_string())),
        }
    }
}

/// An id/secret pair. Meaning depends on the vendor: app id + app secret
/// (SimpleTex), secret id + secret key (TencentCloud), access key id +
/// access key secret (Aliyun).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
