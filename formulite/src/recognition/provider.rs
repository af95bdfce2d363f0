use std::borrow::Cow;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::aliyun::AliyunClient;
use super::simpletex::SimpleTexClient;
use super::tencent::TencentCloudClient;
use super::types::{Credentials, FormulaLine, ImageSource, ProviderKind, RecognitionOutcome};
use crate::config::RecognitionConfig;
use crate::error::Result;

/// Shared HTTP client setup. Without a configured timeout the transport
/// default applies.
pub(super) fn build_http_client(config: &RecognitionConfig) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

pub(super) async fn read_image(
    image: &ImageSource,
) -> std::result::Result<Cow<'_, [u8]>, RecognitionOutcome> {
    image.load().await.map_err(|e| {
        RecognitionOutcome::failure(format!("Failed to read image {}: {e}", image.describe()))
    })
}

/// One of the three vendor backends, fixed at construction.
#[derive(Clone, Debug)]
pub enum RecognitionProvider {
    SimpleTex(SimpleTexClient),
    TencentCloud(TencentCloudClient),
    Aliyun(AliyunClient),
}

impl RecognitionProvider {
    pub fn new(
        kind: ProviderKind,
        credentials: &Credentials,
        config: &RecognitionConfig,
    ) -> Result<Self> {
        Ok(match kind {
            ProviderKind::SimpleTex => {
                RecognitionProvider::SimpleTex(SimpleTexClient::new(credentials, config)?)
            }
            ProviderKind::TencentCloud => {
                RecognitionProvider::TencentCloud(TencentCloudClient::new(credentials, config)?)
            }
            ProviderKind::Aliyun => {
                RecognitionProvider::Aliyun(AliyunClient::new(credentials, config)?)
            }
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            RecognitionProvider::SimpleTex(_) => ProviderKind::SimpleTex,
            RecognitionProvider::TencentCloud(_) => ProviderKind::TencentCloud,
            RecognitionProvider::Aliyun(_) => ProviderKind::Aliyun,
        }
    }

    pub async fn recognize_formula(&self, image: &ImageSource) -> RecognitionOutcome {
        match self {
            RecognitionProvider::SimpleTex(c) => c.recognize_formula(image).await,
            RecognitionProvider::TencentCloud(c) => c.recognize_formula(image).await,
            RecognitionProvider::Aliyun(c) => c.recognize_formula(image).await,
        }
    }
}

/// What a caller renders: the recognized lines or an error message.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionReport {
    Recognized { lines: Vec<FormulaLine> },
    Failed { message: String },
}

impl RecognitionReport {
    pub fn is_ok(&self) -> bool {
        matches!(self, RecognitionReport::Recognized { .. })
    }

    pub fn into_result(self) -> std::result::Result<Vec<FormulaLine>, String> {
        match self {
            RecognitionReport::Recognized { lines } => Ok(lines),
            RecognitionReport::Failed { message } => Err(message),
        }
    }
}

impl From<RecognitionOutcome> for RecognitionReport {
    fn from(outcome: RecognitionOutcome) -> Self {
        match outcome {
            RecognitionOutcome::Success { lines } => RecognitionReport::Recognized { lines },
            RecognitionOutcome::Failure { message } => RecognitionReport::Failed { message },
        }
    }
}

/// Facade over a single provider chosen from a service token and a
/// credential pair.
#[derive(Clone, Debug)]
pub struct RecognitionClient {
    provider: RecognitionProvider,
}

impl RecognitionClient {
    pub fn new(
        kind: ProviderKind,
        credentials: &Credentials,
        config: &RecognitionConfig,
    ) -> Result<Self> {
        let provider = RecognitionProvider::new(kind, credentials, config)?;
        info!(service = %kind, "Recognition provider initialized");
        Ok(Self { provider })
    }

    /// Fails with `UnsupportedService` for a token outside the known set.
    pub fn from_service(
        service: &str,
        id: &str,
        secret: &str,
        config: &RecognitionConfig,
    ) -> Result<Self> {
        let kind: ProviderKind = service.parse()?;
        Self::new(kind, &Credentials::new(id, secret), config)
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    pub async fn recognize_text(&self, image: &ImageSource) -> RecognitionReport {
        debug!(service = %self.kind(), image = %image.describe(), "Recognizing formula");
        self.provider.recognize_formula(image).await.into()
    }

    /// Runs one recognition on its own tokio task.
    pub fn spawn_recognize(&self, image: ImageSource) -> JoinHandle<RecognitionReport> {
        let client = self.clone();
        tokio::spawn(async move { client.recognize_text(&image).await })
    }
}
