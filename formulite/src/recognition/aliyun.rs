use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::provider::{build_http_client, read_image};
use super::signing::{hmac_sha256_hex, host_header, sha256_hex};
use super::types::{Credentials, FormulaLine, ImageSource, RecognitionOutcome};
use crate::config::RecognitionConfig;
use crate::error::{FormuliteError, Result};

const ALIYUN_ENDPOINT: &str = "https://ocr-api.cn-hangzhou.aliyuncs.com";
const ACTION: &str = "RecognizeEduFormula";
const API_VERSION: &str = "2021-07-07";
const ALGORITHM: &str = "ACS3-HMAC-SHA256";
const NO_CONTENT: &str = "No content found";

#[derive(Debug, Deserialize)]
struct AliyunResponse {
    #[serde(rename = "Data")]
    data: Option<String>,
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

impl AliyunResponse {
    /// `code:<Code> message:<Message>` when the vendor flagged an error.
    fn vendor_error(&self) -> Option<String> {
        if self.code.is_none() && self.message.is_none() {
            return None;
        }
        Some(format!(
            "code:{} message:{}",
            self.code.as_deref().unwrap_or_default(),
            self.message.as_deref().unwrap_or_default()
        ))
    }
}

#[derive(Debug, Deserialize)]
struct EduFormulaData {
    content: Option<String>,
}

/// Aliyun `RecognizeEduFormula` client (cn-hangzhou, API version
/// 2021-07-07). The raw image bytes are the request body; the request is
/// signed with ACS3-HMAC-SHA256.
#[derive(Clone, Debug)]
pub struct AliyunClient {
    client: Client,
    access_key_id: String,
    access_key_secret: String,
    endpoint: Url,
    host: String,
}

impl AliyunClient {
    pub fn new(credentials: &Credentials, config: &RecognitionConfig) -> Result<Self> {
        let raw = config.aliyun_endpoint.as_deref().unwrap_or(ALIYUN_ENDPOINT);
        let endpoint = Url::parse(raw).map_err(|e| {
            FormuliteError::Validation(format!("Invalid Aliyun endpoint '{raw}': {e}"))
        })?;
        let host = host_header(&endpoint).ok_or_else(|| {
            FormuliteError::Validation(format!("Aliyun endpoint '{raw}' has no host"))
        })?;

        Ok(Self {
            client: build_http_client(config)?,
            access_key_id: credentials.id.clone(),
            access_key_secret: credentials.secret.clone(),
            endpoint,
            host,
        })
    }

    pub async fn recognize_formula(&self, image: &ImageSource) -> RecognitionOutcome {
        let bytes = match read_image(image).await {
            Ok(bytes) => bytes,
            Err(outcome) => return outcome,
        };

        let headers = signed_headers(
            &self.access_key_id,
            &self.access_key_secret,
            &self.host,
            Utc::now(),
            &Uuid::new_v4().to_string(),
            &bytes,
        );

        debug!("Sending Aliyun {} request to {}", ACTION, self.endpoint);

        // reqwest derives Host from the URL.
        let mut request = self.client.post(self.endpoint.clone());
        for (name, value) in headers.iter().filter(|(name, _)| **name != "host") {
            request = request.header(*name, value);
        }

        let response = match request.body(bytes.into_owned()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Aliyun request failed: {}", e);
                return RecognitionOutcome::failure(format!("Request failed: {e}"));
            }
        };

        let status = response.status();
        debug!("Aliyun response status: {}", status);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return RecognitionOutcome::failure(format!("Failed to read Aliyun response: {e}"))
            }
        };

        if !status.is_success() {
            let mut message = format!("HTTP response code: {}", status.as_u16());
            if let Some(detail) = serde_json::from_str::<AliyunResponse>(&body)
                .ok()
                .and_then(|err| err.vendor_error())
            {
                message.push(' ');
                message.push_str(&detail);
            }
            warn!("Aliyun reported failure: {}", message);
            return RecognitionOutcome::failure(message);
        }

        interpret(&body)
    }
}

/// `Data` is itself a JSON document encoded as a string.
fn interpret(body: &str) -> RecognitionOutcome {
    let response: AliyunResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => return RecognitionOutcome::failure(format!("Failed to parse Aliyun response: {e}")),
    };

    let Some(data) = response.data.as_deref() else {
        return match response.vendor_error() {
            Some(message) => {
                warn!("Aliyun reported failure: {}", message);
                RecognitionOutcome::failure(message)
            }
            None => RecognitionOutcome::failure("Aliyun response is missing the 'Data' field"),
        };
    };

    match serde_json::from_str::<EduFormulaData>(data) {
        Ok(data) => RecognitionOutcome::success(vec![FormulaLine::text(
            data.content.unwrap_or_else(|| NO_CONTENT.to_string()),
        )]),
        Err(e) => RecognitionOutcome::failure(format!("Failed to parse Aliyun 'Data' field: {e}")),
    }
}

/// Every header that goes into the signature, plus `Authorization`.
fn signed_headers(
    access_key_id: &str,
    access_key_secret: &str,
    host: &str,
    now: DateTime<Utc>,
    nonce: &str,
    body: &[u8],
) -> BTreeMap<&'static str, String> {
    let mut headers = BTreeMap::new();
    headers.insert("content-type", "application/octet-stream".to_string());
    headers.insert("host", host.to_string());
    headers.insert("x-acs-action", ACTION.to_string());
    headers.insert("x-acs-content-sha256", sha256_hex(body));
    headers.insert("x-acs-date", now.format("%Y-%m-%dT%H:%M:%SZ").to_string());
    headers.insert("x-acs-signature-nonce", nonce.to_string());
    headers.insert("x-acs-version", API_VERSION.to_string());

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_header_names = headers.keys().copied().collect::<Vec<_>>().join(";");

    let canonical_request = format!(
        "POST\n/\n\n{canonical_headers}\n{signed_header_names}\n{}",
        sha256_hex(body)
    );
    let string_to_sign = format!("{ALGORITHM}\n{}", sha256_hex(canonical_request.as_bytes()));
    let signature = hmac_sha256_hex(access_key_secret.as_bytes(), string_to_sign.as_bytes());

    headers.insert(
        "authorization",
        format!(
            "{ALGORITHM} Credential={access_key_id},SignedHeaders={signed_header_names},Signature={signature}"
        ),
    );
    headers
}
