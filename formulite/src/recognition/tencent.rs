use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{build_http_client, read_image};
use super::signing::{hmac_sha256, hmac_sha256_hex, host_header, sha256_hex};
use super::types::{Credentials, FormulaLine, ImageSource, RecognitionOutcome};
use crate::config::RecognitionConfig;
use crate::error::{FormuliteError, Result};

const TENCENT_ENDPOINT: &str = "https://ocr.tencentcloudapi.com";
const SERVICE: &str = "ocr";
const ACTION: &str = "FormulaOCR";
const API_VERSION: &str = "2018-11-19";
const REGION: &str = "ap-beijing";
const ALGORITHM: &str = "TC3-HMAC-SHA256";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Serialize)]
struct FormulaOcrRequest {
    #[serde(rename = "ImageBase64")]
    image_base64: String,
}

#[derive(Debug, Deserialize)]
struct TencentEnvelope {
    #[serde(rename = "Response")]
    response: TencentResponse,
}

#[derive(Debug, Deserialize)]
struct TencentResponse {
    #[serde(rename = "FormulaInfos")]
    formula_infos: Option<Vec<serde_json::Value>>,
    #[serde(rename = "Error")]
    error: Option<TencentError>,
    #[serde(rename = "RequestId", default)]
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct TencentError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

/// Tencent Cloud `FormulaOCR` client (API version 2018-11-19, region
/// ap-beijing), signed with TC3-HMAC-SHA256.
#[derive(Clone, Debug)]
pub struct TencentCloudClient {
    client: Client,
    secret_id: String,
    secret_key: String,
    endpoint: Url,
    host: String,
}

impl TencentCloudClient {
    pub fn new(credentials: &Credentials, config: &RecognitionConfig) -> Result<Self> {
        let raw = config
            .tencent_endpoint
            .as_deref()
            .unwrap_or(TENCENT_ENDPOINT);
        let endpoint = Url::parse(raw).map_err(|e| {
            FormuliteError::Validation(format!("Invalid TencentCloud endpoint '{raw}': {e}"))
        })?;
        let host = host_header(&endpoint).ok_or_else(|| {
            FormuliteError::Validation(format!("TencentCloud endpoint '{raw}' has no host"))
        })?;

        Ok(Self {
            client: build_http_client(config)?,
            secret_id: credentials.id.clone(),
            secret_key: credentials.secret.clone(),
            endpoint,
            host,
        })
    }

    pub async fn recognize_formula(&self, image: &ImageSource) -> RecognitionOutcome {
        let bytes = match read_image(image).await {
            Ok(bytes) => bytes,
            Err(outcome) => return outcome,
        };

        let request = FormulaOcrRequest {
            image_base64: STANDARD.encode(&bytes),
        };
        let payload = match serde_json::to_string(&request) {
            Ok(payload) => payload,
            Err(e) => return RecognitionOutcome::failure(format!("Failed to encode request: {e}")),
        };

        let timestamp = Utc::now().timestamp();
        let authorization = authorization(
            &self.secret_id,
            &self.secret_key,
            &self.host,
            timestamp,
            &payload,
        );

        debug!("Sending TencentCloud {} request to {}", ACTION, self.endpoint);

        let response = match self
            .client
            .post(self.endpoint.clone())
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-TC-Action", ACTION)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Version", API_VERSION)
            .header("X-TC-Region", REGION)
            .body(payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("TencentCloud request failed: {}", e);
                return RecognitionOutcome::failure(format!("Request failed: {e}"));
            }
        };

        let status = response.status();
        debug!("TencentCloud response status: {}", status);

        if !status.is_success() {
            return RecognitionOutcome::failure(format!(
                "HTTP Request Failed with status code {}",
                status.as_u16()
            ));
        }

        match response.json::<TencentEnvelope>().await {
            Ok(envelope) => interpret(envelope.response),
            Err(e) => {
                RecognitionOutcome::failure(format!("Failed to parse TencentCloud response: {e}"))
            }
        }
    }
}

/// Every `FormulaInfos` record is kept whole as the line detail.
fn interpret(response: TencentResponse) -> RecognitionOutcome {
    if let Some(error) = response.error {
        warn!(
            code = %error.code,
            request_id = %response.request_id,
            "TencentCloud reported failure"
        );
        return RecognitionOutcome::failure(format!(
            "code:{} message:{} requestId:{}",
            error.code, error.message, response.request_id
        ));
    }

    match response.formula_infos {
        Some(infos) => {
            let lines = infos
                .into_iter()
                .map(|info| {
                    let latex = info
                        .get("DetectedText")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    FormulaLine::with_detail(latex, info)
                })
                .collect();
            RecognitionOutcome::success(lines)
        }
        None => RecognitionOutcome::failure("TencentCloud response is missing FormulaInfos"),
    }
}

fn authorization(
    secret_id: &str,
    secret_key: &str,
    host: &str,
    timestamp: i64,
    payload: &str,
) -> String {
    let date = DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string();

    let canonical_request = format!(
        "POST\n/\n\ncontent-type:{CONTENT_TYPE}\nhost:{host}\n\ncontent-type;host\n{}",
        sha256_hex(payload.as_bytes())
    );

    let credential_scope = format!("{date}/{SERVICE}/tc3_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{timestamp}\n{credential_scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let secret_date = hmac_sha256(format!("TC3{secret_key}").as_bytes(), date.as_bytes());
    let secret_service = hmac_sha256(&secret_date, SERVICE.as_bytes());
    let secret_signing = hmac_sha256(&secret_service, b"tc3_request");
    let signature = hmac_sha256_hex(&secret_signing, string_to_sign.as_bytes());

    format!(
        "{ALGORITHM} Credential={secret_id}/{credential_scope}, SignedHeaders=content-type;host, Signature={signature}"
    )
}
