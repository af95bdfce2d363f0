use chrono::Utc;
use md5::{Digest, Md5};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{build_http_client, read_image};
use super::types::{Credentials, FormulaLine, ImageSource, RecognitionOutcome};
use crate::config::RecognitionConfig;
use crate::error::Result;

const SIMPLETEX_BASE_URL: &str = "https://server.simpletex.cn";
const LATEX_OCR_PATH: &str = "/api/latex_ocr";
const RANDOM_STR_LEN: usize = 16;

#[derive(Debug, Deserialize)]
struct SimpleTexResponse {
    #[serde(default)]
    status: bool,
    res: Option<SimpleTexResult>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimpleTexResult {
    #[serde(default)]
    latex: Option<String>,
}

/// SimpleTex LaTeX OCR client.
///
/// Requests are authenticated with an MD5 signature over the app id, a
/// random string, a timestamp and the app secret. The scheme is dictated by
/// the vendor and must match it byte for byte; it is not a security
/// boundary.
#[derive(Clone, Debug)]
pub struct SimpleTexClient {
    client: Client,
    app_id: String,
    app_secret: String,
    api_url: String,
}

impl SimpleTexClient {
    pub fn new(credentials: &Credentials, config: &RecognitionConfig) -> Result<Self> {
        let base_url = config
            .simpletex_url
            .as_deref()
            .unwrap_or(SIMPLETEX_BASE_URL)
            .trim_end_matches('/');
        let api_url = format!("{base_url}{LATEX_OCR_PATH}");

        Ok(Self {
            client: build_http_client(config)?,
            app_id: credentials.id.clone(),
            app_secret: credentials.secret.clone(),
            api_url,
        })
    }

    pub async fn recognize_formula(&self, image: &ImageSource) -> RecognitionOutcome {
        let bytes = match read_image(image).await {
            Ok(bytes) => bytes,
            Err(outcome) => return outcome,
        };

        let random_str = random_str(RANDOM_STR_LEN);
        let timestamp = Utc::now().timestamp().to_string();
        let sign = sign(&self.app_id, &random_str, &timestamp, &self.app_secret);

        let file_part = match multipart::Part::bytes(bytes.into_owned())
            .file_name(image.file_name())
            .mime_str("image/png")
        {
            Ok(part) => part,
            Err(e) => return RecognitionOutcome::failure(format!("Invalid MIME type: {e}")),
        };
        let form = multipart::Form::new().part("file", file_part);

        debug!("Sending SimpleTex request to {}", self.api_url);

        let response = match self
            .client
            .post(&self.api_url)
            .header("app-id", &self.app_id)
            .header("random-str", random_str)
            .header("timestamp", timestamp)
            .header("sign", sign)
            .multipart(form)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("SimpleTex request failed: {}", e);
                return RecognitionOutcome::failure(format!("Request failed: {e}"));
            }
        };

        let status = response.status();
        debug!("SimpleTex response status: {}", status);

        if status != StatusCode::OK {
            return RecognitionOutcome::failure(format!(
                "HTTP Request Failed with status code {}",
                status.as_u16()
            ));
        }

        match response.json::<SimpleTexResponse>().await {
            Ok(body) => interpret(body),
            Err(e) => RecognitionOutcome::failure(format!("Failed to parse SimpleTex response: {e}")),
        }
    }
}

fn interpret(body: SimpleTexResponse) -> RecognitionOutcome {
    if !body.status {
        let message = body.message.unwrap_or_else(|| "Unknown error".to_string());
        warn!("SimpleTex reported failure: {}", message);
        return RecognitionOutcome::failure(message);
    }

    match body.res {
        Some(res) => RecognitionOutcome::success(vec![FormulaLine::text(
            res.latex.unwrap_or_default(),
        )]),
        None => RecognitionOutcome::failure("SimpleTex response is missing the 'res' field"),
    }
}

fn random_str(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn sign(app_id: &str, random_str: &str, timestamp: &str, secret: &str) -> String {
    let sign_str =
        format!("app-id={app_id}&random-str={random_str}&timestamp={timestamp}&secret={secret}");
    let digest = Md5::digest(sign_str.as_bytes());
    format!("{digest:x}")
}
