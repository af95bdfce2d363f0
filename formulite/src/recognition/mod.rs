//! Formula Recognition Module
//!
//! Turns an image of a formula into LaTeX through one of three cloud OCR
//! vendors.
//!
//! # Architecture
//!
//! - `RecognitionProvider` is a closed enum over the vendor clients
//! - `SimpleTexClient` uploads a multipart image with an MD5 request signature
//! - `TencentCloudClient` posts base64 JSON signed with TC3-HMAC-SHA256
//! - `AliyunClient` posts the raw image signed with ACS3-HMAC-SHA256
//! - `RecognitionClient` picks the provider from a service token and
//!   flattens outcomes into a `RecognitionReport`
//!
//! Expected failures (transport, HTTP status, vendor errors, malformed
//! payloads) never surface as `Err`. They come back as
//! `RecognitionOutcome::Failure`. Only an unknown service token or a bad
//! endpoint override fails construction.
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = RecognitionClient::from_service("Aliyun", &id, &secret, &config.recognition)?;
//! let report = client.recognize_text(&ImageSource::from(path)).await;
//! ```

mod aliyun;
mod provider;
mod signing;
mod simpletex;
mod tencent;
mod types;

pub use aliyun::AliyunClient;
pub use provider::{RecognitionClient, RecognitionProvider, RecognitionReport};
pub use simpletex::SimpleTexClient;
pub use tencent::TencentCloudClient;
pub use types::{Credentials, FormulaLine, ImageSource, ProviderKind, RecognitionOutcome};
