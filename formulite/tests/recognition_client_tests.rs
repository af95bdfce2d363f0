mod common;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_bytes, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{recognition_config, write_png, TINY_PNG};
use formulite::error::FormuliteError;
use formulite::recognition::{
    FormulaLine, ImageSource, ProviderKind, RecognitionClient, RecognitionReport,
};

fn client(service: &str, server: &MockServer) -> RecognitionClient {
    RecognitionClient::from_service(service, "test-id", "test-secret", &recognition_config(server))
        .unwrap()
}

fn failure_message(report: RecognitionReport) -> String {
    match report {
        RecognitionReport::Failed { message } => message,
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_simpletex_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/latex_ocr"))
        .and(header("app-id", "test-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "res": {"latex": "x^2+y^2=z^2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client("API.SIMPLETEX", &server)
        .recognize_text(&ImageSource::from(TINY_PNG))
        .await;

    assert_eq!(
        report,
        RecognitionReport::Recognized {
            lines: vec![FormulaLine::text("x^2+y^2=z^2")]
        }
    );
}

#[tokio::test]
async fn test_simpletex_http_500() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/latex_ocr"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let report = client("SimpleTex", &server)
        .recognize_text(&ImageSource::from(TINY_PNG))
        .await;

    assert!(failure_message(report).contains("500"));
}

#[tokio::test]
async fn test_tencent_success_keeps_structured_sequence() {
    let server = MockServer::start().await;
    let infos = json!([
        {
            "DetectedText": "\\sqrt{a^2+b^2}",
            "Polygon": {
                "LeftTop": {"X": 0, "Y": 0},
                "RightTop": {"X": 120, "Y": 0},
                "RightBottom": {"X": 120, "Y": 40},
                "LeftBottom": {"X": 0, "Y": 40}
            }
        }
    ]);

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-TC-Action", "FormulaOCR"))
        .and(body_json(json!({"ImageBase64": STANDARD.encode(TINY_PNG)})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {"FormulaInfos": infos.clone(), "RequestId": "req-1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client("API.TENCENTCLOUD", &server)
        .recognize_text(&ImageSource::from(TINY_PNG))
        .await;

    assert_eq!(
        report,
        RecognitionReport::Recognized {
            lines: vec![FormulaLine::with_detail("\\sqrt{a^2+b^2}", infos[0].clone())]
        }
    );
}

#[tokio::test]
async fn test_tencent_vendor_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "Error": {"Code": "FailedOperation.ImageDecodeFailed", "Message": "bad image"},
                "RequestId": "req-2"
            }
        })))
        .mount(&server)
        .await;

    let report = client("TencentCloud", &server)
        .recognize_text(&ImageSource::from(TINY_PNG))
        .await;

    let message = failure_message(report);
    assert!(message.contains("FailedOperation.ImageDecodeFailed"));
    assert!(message.contains("bad image"));
}

#[tokio::test]
async fn test_aliyun_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-acs-action", "RecognizeEduFormula"))
        .and(body_bytes(TINY_PNG.to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RequestId": "req-1",
            "Data": "{\"content\":\"\\\\frac{1}{2}\"}"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client("API.ALIYUN", &server)
        .recognize_text(&ImageSource::from(TINY_PNG))
        .await;

    assert_eq!(
        report,
        RecognitionReport::Recognized {
            lines: vec![FormulaLine::text("\\frac{1}{2}")]
        }
    );
}

#[tokio::test]
async fn test_aliyun_missing_content_placeholder() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RequestId": "req-1",
            "Data": "{\"width\":300}"
        })))
        .mount(&server)
        .await;

    let report = client("Aliyun", &server)
        .recognize_text(&ImageSource::from(TINY_PNG))
        .await;

    assert_eq!(
        report,
        RecognitionReport::Recognized {
            lines: vec![FormulaLine::text("No content found")]
        }
    );
}

#[tokio::test]
async fn test_aliyun_vendor_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RequestId": "req-5",
            "Code": "illegalImageSize",
            "Message": "image too large"
        })))
        .mount(&server)
        .await;

    let report = client("Aliyun", &server)
        .recognize_text(&ImageSource::from(TINY_PNG))
        .await;

    let message = failure_message(report);
    assert!(message.contains("illegalImageSize"));
    assert!(message.contains("image too large"));
}

#[tokio::test]
async fn test_http_errors_never_escape_as_faults() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    for kind in ProviderKind::ALL {
        let report = client(kind.as_str(), &server)
            .recognize_text(&ImageSource::from(TINY_PNG))
            .await;
        assert!(failure_message(report).contains("503"), "{kind} did not report 503");
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_failure() {
    let server = MockServer::start().await;
    let config = recognition_config(&server);
    drop(server);

    let client =
        RecognitionClient::from_service("Aliyun", "test-id", "test-secret", &config).unwrap();
    let report = client.recognize_text(&ImageSource::from(TINY_PNG)).await;

    assert!(!report.is_ok());
}

#[tokio::test]
async fn test_path_and_bytes_are_sent_identically() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let png_path = write_png(&dir);

    Mock::given(method("POST"))
        .and(body_bytes(TINY_PNG.to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Data": "{\"content\":\"a\"}"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client("Aliyun", &server);
    let from_path = client.recognize_text(&ImageSource::Path(png_path)).await;
    let from_bytes = client.recognize_text(&ImageSource::from(TINY_PNG)).await;

    assert_eq!(from_path, from_bytes);
    assert!(from_path.is_ok());
}

#[tokio::test]
async fn test_spawned_recognition() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "res": {"latex": "\\alpha"}
        })))
        .mount(&server)
        .await;

    let client = client("SimpleTex", &server);
    let handles: Vec<_> = (0..3)
        .map(|_| client.spawn_recognize(ImageSource::from(TINY_PNG)))
        .collect();

    for handle in handles {
        let lines = handle.await.unwrap().into_result().unwrap();
        assert_eq!(lines, vec![FormulaLine::text("\\alpha")]);
    }
}

#[test]
fn test_unknown_service_fails_fast() {
    let result = RecognitionClient::from_service(
        "API.MATHPIX",
        "id",
        "secret",
        &Default::default(),
    );

    match result {
        Err(FormuliteError::UnsupportedService(token)) => assert_eq!(token, "API.MATHPIX"),
        other => panic!("expected UnsupportedService, got {other:?}"),
    }
}
