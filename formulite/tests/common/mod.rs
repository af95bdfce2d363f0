#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use wiremock::MockServer;

use formulite::config::RecognitionConfig;

/// Smallest valid PNG: a single transparent pixel.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Point every vendor endpoint at the mock server.
pub fn recognition_config(server: &MockServer) -> RecognitionConfig {
    RecognitionConfig {
        timeout_secs: Some(5),
        simpletex_url: Some(server.uri()),
        tencent_endpoint: Some(server.uri()),
        aliyun_endpoint: Some(server.uri()),
    }
}

/// Write the test PNG to disk and return its path.
pub fn write_png(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("formula.png");
    std::fs::write(&path, TINY_PNG).unwrap_or_else(|e| panic!("Failed to write fixture: {e}"));
    path
}
