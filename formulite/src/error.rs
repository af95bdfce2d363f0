use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormuliteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    /// Raised for a provider token outside the known set. This is a bug in
    /// the integrating code, never a runtime recognition failure.
    #[error("Unsupported service: {0}")]
    UnsupportedService(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, FormuliteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_service_message() {
        let err = FormuliteError::UnsupportedService("API.MATHPIX".to_string());
        assert_eq!(err.to_string(), "Unsupported service: API.MATHPIX");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FormuliteError = io.into();
        assert!(matches!(err, FormuliteError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }
}
