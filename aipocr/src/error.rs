use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Unknown service type: {0}")]
    UnknownServiceType(String),

    #[error("Malformed region: {0}")]
    MalformedRegion(String),

    #[error("Empty region specification")]
    EmptyRegion,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Remote https image links are not supported: {0}")]
    UnsupportedRemoteScheme(String),

    #[error("Unsupported image format: {0}, must be jpg, jpeg, png or bmp")]
    UnsupportedImageFormat(String),

    #[error("Image too large: {width}x{height}, longest edge can not exceed {max} px")]
    ImageTooLarge { width: u32, height: u32, max: u32 },

    #[error("Image too small: {width}x{height}, shortest edge can not be less than {min} px")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response rejected by validator (status {status})")]
    ValidationRejected { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("{source_id}: request failed after {attempts} attempts, last error: {last_error}")]
    RetriesExhausted {
        source_id: String,
        attempts: u32,
        last_error: String,
    },

    #[error("{source_id}: {cause}")]
    SourceUnreadable {
        source_id: String,
        #[source]
        cause: Box<OcrError>,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl OcrError {
    /// Transient failures that the executor feeds back into its retry loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OcrError::Timeout(_)
                | OcrError::Status { .. }
                | OcrError::ValidationRejected { .. }
                | OcrError::Transport(_)
                | OcrError::Http(_)
        )
    }

    /// Attach `source_id` to errors raised while reading or decoding an
    /// image, which otherwise do not say which source they came from.
    pub fn for_source(self, source_id: impl Into<String>) -> Self {
        match self {
            OcrError::Io(_) | OcrError::Image(_) | OcrError::Json(_) | OcrError::UrlParse(_) => {
                OcrError::SourceUnreadable {
                    source_id: source_id.into(),
                    cause: Box::new(self),
                }
            }
            other => other,
        }
    }

    /// Errors about the image itself. Retrying can never change the outcome.
    pub fn is_terminal_input(&self) -> bool {
        matches!(
            self,
            OcrError::UnsupportedRemoteScheme(_)
                | OcrError::UnsupportedImageFormat(_)
                | OcrError::ImageTooLarge { .. }
                | OcrError::ImageTooSmall { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(OcrError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(OcrError::Status {
            status: 500,
            body: String::new()
        }
        .is_retryable());
        assert!(OcrError::ValidationRejected { status: 200 }.is_retryable());
        assert!(OcrError::Transport("connection reset".to_string()).is_retryable());
    }

    #[test]
    fn test_input_errors_are_not_retryable() {
        let errors = [
            OcrError::UnknownServiceType("NOPE".to_string()),
            OcrError::MalformedRegion("1,2,3".to_string()),
            OcrError::EmptyRegion,
            OcrError::InvalidPayload("nested".to_string()),
            OcrError::UnsupportedImageFormat("a.gif".to_string()),
            OcrError::ImageTooLarge {
                width: 4097,
                height: 20,
                max: 4096,
            },
        ];
        for err in errors {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn test_image_errors_are_terminal_input() {
        assert!(OcrError::ImageTooSmall {
            width: 10,
            height: 100,
            min: 15
        }
        .is_terminal_input());
        assert!(OcrError::UnsupportedRemoteScheme("https://a/b.png".to_string()).is_terminal_input());
        assert!(!OcrError::EmptyRegion.is_terminal_input());
    }

    #[test]
    fn test_read_errors_carry_source_id() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory");
        let err = OcrError::from(io).for_source("scans/gone.png");
        assert!(matches!(
            err,
            OcrError::SourceUnreadable { ref source_id, ref cause }
                if source_id == "scans/gone.png" && matches!(**cause, OcrError::Io(_))
        ));
        let msg = err.to_string();
        assert!(msg.starts_with("scans/gone.png: IO error"), "{msg}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_domain_errors_pass_through_for_source() {
        let err = OcrError::EmptyRegion.for_source("a.png");
        assert!(matches!(err, OcrError::EmptyRegion));
        let err = OcrError::UnsupportedImageFormat("a.gif".to_string()).for_source("a.gif");
        assert!(matches!(err, OcrError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn test_exhausted_message_names_source() {
        let err = OcrError::RetriesExhausted {
            source_id: "scan.png".to_string(),
            attempts: 4,
            last_error: "Request failed with status 503: busy".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("scan.png"));
        assert!(msg.contains("503"));
    }
}
