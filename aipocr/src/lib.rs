pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod ocr;
pub mod registry;
pub mod transport;

pub use client::OcrClient;
pub use config::Config;
pub use error::{OcrError, Result};
pub use executor::{AsyncValidator, RequestExecutor, ResponseValidator, SyncValidator};
pub use ocr::{BaiduOcrService, ImageSource, OcrService, ResultSeparator, SigningMode};
pub use registry::{ServiceRegistry, ServiceType};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
