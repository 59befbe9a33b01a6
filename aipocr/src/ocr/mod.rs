//! OCR request pipeline
//!
//! Turns an image source into a signed request for the Baidu AIP OCR API and
//! decodes the response into plain text.
//!
//! # Architecture
//!
//! - `OcrService` trait builds one request per attempt and decodes replies
//! - `BaiduOcrService` implements it for the AIP form API
//! - `region` crops and vertically stitches sub-rectangles of local images
//! - `preprocessing` loads, validates and base64-encodes local images
//! - `signer` computes `bce-auth-v1` `Authorization` headers
//! - `token` acquires an access token via the `client_credentials` grant
//!
//! Sending, timeouts and retries live in [`crate::executor`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = Arc::new(ServiceRegistry::from_config(&config.ocr));
//! let mut service = BaiduOcrService::from_config(&config, registry)?;
//! let request = service.build_request(&ImageSource::parse("scan.png")?)?;
//! ```

mod preprocessing;
mod region;
mod response;
mod service;
mod signer;
mod token;

pub use preprocessing::{
    check_extension, load_and_prepare, prepare_image, validate_dimensions, ImageLimits, ImageSource,
};
pub use region::{apply_region, parse_region, stitch, Rect};
pub use response::{decode_response, ResultSeparator};
pub use service::{BaiduOcrService, OcrService, PreparedRequest, FORM_CONTENT_TYPE, SDK_NAME, SDK_VERSION};
pub use signer::{BceSigner, Clock, FixedClock, SignedHeaders, SigningMode, SystemClock};
pub use token::{AccessToken, TokenClient};
