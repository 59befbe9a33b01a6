use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use tracing::{debug, error};

use crate::config::OcrConfig;
use crate::error::{OcrError, Result};

use super::region::apply_region;

const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Where an image to recognize comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Local file, decoded on every request.
    Path(PathBuf),
    /// Plain `http://` link, forwarded to the provider as-is.
    Url(String),
    /// In-memory encoded image. `name` identifies it in logs and errors.
    Bytes { name: String, data: Vec<u8> },
    /// Already decoded image.
    Image { name: String, image: DynamicImage },
}

impl ImageSource {
    /// Classify a path or link. `https://` links are rejected because the
    /// provider only fetches plain `http://` images.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("https://") {
            error!(source = %trimmed, "Remote https image links are not supported");
            return Err(OcrError::UnsupportedRemoteScheme(trimmed.to_string()));
        }
        if lower.starts_with("http://") {
            return Ok(ImageSource::Url(trimmed.to_string()));
        }
        Ok(ImageSource::Path(PathBuf::from(trimmed)))
    }

    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        ImageSource::Bytes {
            name: name.into(),
            data,
        }
    }

    pub fn from_image(name: impl Into<String>, image: DynamicImage) -> Self {
        ImageSource::Image {
            name: name.into(),
            image,
        }
    }

    /// Identifier used in logs and terminal errors.
    pub fn id(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Url(url) => url.clone(),
            ImageSource::Bytes { name, .. } | ImageSource::Image { name, .. } => name.clone(),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

/// Provider limits on the image actually sent, after any region is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_dimension: u32,
    pub min_dimension: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_dimension: 4096,
            min_dimension: 15,
        }
    }
}

impl From<&OcrConfig> for ImageLimits {
    fn from(config: &OcrConfig) -> Self {
        Self {
            max_dimension: config.max_image_dimension,
            min_dimension: config.min_image_dimension,
        }
    }
}

/// Reject anything but jpg, jpeg, png and bmp by extension. Runs before the
/// file is opened.
pub fn check_extension(path: &Path) -> Result<()> {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false);

    if supported {
        Ok(())
    } else {
        error!(path = %path.display(), "Unsupported image type, must be jpg, jpeg, png or bmp");
        Err(OcrError::UnsupportedImageFormat(path.display().to_string()))
    }
}

/// Sniff the format of in-memory image data.
pub fn sniff_format(name: &str, bytes: &[u8]) -> Result<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Bmp)) => Ok(format),
        _ => Err(OcrError::UnsupportedImageFormat(name.to_string())),
    }
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.decode()?)
}

pub fn validate_dimensions(image: &DynamicImage, limits: ImageLimits) -> Result<()> {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    let shortest = width.min(height);

    if longest > limits.max_dimension {
        error!(width, height, max = limits.max_dimension, "Image longest edge exceeds provider limit");
        return Err(OcrError::ImageTooLarge {
            width,
            height,
            max: limits.max_dimension,
        });
    }
    if shortest < limits.min_dimension {
        error!(width, height, min = limits.min_dimension, "Image shortest edge below provider limit");
        return Err(OcrError::ImageTooSmall {
            width,
            height,
            min: limits.min_dimension,
        });
    }
    Ok(())
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    image.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

/// Crop to `region`, check limits, and return the PNG re-encoding as
/// standard base64, ready for the `image` form field.
pub fn prepare_image(image: DynamicImage, region: Option<&str>, limits: ImageLimits) -> Result<String> {
    let image = apply_region(image, region)?;
    validate_dimensions(&image, limits)?;
    let png = encode_png(&image)?;
    debug!(
        width = image.width(),
        height = image.height(),
        bytes = png.len(),
        "Image prepared"
    );
    Ok(STANDARD.encode(png))
}

/// Load a local or in-memory source and run [`prepare_image`] on it.
/// Remote sources have nothing to load and are rejected here.
pub fn load_and_prepare(source: &ImageSource, region: Option<&str>, limits: ImageLimits) -> Result<String> {
    let image = match source {
        ImageSource::Path(path) => {
            check_extension(path)?;
            let bytes = std::fs::read(path)?;
            decode(&bytes)?
        }
        ImageSource::Bytes { name, data } => {
            sniff_format(name, data)?;
            decode(data)?
        }
        ImageSource::Image { image, .. } => image.clone(),
        ImageSource::Url(url) => {
            return Err(OcrError::Config(format!(
                "remote source {url} is sent by link, not loaded"
            )))
        }
    };
    prepare_image(image, region, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 10, 10])))
    }

    #[test]
    fn test_parse_sources() {
        assert!(matches!(
            ImageSource::parse("https://example.com/a.png"),
            Err(OcrError::UnsupportedRemoteScheme(_))
        ));
        assert!(matches!(
            ImageSource::parse("HTTPS://example.com/a.png"),
            Err(OcrError::UnsupportedRemoteScheme(_))
        ));
        assert!(matches!(
            ImageSource::parse("http://example.com/a.png").unwrap(),
            ImageSource::Url(ref u) if u == "http://example.com/a.png"
        ));
        assert!(matches!(
            ImageSource::parse("./scans/page.jpg").unwrap(),
            ImageSource::Path(_)
        ));
    }

    #[test]
    fn test_check_extension() {
        for ok in ["a.jpg", "a.JPEG", "dir/b.png", "c.Bmp"] {
            assert!(check_extension(Path::new(ok)).is_ok(), "{ok}");
        }
        for bad in ["a.gif", "a.tiff", "noext", "a.png.txt", "apeg"] {
            assert!(
                matches!(check_extension(Path::new(bad)), Err(OcrError::UnsupportedImageFormat(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_gif_rejected_without_reading() {
        let source = ImageSource::Path(PathBuf::from("/no/such/file.gif"));
        let result = load_and_prepare(&source, None, ImageLimits::default());
        assert!(matches!(result, Err(OcrError::UnsupportedImageFormat(_))));
    }

    #[test]
    fn test_dimension_limits() {
        let limits = ImageLimits::default();
        assert!(validate_dimensions(&solid(4096, 15), limits).is_ok());
        assert!(matches!(
            validate_dimensions(&solid(4097, 20), limits),
            Err(OcrError::ImageTooLarge { width: 4097, .. })
        ));
        assert!(matches!(
            validate_dimensions(&solid(100, 14), limits),
            Err(OcrError::ImageTooSmall { height: 14, .. })
        ));
    }

    #[test]
    fn test_limits_apply_after_region() {
        // 400x20 cropped to its left tenth is 40x20, still fine; a 5 px
        // wide crop is not.
        let image = solid(400, 20);
        assert!(prepare_image(image.clone(), Some("0,0,0.1,1"), ImageLimits::default()).is_ok());
        assert!(matches!(
            prepare_image(image, Some("0,0,5,1"), ImageLimits::default()),
            Err(OcrError::ImageTooSmall { .. })
        ));
    }

    #[test]
    fn test_prepared_image_is_base64_png() {
        let encoded = prepare_image(solid(32, 24), None, ImageLimits::default()).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        assert_eq!(decode(&bytes).unwrap().dimensions(), (32, 24));
    }

    #[test]
    fn test_bytes_source_must_be_supported_format() {
        let png = encode_png(&solid(20, 20)).unwrap();
        let source = ImageSource::from_bytes("mem.png", png);
        assert!(load_and_prepare(&source, None, ImageLimits::default()).is_ok());

        let gif_header = b"GIF89a\x01\x00\x01\x00".to_vec();
        let source = ImageSource::from_bytes("mem.gif", gif_header);
        assert!(matches!(
            load_and_prepare(&source, None, ImageLimits::default()),
            Err(OcrError::UnsupportedImageFormat(_))
        ));
    }

    #[test]
    fn test_path_source_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.PNG");
        solid(50, 40).save_with_format(&path, ImageFormat::Png).unwrap();

        let encoded = load_and_prepare(&ImageSource::from(path.as_path()), None, ImageLimits::default()).unwrap();
        let decoded = decode(&STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (50, 40));
    }
}
