//! Region cropping and vertical stitching.
//!
//! A region spec lists one or more rectangles `x1,y1,x2,y2` separated by `;`.
//! Values below `1.0` are fractions of the image width (x) or height (y);
//! anything else is an absolute pixel coordinate. An extent coordinate
//! (`x2`, `y2`) of exactly `1` means the full dimension, so `0,0,1,1` selects
//! the whole image while `1,1,200,200` still starts at pixel (1, 1).

use image::{imageops, DynamicImage, GenericImageView, RgbImage};

use crate::error::{OcrError, Result};

/// Resolved pixel rectangle, right and bottom edges exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rect {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Origin,
    Extent,
}

fn resolve(coord: f64, dimension: u32, edge: Edge) -> u32 {
    let is_fraction = match edge {
        Edge::Origin => coord < 1.0,
        Edge::Extent => coord <= 1.0,
    };
    let scaled = if is_fraction {
        f64::from(dimension) * coord
    } else {
        coord
    };
    // Truncate only after scaling, then keep inside the image.
    (scaled.trunc().max(0.0) as u32).min(dimension)
}

/// Parse `spec` against an image of `width` x `height`.
pub fn parse_region(spec: &str, width: u32, height: u32) -> Result<Vec<Rect>> {
    let body = spec.trim_matches(|c: char| c == ';' || c.is_whitespace());
    if body.is_empty() {
        return Err(OcrError::EmptyRegion);
    }

    let mut rects = Vec::new();
    for piece in body.split(';') {
        let coords = piece
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| OcrError::MalformedRegion(format!("{piece:?}: {e}")))?;

        let [x1, y1, x2, y2] = coords[..] else {
            return Err(OcrError::MalformedRegion(format!(
                "{piece:?}: expected 4 coordinates, got {}",
                coords.len()
            )));
        };
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(OcrError::MalformedRegion(format!(
                "{piece:?}: coordinates must be finite"
            )));
        }

        let rect = Rect {
            x1: resolve(x1, width, Edge::Origin),
            y1: resolve(y1, height, Edge::Origin),
            x2: resolve(x2, width, Edge::Extent),
            y2: resolve(y2, height, Edge::Extent),
        };
        if rect.x2 <= rect.x1 || rect.y2 <= rect.y1 {
            return Err(OcrError::MalformedRegion(format!(
                "{piece:?} resolves to an empty rectangle on a {width}x{height} image"
            )));
        }
        rects.push(rect);
    }

    Ok(rects)
}

/// Crop every rectangle from `image` and stack the pieces top to bottom on a
/// black RGB canvas, left aligned.
pub fn stitch(image: &DynamicImage, rects: &[Rect]) -> Result<RgbImage> {
    if rects.is_empty() {
        return Err(OcrError::EmptyRegion);
    }

    let source = image.to_rgb8();
    let (width, height) = image.dimensions();
    for rect in rects {
        if rect.x2 > width || rect.y2 > height || rect.width() == 0 || rect.height() == 0 {
            return Err(OcrError::MalformedRegion(format!(
                "{rect:?} is outside the {width}x{height} image"
            )));
        }
    }

    let crops: Vec<RgbImage> = rects
        .iter()
        .map(|r| imageops::crop_imm(&source, r.x1, r.y1, r.width(), r.height()).to_image())
        .collect();

    if let [single] = crops.as_slice() {
        return Ok(single.clone());
    }

    let canvas_width = crops.iter().map(|c| c.width()).max().unwrap_or(0);
    let canvas_height = crops.iter().map(|c| c.height()).sum();
    let mut canvas = RgbImage::new(canvas_width, canvas_height);

    let mut offset = 0i64;
    for crop in &crops {
        imageops::replace(&mut canvas, crop, 0, offset);
        offset += i64::from(crop.height());
    }

    Ok(canvas)
}

/// Apply an optional region spec. `None` or a blank spec returns the image
/// unchanged.
pub fn apply_region(image: DynamicImage, region: Option<&str>) -> Result<DynamicImage> {
    match region {
        Some(spec) if !spec.trim().is_empty() => {
            let rects = parse_region(spec, image.width(), image.height())?;
            Ok(DynamicImage::ImageRgb8(stitch(&image, &rects)?))
        }
        _ => Ok(image),
    }
}
