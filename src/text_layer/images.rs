//! Inline images over the text layer
//!
//! Images found while laying out a page can be mirrored into the text
//! layer so they take part in selection and context menus. In placeholder
//! mode they start as a transparent GIF and are decoded on first pointer
//! interaction; in origin mode they are decoded immediately.

use std::io::Cursor;
use std::num::NonZeroUsize;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use log::debug;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::error::{ShellError, ShellResult};

/// 1×1 transparent GIF shown until a placeholder is loaded
pub const PLACEHOLDER_SRC: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";
pub const INLINE_IMAGE_CLASS: &str = "inlineImage";

const DEFAULT_URL_CACHE_SIZE: usize = 64;

/// How images are mirrored into the text layer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageLayerMode {
    #[default]
    Off,
    /// Lazy placeholders decoded on pointer-down or context menu
    Placeholder,
    /// Real images decoded while laying out
    Origin,
}

impl ImageLayerMode {
    /// Mode from the numeric `imageLayerMode` option
    pub fn from_option(value: i64) -> Self {
        match value {
            1 => ImageLayerMode::Placeholder,
            2 => ImageLayerMode::Origin,
            _ => ImageLayerMode::Off,
        }
    }
}

/// Pixel layout of raw image data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    /// One bit per pixel, rows padded to whole bytes
    Grayscale1Bpp,
    Rgb24Bpp,
    Rgba32Bpp,
}

impl ImageKind {
    fn row_bytes(self, width: u32) -> usize {
        let width = width as usize;
        match self {
            ImageKind::Grayscale1Bpp => width.div_ceil(8),
            ImageKind::Rgb24Bpp => width * 3,
            ImageKind::Rgba32Bpp => width * 4,
        }
    }
}

/// Decoded image as handed over by the rendering engine
#[derive(Clone, Debug, PartialEq)]
pub enum ImageData {
    Pixels {
        width: u32,
        height: u32,
        kind: ImageKind,
        data: Vec<u8>,
    },
    Bitmap(image::RgbaImage),
    /// Nothing to show (or already released)
    Empty,
}

/// An image placed on the page canvas
#[derive(Clone, Debug, PartialEq)]
pub struct PageImage {
    pub name: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Size of the canvas the page was painted on
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub data: ImageData,
}

impl PageImage {
    /// Absolute-position style in percentages of the canvas
    pub fn style(&self) -> String {
        let pct = |value: f64, total: f64| {
            if total > 0.0 { 100.0 * value / total } else { 0.0 }
        };
        format!(
            "position: absolute; height: {}%; width: {}%; top: {}%; left: {}%;",
            pct(self.height, self.canvas_height),
            pct(self.width, self.canvas_width),
            pct(self.top, self.canvas_height),
            pct(self.left, self.canvas_width),
        )
    }
}

/// A lazily loaded image in placeholder mode
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceholderImage {
    pub name: String,
    /// `<img>` markup carrying the transparent placeholder source
    pub markup: String,
    /// Retained until the placeholder is loaded
    pub data: ImageData,
    pub src: Option<String>,
    pub loaded: bool,
}

impl PlaceholderImage {
    pub fn new(index: usize, image: PageImage) -> Self {
        let markup = format!(
            concat!(
                r#"<img alt="{name}.png" id="{name}" data-index="{index}" "#,
                r#"src="{src}" class="{class}" style="{style}"/>"#,
            ),
            name = image.name,
            index = index,
            src = PLACEHOLDER_SRC,
            class = INLINE_IMAGE_CLASS,
            style = image.style(),
        );
        Self {
            name: image.name,
            markup,
            data: image.data,
            src: None,
            loaded: false,
        }
    }
}

/// An eagerly loaded image node in origin mode
#[derive(Clone, Debug, PartialEq)]
pub struct ImageNode {
    pub id: String,
    pub alt: String,
    pub style: String,
    pub src: Option<String>,
    pub loaded: bool,
}

/// Encode image data as a PNG `data:` URL; `Empty` yields `None`
pub fn encode_data_url(data: &ImageData) -> ShellResult<Option<String>> {
    let png = match data {
        ImageData::Empty => return Ok(None),
        ImageData::Pixels {
            width,
            height,
            kind,
            data,
        } => encode_pixels(*width, *height, *kind, data)?,
        ImageData::Bitmap(bitmap) => {
            let mut cursor = Cursor::new(Vec::new());
            image::DynamicImage::ImageRgba8(bitmap.clone())
                .write_to(&mut cursor, image::ImageFormat::Png)
                .map_err(|e| ShellError::image_encoding(e.to_string()))?;
            cursor.into_inner()
        }
    };
    Ok(Some(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(&png)
    )))
}

fn encode_pixels(width: u32, height: u32, kind: ImageKind, pixels: &[u8]) -> ShellResult<Vec<u8>> {
    let expected = kind.row_bytes(width) * height as usize;
    if width == 0 || height == 0 || pixels.len() < expected {
        return Err(ShellError::image_encoding(format!(
            "{width}x{height} {kind:?} needs {expected} bytes, got {}",
            pixels.len()
        )));
    }

    let (color, depth) = match kind {
        ImageKind::Grayscale1Bpp => (png::ColorType::Grayscale, png::BitDepth::One),
        ImageKind::Rgb24Bpp => (png::ColorType::Rgb, png::BitDepth::Eight),
        ImageKind::Rgba32Bpp => (png::ColorType::Rgba, png::BitDepth::Eight),
    };

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(color);
        encoder.set_depth(depth);
        encoder.set_compression(png::Compression::Fast);

        let mut writer = encoder
            .write_header()
            .map_err(|e| ShellError::image_encoding(format!("PNG write header error: {e}")))?;
        writer
            .write_image_data(&pixels[..expected])
            .map_err(|e| ShellError::image_encoding(format!("PNG write data error: {e}")))?;
    }
    Ok(png_data)
}

/// LRU cache of encoded data URLs keyed by image name
pub struct ImageUrlCache {
    cache: LruCache<String, Arc<str>>,
}

impl Default for ImageUrlCache {
    fn default() -> Self {
        Self::new(DEFAULT_URL_CACHE_SIZE)
    }
}

impl ImageUrlCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Cached URL for `name`, encoding `data` on a miss
    pub fn get_or_encode(&mut self, name: &str, data: &ImageData) -> ShellResult<Option<Arc<str>>> {
        if let Some(url) = self.cache.get(name) {
            return Ok(Some(url.clone()));
        }
        let Some(url) = encode_data_url(data)? else {
            return Ok(None);
        };
        debug!("Encoded inline image {name} ({} bytes)", url.len());
        let url: Arc<str> = url.into();
        self.cache.put(name.to_string(), url.clone());
        Ok(Some(url))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for ImageUrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUrlCache")
            .field("len", &self.cache.len())
            .field("capacity", &self.cache.cap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(width: u32, height: u32) -> ImageData {
        ImageData::Pixels {
            width,
            height,
            kind: ImageKind::Rgba32Bpp,
            data: vec![255; (width * height * 4) as usize],
        }
    }

    #[test]
    fn pixels_encode_to_png_data_url() {
        let url = encode_data_url(&rgba(2, 2)).unwrap().unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = general_purpose::STANDARD.decode(payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn one_bit_rows_are_padded() {
        let data = ImageData::Pixels {
            width: 9,
            height: 2,
            kind: ImageKind::Grayscale1Bpp,
            data: vec![0b1010_1010, 0b1000_0000, 0xFF, 0x80],
        };
        assert!(encode_data_url(&data).unwrap().is_some());
    }

    #[test]
    fn short_pixel_buffer_is_rejected() {
        let data = ImageData::Pixels {
            width: 4,
            height: 4,
            kind: ImageKind::Rgb24Bpp,
            data: vec![0; 10],
        };
        assert!(matches!(
            encode_data_url(&data),
            Err(ShellError::ImageEncoding { .. })
        ));
    }

    #[test]
    fn bitmap_and_empty() {
        let bitmap = ImageData::Bitmap(image::RgbaImage::new(3, 1));
        assert!(encode_data_url(&bitmap).unwrap().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(encode_data_url(&ImageData::Empty).unwrap(), None);
    }

    #[test]
    fn cache_reuses_encoded_urls() {
        let mut cache = ImageUrlCache::new(1);
        let first = cache.get_or_encode("img1", &rgba(1, 1)).unwrap().unwrap();
        // Data is not consulted on a hit
        let again = cache.get_or_encode("img1", &ImageData::Empty).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        cache.get_or_encode("img2", &rgba(1, 1)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_or_encode("img1", &ImageData::Empty).unwrap(), None);
    }

    #[test]
    fn placeholder_markup_positions_in_percent() {
        let image = PageImage {
            name: "img_p0_1".to_string(),
            left: 50.0,
            top: 25.0,
            width: 100.0,
            height: 50.0,
            canvas_width: 200.0,
            canvas_height: 100.0,
            data: ImageData::Empty,
        };
        assert_eq!(
            image.style(),
            "position: absolute; height: 50%; width: 50%; top: 25%; left: 25%;"
        );
        let placeholder = PlaceholderImage::new(3, image);
        assert!(placeholder.markup.contains(r#"data-index="3""#));
        assert!(placeholder.markup.contains(r#"alt="img_p0_1.png""#));
        assert!(placeholder.markup.contains(PLACEHOLDER_SRC));
        assert!(!placeholder.loaded);
    }
}
