//! Extracted text content and the page viewport it is laid out against

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One run of text with its position in page space
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    #[serde(rename = "str")]
    pub text: String,
    #[serde(default = "default_dir")]
    pub dir: String,
    /// Text-space to page-space matrix `[a, b, c, d, e, f]`
    pub transform: [f64; 6],
    pub width: f64,
    pub height: f64,
    pub font_name: String,
    #[serde(default, rename = "hasEOL")]
    pub has_eol: bool,
}

fn default_dir() -> String {
    "ltr".to_string()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default)]
    pub ascent: f64,
    #[serde(default)]
    pub descent: f64,
    #[serde(default)]
    pub vertical: bool,
    #[serde(default)]
    pub font_family: String,
}

/// Text items plus the styles their `font_name`s refer to
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub items: Vec<TextItem>,
    #[serde(default)]
    pub styles: HashMap<String, TextStyle>,
    #[serde(default)]
    pub lang: Option<String>,
}

/// Where a text layer gets its content from
#[derive(Clone, Debug)]
pub enum TextContentSource {
    /// Content extracted up front
    Content(TextContent),
    /// Chunks arriving as extraction progresses; disconnecting ends the stream
    Stream(flume::Receiver<TextContent>),
}

impl From<TextContent> for TextContentSource {
    fn from(content: TextContent) -> Self {
        TextContentSource::Content(content)
    }
}

impl From<flume::Receiver<TextContent>> for TextContentSource {
    fn from(stream: flume::Receiver<TextContent>) -> Self {
        TextContentSource::Stream(stream)
    }
}

/// Affine transform `[a, b, c, d, e, f]`
pub type Matrix = [f64; 6];

/// Multiply two transforms, applying `m2` first
pub fn transform(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[2] * m2[1],
        m1[1] * m2[0] + m1[3] * m2[1],
        m1[0] * m2[2] + m1[2] * m2[3],
        m1[1] * m2[2] + m1[3] * m2[3],
        m1[0] * m2[4] + m1[2] * m2[5] + m1[4],
        m1[1] * m2[4] + m1[3] * m2[5] + m1[5],
    ]
}

/// Page geometry at a given scale and rotation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Page box `[x1, y1, x2, y2]` in PDF units
    pub view_box: [f64; 4],
    pub scale: f64,
    /// Clockwise rotation in degrees, normalized to 0, 90, 180 or 270
    pub rotation: u16,
    /// Page space to viewport space
    pub transform: Matrix,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(view_box: [f64; 4], scale: f64, rotation: i32) -> Self {
        let center_x = (view_box[2] + view_box[0]) / 2.0;
        let center_y = (view_box[3] + view_box[1]) / 2.0;

        let rotation = rotation.rem_euclid(360);
        let (a, b, c, d) = match rotation {
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            _ => (1.0, 0.0, 0.0, -1.0),
        };
        let rotation = match rotation {
            90 | 180 | 270 => rotation as u16,
            _ => 0,
        };

        let box_width = (view_box[2] - view_box[0]).abs();
        let box_height = (view_box[3] - view_box[1]).abs();
        let (offset_x, offset_y, width, height) = if a == 0.0 {
            (
                (center_y - view_box[1]).abs() * scale,
                (center_x - view_box[0]).abs() * scale,
                box_height * scale,
                box_width * scale,
            )
        } else {
            (
                (center_x - view_box[0]).abs() * scale,
                (center_y - view_box[1]).abs() * scale,
                box_width * scale,
                box_height * scale,
            )
        };

        let transform = [
            a * scale,
            b * scale,
            c * scale,
            d * scale,
            offset_x - a * scale * center_x - c * scale * center_y,
            offset_y - b * scale * center_x - d * scale * center_y,
        ];

        Self {
            view_box,
            scale,
            rotation,
            transform,
            width,
            height,
        }
    }

    /// Same page at another scale/rotation
    pub fn clone_with(&self, scale: f64, rotation: i32) -> Self {
        Self::new(self.view_box, scale, rotation)
    }

    /// Unscaled page size, matching the orientation of this viewport
    pub fn raw_dims(&self) -> (f64, f64) {
        (self.width / self.scale, self.height / self.scale)
    }
}
