//! Selectable text overlay for rendered pages

mod builder;
mod content;
mod images;
mod pipeline;
mod selection;

pub use builder::{
    AccessibilityManager, Highlighter, RenderStatus, TextLayerBuilder, TextLayerBuilderOptions,
};
pub use content::{
    Matrix, TextContent, TextContentSource, TextItem, TextStyle, Viewport, transform,
};
pub use images::{
    INLINE_IMAGE_CLASS, ImageData, ImageKind, ImageLayerMode, ImageNode, ImageUrlCache,
    PLACEHOLDER_SRC, PageImage, PlaceholderImage, encode_data_url,
};
pub use pipeline::{
    AverageGlyphMeasure, GlyphLayoutPipeline, LayerUpdate, TextDiv, TextDivId,
    TextDivProperties, TextLayerOutput, TextLayerPipeline, TextLayerTask, TextMeasure,
};
pub use selection::{
    END_OF_CONTENT_CLASS, EndOfContent, MouseDown, copy_text, normalize_unicode,
};
