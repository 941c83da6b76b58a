use std::collections::HashMap;
use std::task::Poll;

use log::{debug, trace, warn};

use crate::error::{ShellError, ShellResult};
use crate::options::AppOptions;

use super::content::{TextContentSource, Viewport};
use super::images::{
    ImageData, ImageLayerMode, ImageNode, ImageUrlCache, PageImage, PlaceholderImage,
};
use super::pipeline::{
    LayerUpdate, TextDiv, TextDivId, TextDivProperties, TextLayerPipeline, TextLayerTask,
};
use super::selection::{self, EndOfContent, MouseDown};

/// Receives the laid-out text so search matches can be highlighted
pub trait Highlighter {
    fn enable(&mut self);
    fn disable(&mut self);
    fn set_text_mapping(&mut self, divs: &[TextDivId], items: &[String]);
}

/// Keeps assistive technology in sync with the text layer
pub trait AccessibilityManager {
    fn enable(&mut self);
    fn disable(&mut self);
    fn set_text_mapping(&mut self, divs: &[TextDivId]);
}

/// Outcome of [`TextLayerBuilder::render`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    /// Extraction started; drive it with `poll_render`
    Pending,
    /// Nothing left to do
    Done,
}

pub struct TextLayerBuilderOptions {
    pub highlighter: Option<Box<dyn Highlighter>>,
    pub accessibility_manager: Option<Box<dyn AccessibilityManager>>,
    /// When set, copying text from the layer is not allowed
    pub enable_permissions: bool,
    pub device_pixel_ratio: f64,
    pub image_layer_mode: ImageLayerMode,
}

impl Default for TextLayerBuilderOptions {
    fn default() -> Self {
        Self {
            highlighter: None,
            accessibility_manager: None,
            enable_permissions: false,
            device_pixel_ratio: 1.0,
            image_layer_mode: ImageLayerMode::Off,
        }
    }
}

impl TextLayerBuilderOptions {
    /// Permission and image settings from an instance's options
    pub fn from_app_options(options: &AppOptions) -> Self {
        Self {
            enable_permissions: options.get_bool("enablePermissions"),
            image_layer_mode: ImageLayerMode::from_option(
                options.get_int("imageLayerMode").unwrap_or_default(),
            ),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct ImageLayer {
    mode: ImageLayerMode,
    /// Placeholders collected since `begin_layout`
    staged_placeholders: Vec<PlaceholderImage>,
    staged_nodes: Vec<ImageNode>,
    /// Contents of the current `inlineImages` container
    placeholders: Vec<PlaceholderImage>,
    /// Origin-mode nodes prepended to the layer
    nodes: Vec<ImageNode>,
    rendered: bool,
    count: usize,
    urls: ImageUrlCache,
}

/// Overlays transparent, selectable text on a rendered page
pub struct TextLayerBuilder {
    pipeline: Box<dyn TextLayerPipeline>,
    source: Option<TextContentSource>,
    task: Option<Box<dyn TextLayerTask>>,
    /// Scale and rotation the in-flight task was started with
    task_transform: Option<(f64, u16)>,

    text_items: Vec<String>,
    divs: Vec<TextDiv>,
    properties: HashMap<TextDivId, TextDivProperties>,

    scale: f64,
    rotation: u16,
    hidden: bool,
    rendering_done: bool,
    end_of_content: Option<EndOfContent>,

    highlighter: Option<Box<dyn Highlighter>>,
    accessibility_manager: Option<Box<dyn AccessibilityManager>>,
    enable_permissions: bool,
    device_pixel_ratio: f64,
    images: ImageLayer,
}

impl TextLayerBuilder {
    pub fn new(pipeline: Box<dyn TextLayerPipeline>, options: TextLayerBuilderOptions) -> Self {
        let mut builder = Self {
            pipeline,
            source: None,
            task: None,
            task_transform: None,
            text_items: Vec::new(),
            divs: Vec::new(),
            properties: HashMap::new(),
            scale: 0.0,
            rotation: 0,
            hidden: false,
            rendering_done: false,
            end_of_content: None,
            highlighter: options.highlighter,
            accessibility_manager: options.accessibility_manager,
            enable_permissions: options.enable_permissions,
            device_pixel_ratio: if options.device_pixel_ratio > 0.0 {
                options.device_pixel_ratio
            } else {
                1.0
            },
            images: ImageLayer {
                mode: options.image_layer_mode,
                ..ImageLayer::default()
            },
        };
        builder.hide();
        builder
    }

    pub fn num_text_divs(&self) -> usize {
        self.divs.len()
    }

    pub fn text_items(&self) -> &[String] {
        &self.text_items
    }

    pub fn text_divs(&self) -> &[TextDiv] {
        &self.divs
    }

    pub fn properties(&self, id: TextDivId) -> Option<&TextDivProperties> {
        self.properties.get(&id)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn rendering_done(&self) -> bool {
        self.rendering_done
    }

    pub fn is_rendering(&self) -> bool {
        self.task.is_some()
    }

    /// Scale (including device pixel ratio) the layer was last laid out at
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn end_of_content(&self) -> Option<&EndOfContent> {
        self.end_of_content.as_ref()
    }

    /// Replace the text source; the next `render` extracts from it
    pub fn set_text_content_source(&mut self, source: impl Into<TextContentSource>) {
        self.cancel();
        self.rendering_done = false;
        self.end_of_content = None;
        self.source = Some(source.into());
    }

    /// Lay out the text for `viewport`
    ///
    /// Once rendered, later calls only reposition existing divs.
    pub fn render(&mut self, viewport: &Viewport) -> ShellResult<RenderStatus> {
        if self.source.is_none() {
            return Err(ShellError::NoTextContentSource);
        }

        let scale = viewport.scale * self.device_pixel_ratio;
        let rotation = viewport.rotation;
        if self.rendering_done {
            let must_rotate = rotation != self.rotation;
            let must_rescale = scale != self.scale;
            if must_rotate || must_rescale {
                self.hide();
                self.pipeline.update(
                    &self.divs,
                    &mut self.properties,
                    viewport,
                    scale,
                    LayerUpdate {
                        must_rescale,
                        must_rotate,
                    },
                );
                self.scale = scale;
                self.rotation = rotation;
            }
            self.show();
            return Ok(RenderStatus::Done);
        }

        self.cancel();
        self.publish_text_mapping();

        let Some(source) = self.source.as_ref() else {
            return Err(ShellError::NoTextContentSource);
        };
        debug!("Starting text layer at scale {scale}, rotation {rotation}");
        self.task = Some(self.pipeline.start(source, viewport, scale));
        self.task_transform = Some((scale, rotation));
        Ok(RenderStatus::Pending)
    }

    /// Drive the in-flight render task
    pub fn poll_render(&mut self) -> Poll<ShellResult<()>> {
        let Some(task) = self.task.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let output = match task.poll() {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => {
                self.task = None;
                match result {
                    Ok(output) => output,
                    Err(e) => {
                        warn!("Text layer rendering failed: {e}");
                        return Poll::Ready(Err(e));
                    }
                }
            }
        };

        self.text_items = output.items;
        self.divs = output.divs;
        self.properties = output.properties;
        self.publish_text_mapping();
        self.finish_rendering();

        if let Some((scale, rotation)) = self.task_transform.take() {
            self.scale = scale;
            self.rotation = rotation;
        }
        self.show();
        if let Some(manager) = self.accessibility_manager.as_mut() {
            manager.enable();
        }
        Poll::Ready(Ok(()))
    }

    fn publish_text_mapping(&mut self) {
        let ids: Vec<TextDivId> = self.divs.iter().map(|div| div.id).collect();
        if let Some(highlighter) = self.highlighter.as_mut() {
            highlighter.set_text_mapping(&ids, &self.text_items);
        }
        if let Some(manager) = self.accessibility_manager.as_mut() {
            manager.set_text_mapping(&ids);
        }
    }

    fn finish_rendering(&mut self) {
        self.rendering_done = true;
        self.end_of_content = Some(EndOfContent::new());
        debug!("Text layer rendered with {} divs", self.divs.len());
    }

    pub fn hide(&mut self) {
        if !self.hidden {
            // Hidden divs must not be scrolled into view by a match
            if let Some(highlighter) = self.highlighter.as_mut() {
                highlighter.disable();
            }
            self.hidden = true;
        }
    }

    pub fn show(&mut self) {
        if self.hidden && self.rendering_done {
            self.hidden = false;
            if let Some(highlighter) = self.highlighter.as_mut() {
                highlighter.enable();
            }
        }
    }

    /// Cancel rendering and drop any laid-out text
    pub fn cancel(&mut self) {
        if let Some(mut task) = self.task.take() {
            trace!("Cancelling text layer task");
            task.cancel();
        }
        self.task_transform = None;
        if let Some(highlighter) = self.highlighter.as_mut() {
            highlighter.disable();
        }
        if let Some(manager) = self.accessibility_manager.as_mut() {
            manager.disable();
        }
        self.text_items.clear();
        self.divs.clear();
        self.properties.clear();
    }

    pub fn mouse_down(&mut self, event: MouseDown) {
        if let Some(marker) = self.end_of_content.as_mut() {
            selection::mouse_down(marker, event);
        }
    }

    pub fn mouse_up(&mut self) {
        if let Some(marker) = self.end_of_content.as_mut() {
            selection::mouse_up(marker);
        }
    }

    /// Clipboard text for copying `selection` out of this layer
    ///
    /// `None` when selection handling is not active yet or copying is not
    /// permitted. The copy event is consumed either way.
    pub fn copy(&self, selection: &str) -> Option<String> {
        self.end_of_content.as_ref()?;
        selection::copy_text(selection, self.enable_permissions)
    }

    pub fn image_layer_mode(&self) -> ImageLayerMode {
        self.images.mode
    }

    pub fn set_image_layer_mode(&mut self, mode: ImageLayerMode) {
        self.images.mode = mode;
    }

    pub fn begin_layout(&mut self) {
        self.images.staged_placeholders.clear();
        self.images.staged_nodes.clear();
    }

    pub fn append_image(&mut self, image: PageImage) {
        let images = &mut self.images;
        if images.rendered && images.count > 0 {
            return;
        }
        match images.mode {
            ImageLayerMode::Off => {}
            ImageLayerMode::Placeholder => {
                let index = images.staged_placeholders.len();
                images
                    .staged_placeholders
                    .push(PlaceholderImage::new(index, image));
            }
            ImageLayerMode::Origin => {
                let style = image.style();
                let src = match images.urls.get_or_encode(&image.name, &image.data) {
                    Ok(url) => url.map(|url| url.to_string()),
                    Err(e) => {
                        warn!("Failed to decode inline image {}: {e}", image.name);
                        None
                    }
                };
                images.staged_nodes.push(ImageNode {
                    alt: format!("{}.png", image.name),
                    id: image.name,
                    style,
                    loaded: src.is_some(),
                    src,
                });
            }
        }
    }

    pub fn end_layout(&mut self) {
        let images = &mut self.images;
        if images.mode == ImageLayerMode::Origin {
            if images.staged_nodes.is_empty() {
                return;
            }
            images.count = images.staged_nodes.len();
            let mut nodes = std::mem::take(&mut images.staged_nodes);
            nodes.append(&mut images.nodes);
            images.nodes = nodes;
            images.rendered = true;
            return;
        }

        // Replaces the previous `inlineImages` container
        images.placeholders = std::mem::take(&mut images.staged_placeholders);
    }

    /// Decode a placeholder after a pointer-down or context menu on it
    ///
    /// Returns whether the placeholder is loaded afterwards.
    pub fn load_placeholder(&mut self, index: usize) -> bool {
        let images = &mut self.images;
        let Some(placeholder) = images.placeholders.get_mut(index) else {
            return false;
        };
        if placeholder.loaded {
            return true;
        }
        match images.urls.get_or_encode(&placeholder.name, &placeholder.data) {
            Ok(src) => {
                placeholder.src = src.map(|url| url.to_string());
                placeholder.loaded = true;
                // Pixel data is no longer needed once decoded
                placeholder.data = ImageData::Empty;
                true
            }
            Err(e) => {
                warn!("Failed to decode placeholder {}: {e}", placeholder.name);
                false
            }
        }
    }

    /// Placeholders in the current `inlineImages` container
    pub fn placeholders(&self) -> &[PlaceholderImage] {
        &self.images.placeholders
    }

    /// Markup of the current `inlineImages` container
    pub fn placeholder_markup(&self) -> String {
        self.images
            .placeholders
            .iter()
            .map(|p| p.markup.as_str())
            .collect()
    }

    pub fn image_nodes(&self) -> &[ImageNode] {
        &self.images.nodes
    }
}

impl std::fmt::Debug for TextLayerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLayerBuilder")
            .field("divs", &self.divs.len())
            .field("scale", &self.scale)
            .field("rotation", &self.rotation)
            .field("hidden", &self.hidden)
            .field("rendering_done", &self.rendering_done)
            .field("rendering", &self.task.is_some())
            .field("images", &self.images)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        page_content, CallLog, CountingPipeline, RecordingAccessibility, RecordingHighlighter,
    };
    use crate::text_layer::content::TextContent;
    use crate::text_layer::images::ImageKind;

    const LETTER: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

    fn builder(log: &CallLog, pipeline: CountingPipeline) -> TextLayerBuilder {
        TextLayerBuilder::new(
            Box::new(pipeline),
            TextLayerBuilderOptions {
                highlighter: Some(Box::new(RecordingHighlighter::new(log.clone()))),
                accessibility_manager: Some(Box::new(RecordingAccessibility::new(log.clone()))),
                ..TextLayerBuilderOptions::default()
            },
        )
    }

    fn render_to_completion(builder: &mut TextLayerBuilder, viewport: &Viewport) {
        assert_eq!(builder.render(viewport).unwrap(), RenderStatus::Pending);
        assert!(matches!(builder.poll_render(), Poll::Ready(Ok(()))));
    }

    #[test]
    fn render_without_source_fails() {
        let log = CallLog::default();
        let mut builder = builder(&log, CountingPipeline::default());
        let err = builder.render(&Viewport::new(LETTER, 1.0, 0)).unwrap_err();
        assert!(matches!(err, ShellError::NoTextContentSource));
        assert_eq!(
            err.to_string(),
            "No \"textContentSource\" parameter specified."
        );
    }

    #[test]
    fn completed_render_shows_layer_and_enables_helpers() {
        let log = CallLog::default();
        let mut builder = builder(&log, CountingPipeline::default());
        assert!(builder.is_hidden());
        builder.set_text_content_source(page_content(&["Hello", "world"]));
        log.clear();

        render_to_completion(&mut builder, &Viewport::new(LETTER, 1.5, 0));

        assert!(builder.rendering_done());
        assert!(!builder.is_hidden());
        assert_eq!(builder.num_text_divs(), 2);
        assert_eq!(builder.text_items(), ["Hello", "world"]);
        assert_eq!(builder.scale(), 1.5);
        assert!(builder.end_of_content().is_some());
        assert_eq!(
            log.entries(),
            [
                "highlighter.disable",
                "accessibility.disable",
                "highlighter.mapping(0)",
                "accessibility.mapping(0)",
                "highlighter.mapping(2)",
                "accessibility.mapping(2)",
                "highlighter.enable",
                "accessibility.enable",
            ]
        );
    }

    #[test]
    fn rerender_never_restarts_extraction() {
        let log = CallLog::default();
        let pipeline = CountingPipeline::default();
        let counts = pipeline.counts();
        let mut builder = builder(&log, pipeline);
        builder.set_text_content_source(page_content(&["a", "b", "c"]));

        let viewport = Viewport::new(LETTER, 1.0, 0);
        render_to_completion(&mut builder, &viewport);
        assert_eq!(builder.render(&viewport).unwrap(), RenderStatus::Done);
        assert_eq!(counts.starts(), 1);
        assert_eq!(counts.updates(), 0);

        let zoomed = viewport.clone_with(2.0, 90);
        assert_eq!(builder.render(&zoomed).unwrap(), RenderStatus::Done);
        assert_eq!(counts.starts(), 1);
        assert_eq!(counts.updates(), 1);
        assert_eq!(builder.scale(), 2.0);
        assert_eq!(builder.rotation(), 90);
        assert!(!builder.is_hidden());
        assert_eq!(builder.num_text_divs(), 3);
    }

    #[test]
    fn device_pixel_ratio_scales_layout() {
        let mut builder = TextLayerBuilder::new(
            Box::new(CountingPipeline::default()),
            TextLayerBuilderOptions {
                device_pixel_ratio: 2.0,
                ..TextLayerBuilderOptions::default()
            },
        );
        builder.set_text_content_source(page_content(&["x"]));
        render_to_completion(&mut builder, &Viewport::new(LETTER, 1.25, 0));
        assert_eq!(builder.scale(), 2.5);
    }

    #[test]
    fn new_source_cancels_in_flight_stream() {
        let log = CallLog::default();
        let mut builder = builder(&log, CountingPipeline::default());
        let (tx, rx) = flume::unbounded::<TextContent>();
        builder.set_text_content_source(rx);

        builder.render(&Viewport::new(LETTER, 1.0, 0)).unwrap();
        tx.send(page_content(&["partial"])).unwrap();
        assert!(builder.poll_render().is_pending());
        assert!(builder.is_rendering());

        builder.set_text_content_source(page_content(&["fresh"]));
        assert!(!builder.is_rendering());
        assert!(!builder.rendering_done());
        assert_eq!(builder.num_text_divs(), 0);

        render_to_completion(&mut builder, &Viewport::new(LETTER, 1.0, 0));
        assert_eq!(builder.text_items(), ["fresh"]);
    }

    #[test]
    fn stream_completes_on_disconnect() {
        let log = CallLog::default();
        let mut builder = builder(&log, CountingPipeline::default());
        let (tx, rx) = flume::unbounded();
        builder.set_text_content_source(rx);
        builder.render(&Viewport::new(LETTER, 1.0, 0)).unwrap();

        tx.send(page_content(&["one"])).unwrap();
        tx.send(page_content(&["two"])).unwrap();
        assert!(builder.poll_render().is_pending());
        drop(tx);
        assert!(matches!(builder.poll_render(), Poll::Ready(Ok(()))));
        assert_eq!(builder.text_items(), ["one", "two"]);
    }

    #[test]
    fn hide_and_show_toggle_highlighter() {
        let log = CallLog::default();
        let mut builder = builder(&log, CountingPipeline::default());
        builder.show();
        assert!(builder.is_hidden(), "nothing to show before rendering");

        builder.set_text_content_source(page_content(&["x"]));
        render_to_completion(&mut builder, &Viewport::new(LETTER, 1.0, 0));
        log.clear();

        builder.hide();
        builder.hide();
        builder.show();
        assert_eq!(log.entries(), ["highlighter.disable", "highlighter.enable"]);
    }

    #[test]
    fn selection_requires_rendered_layer() {
        let log = CallLog::default();
        let mut builder = builder(&log, CountingPipeline::default());
        let click = MouseDown {
            on_layer: false,
            page_y: 50.0,
            layer_top: 0.0,
            layer_height: 200.0,
        };
        builder.mouse_down(click);
        assert!(builder.end_of_content().is_none());
        assert_eq!(builder.copy("text"), None);

        builder.set_text_content_source(page_content(&["x"]));
        render_to_completion(&mut builder, &Viewport::new(LETTER, 1.0, 0));
        builder.mouse_down(click);
        let marker = builder.end_of_content().unwrap();
        assert_eq!(marker.top.as_deref(), Some("25.00%"));
        assert!(marker.active);
        builder.mouse_up();
        assert!(!builder.end_of_content().unwrap().active);
        assert_eq!(builder.copy("e\u{301}\0").as_deref(), Some("\u{e9}"));
    }

    #[test]
    fn mouse_down_on_bare_layer_activates_marker() {
        let log = CallLog::default();
        let mut builder = builder(&log, CountingPipeline::default());
        builder.set_text_content_source(page_content(&["x"]));
        render_to_completion(&mut builder, &Viewport::new(LETTER, 1.0, 0));

        builder.mouse_down(MouseDown {
            on_layer: true,
            page_y: 50.0,
            layer_top: 0.0,
            layer_height: 200.0,
        });
        let marker = builder.end_of_content().unwrap();
        assert_eq!(marker.top, None);
        assert!(marker.active);
    }

    #[test]
    fn enforced_permissions_block_copy() {
        let mut builder = TextLayerBuilder::new(
            Box::new(CountingPipeline::default()),
            TextLayerBuilderOptions {
                enable_permissions: true,
                ..TextLayerBuilderOptions::default()
            },
        );
        builder.set_text_content_source(page_content(&["x"]));
        render_to_completion(&mut builder, &Viewport::new(LETTER, 1.0, 0));
        assert_eq!(builder.copy("x"), None);
    }

    fn page_image(name: &str, data: ImageData) -> PageImage {
        PageImage {
            name: name.to_string(),
            left: 0.0,
            top: 0.0,
            width: 10.0,
            height: 10.0,
            canvas_width: 100.0,
            canvas_height: 100.0,
            data,
        }
    }

    fn pixels() -> ImageData {
        ImageData::Pixels {
            width: 1,
            height: 1,
            kind: ImageKind::Rgb24Bpp,
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn placeholders_load_lazily() {
        let mut builder = TextLayerBuilder::new(
            Box::new(CountingPipeline::default()),
            TextLayerBuilderOptions {
                image_layer_mode: ImageLayerMode::Placeholder,
                ..TextLayerBuilderOptions::default()
            },
        );
        builder.begin_layout();
        builder.append_image(page_image("img0", pixels()));
        builder.append_image(page_image(
            "img1",
            ImageData::Pixels {
                width: 8,
                height: 8,
                kind: ImageKind::Rgba32Bpp,
                data: vec![],
            },
        ));
        builder.end_layout();

        assert_eq!(builder.placeholders().len(), 2);
        assert!(builder.placeholder_markup().contains(r#"data-index="1""#));

        assert!(builder.load_placeholder(0));
        let loaded = &builder.placeholders()[0];
        assert!(loaded.src.as_deref().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(loaded.data, ImageData::Empty);

        // Corrupt data stays unloaded
        assert!(!builder.load_placeholder(1));
        assert!(!builder.placeholders()[1].loaded);
        assert!(!builder.load_placeholder(7));

        // A new layout pass replaces the container
        builder.begin_layout();
        builder.end_layout();
        assert!(builder.placeholders().is_empty());
    }

    #[test]
    fn origin_images_are_prepended_once() {
        let mut builder = TextLayerBuilder::new(
            Box::new(CountingPipeline::default()),
            TextLayerBuilderOptions {
                image_layer_mode: ImageLayerMode::Origin,
                ..TextLayerBuilderOptions::default()
            },
        );
        builder.begin_layout();
        builder.end_layout();
        assert!(builder.image_nodes().is_empty());

        builder.begin_layout();
        builder.append_image(page_image("img0", pixels()));
        builder.append_image(page_image("img1", ImageData::Empty));
        builder.end_layout();
        let nodes = builder.image_nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].loaded);
        assert_eq!(nodes[0].alt, "img0.png");
        assert!(!nodes[1].loaded);

        builder.begin_layout();
        builder.append_image(page_image("img2", pixels()));
        builder.end_layout();
        assert_eq!(builder.image_nodes().len(), 2);
    }

    #[test]
    fn options_come_from_app_options() {
        let mut app_options = AppOptions::new();
        let defaults = TextLayerBuilderOptions::from_app_options(&app_options);
        assert!(!defaults.enable_permissions);
        assert_eq!(defaults.image_layer_mode, ImageLayerMode::Off);

        app_options.set("enablePermissions", true);
        app_options.set("imageLayerMode", 1i64);
        let options = TextLayerBuilderOptions::from_app_options(&app_options);
        assert!(options.enable_permissions);
        assert_eq!(options.image_layer_mode, ImageLayerMode::Placeholder);
    }

    #[test]
    fn off_mode_collects_nothing() {
        let mut builder = TextLayerBuilder::new(
            Box::new(CountingPipeline::default()),
            TextLayerBuilderOptions::default(),
        );
        builder.begin_layout();
        builder.append_image(page_image("img0", pixels()));
        builder.end_layout();
        assert!(builder.placeholders().is_empty());
        assert!(builder.image_nodes().is_empty());
    }
}
