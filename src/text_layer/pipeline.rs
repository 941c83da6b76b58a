//! Extraction-to-node pipeline
//!
//! The overlay does not lay out text itself. It starts a
//! [`TextLayerPipeline`] task, polls it from the event loop and keeps the
//! resulting nodes. [`GlyphLayoutPipeline`] is the built-in implementation,
//! positioning one node per text item from its transform.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::task::Poll;

use flume::TryRecvError;
use log::{debug, trace};
use serde::Serialize;

use super::content::{TextContent, TextContentSource, TextItem, TextStyle, Viewport, transform};
use crate::error::{ShellError, ShellResult};

/// Index of a text node within its layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TextDivId(pub usize);

/// A transparent node mirroring one text item
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextDiv {
    pub id: TextDivId,
    pub text: String,
    /// Position as a percentage of the unscaled page size
    pub left_pct: f64,
    pub top_pct: f64,
    /// Unscaled font height in CSS pixels
    pub font_size: f64,
    pub font_family: String,
    pub dir: String,
    /// A line break follows this node
    pub has_eol: bool,
}

/// Layout properties kept beside each node
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextDivProperties {
    /// Rotation in degrees
    pub angle: f64,
    /// Width the text should occupy, in unscaled page units
    pub canvas_width: f64,
    pub has_text: bool,
    pub has_eol: bool,
    /// Horizontal stretch applied so the node matches `canvas_width`
    pub scale_x: f64,
}

/// What changed since the layer was laid out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerUpdate {
    pub must_rescale: bool,
    pub must_rotate: bool,
}

/// Nodes produced by a finished task, index-aligned with the item strings
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLayerOutput {
    pub items: Vec<String>,
    pub divs: Vec<TextDiv>,
    pub properties: HashMap<TextDivId, TextDivProperties>,
}

impl TextLayerOutput {
    pub fn len(&self) -> usize {
        self.divs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.divs.is_empty()
    }
}

/// An in-flight extraction
pub trait TextLayerTask {
    /// Advance the task; `Ready` carries the finished layout or the failure
    fn poll(&mut self) -> Poll<ShellResult<TextLayerOutput>>;

    fn cancel(&mut self);
}

/// Rendering-engine hook turning text content into positioned nodes
pub trait TextLayerPipeline {
    fn start(
        &mut self,
        source: &TextContentSource,
        viewport: &Viewport,
        scale: f64,
    ) -> Box<dyn TextLayerTask>;

    /// Reposition existing nodes for a new scale and/or rotation
    fn update(
        &mut self,
        divs: &[TextDiv],
        properties: &mut HashMap<TextDivId, TextDivProperties>,
        viewport: &Viewport,
        scale: f64,
        update: LayerUpdate,
    );
}

/// Width of rendered text, used to compute the horizontal stretch
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f64, font_family: &str) -> f64;
}

/// Estimates every glyph at half an em
#[derive(Clone, Copy, Debug, Default)]
pub struct AverageGlyphMeasure;

impl TextMeasure for AverageGlyphMeasure {
    fn measure(&self, text: &str, font_size: f64, _font_family: &str) -> f64 {
        text.chars().count() as f64 * font_size * 0.5
    }
}

fn scale_x(measure: &dyn TextMeasure, div: &TextDiv, canvas_width: f64, scale: f64) -> f64 {
    if canvas_width == 0.0 || div.text.is_empty() {
        return 1.0;
    }
    let measured = measure.measure(&div.text, div.font_size * scale, &div.font_family);
    if measured > 0.0 {
        canvas_width * scale / measured
    } else {
        1.0
    }
}

/// Position a single item on the page
fn layout_item(
    id: TextDivId,
    item: &TextItem,
    style: &TextStyle,
    viewport: &Viewport,
    measure: &dyn TextMeasure,
    scale: f64,
) -> (TextDiv, TextDivProperties) {
    // Unscaled, unrotated page space; rotation is applied at the container
    let base = viewport.clone_with(1.0, 0);
    let tx = transform(&base.transform, &item.transform);

    let mut angle = tx[1].atan2(tx[0]);
    if style.vertical {
        angle += PI / 2.0;
    }
    let font_height = tx[2].hypot(tx[3]);
    let font_ascent = if style.ascent != 0.0 {
        style.ascent * font_height
    } else if style.descent != 0.0 {
        (1.0 + style.descent) * font_height
    } else {
        font_height
    };

    let (left, top) = if angle == 0.0 {
        (tx[4], tx[5] - font_ascent)
    } else {
        (
            tx[4] + font_ascent * angle.sin(),
            tx[5] - font_ascent * angle.cos(),
        )
    };

    let (page_width, page_height) = (base.width, base.height);
    let div = TextDiv {
        id,
        text: item.text.clone(),
        left_pct: if page_width > 0.0 { 100.0 * left / page_width } else { 0.0 },
        top_pct: if page_height > 0.0 { 100.0 * top / page_height } else { 0.0 },
        font_size: font_height,
        font_family: style.font_family.clone(),
        dir: item.dir.clone(),
        has_eol: item.has_eol,
    };
    let canvas_width = if style.vertical { item.height } else { item.width };
    let properties = TextDivProperties {
        angle: angle.to_degrees(),
        canvas_width,
        has_text: !item.text.is_empty(),
        has_eol: item.has_eol,
        scale_x: scale_x(measure, &div, canvas_width, scale),
    };
    (div, properties)
}

/// Built-in pipeline laying out items from their transforms
pub struct GlyphLayoutPipeline<M = AverageGlyphMeasure> {
    measure: M,
}

impl Default for GlyphLayoutPipeline {
    fn default() -> Self {
        Self::new(AverageGlyphMeasure)
    }
}

impl<M: TextMeasure + Clone + 'static> GlyphLayoutPipeline<M> {
    pub fn new(measure: M) -> Self {
        Self { measure }
    }
}

impl<M: TextMeasure + Clone + 'static> TextLayerPipeline for GlyphLayoutPipeline<M> {
    fn start(
        &mut self,
        source: &TextContentSource,
        viewport: &Viewport,
        scale: f64,
    ) -> Box<dyn TextLayerTask> {
        let pending = match source {
            TextContentSource::Content(content) => Pending::Content(Some(content.clone())),
            TextContentSource::Stream(rx) => Pending::Stream(rx.clone()),
        };
        Box::new(GlyphLayoutTask {
            pending,
            viewport: viewport.clone(),
            scale,
            measure: self.measure.clone(),
            styles: HashMap::new(),
            output: TextLayerOutput::default(),
            cancelled: false,
        })
    }

    fn update(
        &mut self,
        divs: &[TextDiv],
        properties: &mut HashMap<TextDivId, TextDivProperties>,
        viewport: &Viewport,
        scale: f64,
        update: LayerUpdate,
    ) {
        if update.must_rotate {
            trace!("Text layer rotated to {}", viewport.rotation);
        }
        if !update.must_rescale {
            return;
        }
        for div in divs {
            if let Some(props) = properties.get_mut(&div.id) {
                props.scale_x = scale_x(&self.measure, div, props.canvas_width, scale);
            }
        }
    }
}

enum Pending {
    Content(Option<TextContent>),
    Stream(flume::Receiver<TextContent>),
}

struct GlyphLayoutTask<M> {
    pending: Pending,
    viewport: Viewport,
    scale: f64,
    measure: M,
    styles: HashMap<String, TextStyle>,
    output: TextLayerOutput,
    cancelled: bool,
}

impl<M: TextMeasure> GlyphLayoutTask<M> {
    fn process(&mut self, chunk: TextContent) {
        self.styles.extend(chunk.styles);
        for item in &chunk.items {
            let id = TextDivId(self.output.divs.len());
            let style = self.styles.get(&item.font_name).cloned().unwrap_or_default();
            let (div, properties) =
                layout_item(id, item, &style, &self.viewport, &self.measure, self.scale);
            self.output.items.push(item.text.clone());
            self.output.divs.push(div);
            self.output.properties.insert(id, properties);
        }
    }
}

impl<M: TextMeasure> TextLayerTask for GlyphLayoutTask<M> {
    fn poll(&mut self) -> Poll<ShellResult<TextLayerOutput>> {
        if self.cancelled {
            return Poll::Ready(Err(ShellError::pipeline("text layer task cancelled")));
        }
        loop {
            let chunk = match &mut self.pending {
                Pending::Content(content) => content.take(),
                Pending::Stream(rx) => match rx.try_recv() {
                    Ok(chunk) => Some(chunk),
                    Err(TryRecvError::Empty) => return Poll::Pending,
                    Err(TryRecvError::Disconnected) => None,
                },
            };
            match chunk {
                Some(chunk) => self.process(chunk),
                None => break,
            }
        }
        debug!("Text layer laid out {} items", self.output.len());
        Poll::Ready(Ok(std::mem::take(&mut self.output)))
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: [f64; 4] = [0.0, 0.0, 200.0, 100.0];

    fn item(text: &str, x: f64, y: f64) -> TextItem {
        TextItem {
            text: text.to_string(),
            dir: "ltr".to_string(),
            transform: [10.0, 0.0, 0.0, 10.0, x, y],
            width: 20.0,
            height: 10.0,
            font_name: "f1".to_string(),
            has_eol: false,
        }
    }

    fn content(items: Vec<TextItem>) -> TextContent {
        TextContent {
            items,
            styles: HashMap::from([(
                "f1".to_string(),
                TextStyle {
                    ascent: 0.8,
                    ..TextStyle::default()
                },
            )]),
            lang: None,
        }
    }

    #[test]
    fn materialized_content_is_laid_out_in_one_poll() {
        let mut pipeline = GlyphLayoutPipeline::default();
        let viewport = Viewport::new(PAGE, 1.0, 0);
        let source =
            TextContentSource::from(content(vec![item("ab", 20.0, 50.0), item("", 0.0, 0.0)]));

        let mut task = pipeline.start(&source, &viewport, 1.0);
        let Poll::Ready(Ok(output)) = task.poll() else {
            panic!("content source should finish immediately");
        };

        assert_eq!(output.items, vec!["ab".to_string(), String::new()]);
        let div = &output.divs[0];
        assert_eq!(div.font_size, 10.0);
        assert_eq!(div.left_pct, 10.0);
        // baseline at y=50 flipped to 50, minus an 8px ascent
        assert_eq!(div.top_pct, 42.0);

        let props = &output.properties[&TextDivId(0)];
        assert_eq!(props.angle, 0.0);
        assert!(props.has_text);
        // two glyphs at 5px each stretched over 20 units
        assert_eq!(props.scale_x, 2.0);
        assert!(!output.properties[&TextDivId(1)].has_text);
    }

    #[test]
    fn stream_stays_pending_until_disconnected() {
        let (tx, rx) = flume::unbounded();
        let mut pipeline = GlyphLayoutPipeline::default();
        let viewport = Viewport::new(PAGE, 1.0, 0);
        let mut task = pipeline.start(&TextContentSource::from(rx), &viewport, 1.0);

        tx.send(content(vec![item("a", 0.0, 0.0)])).unwrap();
        assert!(task.poll().is_pending());
        tx.send(content(vec![item("b", 0.0, 0.0)])).unwrap();
        assert!(task.poll().is_pending());
        drop(tx);

        let Poll::Ready(Ok(output)) = task.poll() else {
            panic!("disconnected stream should finish");
        };
        assert_eq!(output.items, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(output.divs[1].id, TextDivId(1));
    }

    #[test]
    fn cancelled_task_fails() {
        let mut pipeline = GlyphLayoutPipeline::default();
        let viewport = Viewport::new(PAGE, 1.0, 0);
        let source = TextContentSource::from(content(vec![]));
        let mut task = pipeline.start(&source, &viewport, 1.0);
        task.cancel();
        assert!(matches!(
            task.poll(),
            Poll::Ready(Err(ShellError::Pipeline { .. }))
        ));
    }

    #[test]
    fn rescale_updates_stretch_in_place() {
        let mut pipeline = GlyphLayoutPipeline::default();
        let viewport = Viewport::new(PAGE, 1.0, 0);
        let mut task = pipeline.start(
            &TextContentSource::from(content(vec![item("ab", 0.0, 0.0)])),
            &viewport,
            1.0,
        );
        let Poll::Ready(Ok(mut output)) = task.poll() else {
            panic!("content source should finish immediately");
        };

        let before = output.divs.clone();
        pipeline.update(
            &output.divs,
            &mut output.properties,
            &viewport.clone_with(2.0, 0),
            2.0,
            LayerUpdate {
                must_rescale: true,
                must_rotate: false,
            },
        );
        assert_eq!(output.divs, before);
        // measure and canvas width scale together
        assert_eq!(output.properties[&TextDivId(0)].scale_x, 2.0);
    }

    fn lay_out(pipeline: &mut GlyphLayoutPipeline, viewport: &Viewport) -> TextLayerOutput {
        let source = TextContentSource::from(content(vec![item("Hello", 20.0, 50.0)]));
        let mut task = pipeline.start(&source, viewport, viewport.scale);
        let Poll::Ready(Ok(output)) = task.poll() else {
            panic!("content source should finish immediately");
        };
        output
    }

    #[test]
    fn rotated_then_updated_matches_fresh_layout() {
        let mut pipeline = GlyphLayoutPipeline::default();
        let rotated = Viewport::new(PAGE, 1.0, 90);
        let upright = Viewport::new(PAGE, 1.0, 0);

        let mut output = lay_out(&mut pipeline, &rotated);
        pipeline.update(
            &output.divs,
            &mut output.properties,
            &upright,
            1.0,
            LayerUpdate {
                must_rescale: false,
                must_rotate: true,
            },
        );

        let fresh = lay_out(&mut pipeline, &upright);
        assert_eq!(output.divs, fresh.divs);
        assert_eq!(output.properties, fresh.properties);
        assert_eq!(fresh.properties[&TextDivId(0)].angle, 0.0);
    }
}
