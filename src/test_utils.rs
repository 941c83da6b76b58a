//! Recording doubles for the shell's environment seams

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::{DomQuery, ElementHandle};
use crate::instance::Signature;
use crate::shell::{Host, ShellEffect};
use crate::sidebar::StaticMetrics;
use crate::text_layer::{
    AccessibilityManager, GlyphLayoutPipeline, Highlighter, LayerUpdate, TextContent,
    TextContentSource, TextDiv, TextDivId, TextDivProperties, TextItem, TextLayerPipeline,
    TextLayerTask, TextStyle, Viewport,
};

/// Shared, ordered log of calls made on doubles
#[derive(Clone, Debug, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct RecordingHighlighter {
    log: CallLog,
}

impl RecordingHighlighter {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl Highlighter for RecordingHighlighter {
    fn enable(&mut self) {
        self.log.push("highlighter.enable");
    }

    fn disable(&mut self) {
        self.log.push("highlighter.disable");
    }

    fn set_text_mapping(&mut self, divs: &[TextDivId], items: &[String]) {
        assert_eq!(divs.len(), items.len(), "text mapping must stay index-aligned");
        self.log.push(format!("highlighter.mapping({})", divs.len()));
    }
}

pub struct RecordingAccessibility {
    log: CallLog,
}

impl RecordingAccessibility {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl AccessibilityManager for RecordingAccessibility {
    fn enable(&mut self) {
        self.log.push("accessibility.enable");
    }

    fn disable(&mut self) {
        self.log.push("accessibility.disable");
    }

    fn set_text_mapping(&mut self, divs: &[TextDivId]) {
        self.log.push(format!("accessibility.mapping({})", divs.len()));
    }
}

#[derive(Clone, Debug, Default)]
pub struct PipelineCounts {
    starts: Rc<Cell<usize>>,
    updates: Rc<Cell<usize>>,
}

impl PipelineCounts {
    pub fn starts(&self) -> usize {
        self.starts.get()
    }

    pub fn updates(&self) -> usize {
        self.updates.get()
    }
}

/// [`GlyphLayoutPipeline`] that counts how often it is started and updated
#[derive(Default)]
pub struct CountingPipeline {
    inner: GlyphLayoutPipeline,
    counts: PipelineCounts,
}

impl CountingPipeline {
    pub fn counts(&self) -> PipelineCounts {
        self.counts.clone()
    }
}

impl TextLayerPipeline for CountingPipeline {
    fn start(
        &mut self,
        source: &TextContentSource,
        viewport: &Viewport,
        scale: f64,
    ) -> Box<dyn TextLayerTask> {
        self.counts.starts.set(self.counts.starts.get() + 1);
        self.inner.start(source, viewport, scale)
    }

    fn update(
        &mut self,
        divs: &[TextDiv],
        properties: &mut HashMap<TextDivId, TextDivProperties>,
        viewport: &Viewport,
        scale: f64,
        update: LayerUpdate,
    ) {
        self.counts.updates.set(self.counts.updates.get() + 1);
        self.inner.update(divs, properties, viewport, scale, update);
    }
}

/// One line per string, 12pt, stacked down a letter-sized page
pub fn page_content(lines: &[&str]) -> TextContent {
    let items = lines
        .iter()
        .enumerate()
        .map(|(i, text)| TextItem {
            text: text.to_string(),
            dir: "ltr".to_string(),
            transform: [12.0, 0.0, 0.0, 12.0, 72.0, 720.0 - 14.0 * i as f64],
            width: 6.0 * text.chars().count() as f64,
            height: 12.0,
            font_name: "g_d0_f1".to_string(),
            has_eol: true,
        })
        .collect();
    TextContent {
        items,
        styles: HashMap::from([(
            "g_d0_f1".to_string(),
            TextStyle {
                ascent: 0.8,
                descent: -0.2,
                vertical: false,
                font_family: "sans-serif".to_string(),
            },
        )]),
        lang: Some("en".to_string()),
    }
}

/// Host that records every effect it is asked to apply
#[derive(Debug, Default)]
pub struct RecordingHost {
    effects: Vec<ShellEffect>,
    metrics: StaticMetrics,
    per_instance: HashMap<Signature, StaticMetrics>,
}

impl RecordingHost {
    pub fn new(metrics: StaticMetrics) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    pub fn effects(&self) -> &[ShellEffect] {
        &self.effects
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn set_metrics(&mut self, metrics: StaticMetrics) {
        self.metrics = metrics;
    }

    pub fn set_instance_metrics(&mut self, instance: Signature, metrics: StaticMetrics) {
        self.per_instance.insert(instance, metrics);
    }
}

impl Host for RecordingHost {
    fn apply(&mut self, effect: &ShellEffect) {
        self.effects.push(effect.clone());
    }

    fn container_metrics(&self, instance: Signature) -> StaticMetrics {
        self.per_instance
            .get(&instance)
            .copied()
            .unwrap_or(self.metrics)
    }
}

/// Resolves every id to `#id`, except those listed as missing
#[derive(Debug, Default)]
pub struct FakeDom {
    pub missing: Vec<String>,
}

impl DomQuery for FakeDom {
    fn element_by_id(&self, id: &str) -> Option<ElementHandle> {
        (!self.missing.iter().any(|m| m == id)).then(|| ElementHandle::new(format!("#{id}")))
    }

    fn document_root(&self) -> Option<ElementHandle> {
        Some(ElementHandle::new("html"))
    }

    fn body(&self) -> Option<ElementHandle> {
        Some(ElementHandle::new("body"))
    }
}
