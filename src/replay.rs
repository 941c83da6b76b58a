//! Scripted sessions for the command-line driver
//!
//! A script names instances and feeds host input (pointer events, window
//! resizes, text content) to a [`ViewerShell`] and a [`TextLayerBuilder`].
//! The report lists the effects each step produced and the final state.

use std::collections::BTreeMap;
use std::path::Path;
use std::task::Poll;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{DomQuery, ElementHandle, gen_app_config};
use crate::error::{ShellError, ShellResult};
use crate::event_bus::SidebarView;
use crate::instance::{InstanceConfig, InstanceManager, Signature};
use crate::l10n::{L10nArgs, Localization, NullL10n, TextDirection};
use crate::options::{AppOptions, OptionValue};
use crate::settings::Settings;
use crate::shell::{Host, ShellEffect, ViewerShell};
use crate::sidebar::{SidebarCommand, StaticMetrics};
use crate::text_layer::{
    GlyphLayoutPipeline, ImageData, ImageKind, ImageLayerMode, MouseDown, PageImage, RenderStatus,
    TextContent, TextLayerBuilder, TextLayerBuilderOptions, Viewport,
};

const DEFAULT_VIEW_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Outer container measurements shared by all instances
    #[serde(default = "default_container")]
    pub container: Container,
    #[serde(default)]
    pub direction: TextDirection,
    pub steps: Vec<Step>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Container {
    pub width: f64,
    #[serde(default)]
    pub left: f64,
}

fn default_container() -> Container {
    Container {
        width: 1200.0,
        left: 0.0,
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Create(CreateStep),
    Restore(String),
    Freeze(String),
    PointerOver(String),
    Initialized(String),
    Remove(String),
    SidebarView {
        instance: String,
        view: Option<SidebarView>,
    },
    PointerDown {
        instance: String,
        x: f64,
        #[serde(default)]
        button: i16,
    },
    PointerMove {
        instance: String,
        x: f64,
    },
    PointerUp(String),
    WindowResize {
        width: f64,
    },
    TextContent(TextContent),
    Render {
        #[serde(default = "default_view_box")]
        view_box: [f64; 4],
        #[serde(default = "default_scale")]
        scale: f64,
        #[serde(default)]
        rotation: i32,
    },
    MouseDown(MouseDown),
    MouseUp,
    Copy(String),
    Images(Vec<ScriptImage>),
    LoadImage(usize),
}

fn default_view_box() -> [f64; 4] {
    DEFAULT_VIEW_BOX
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateStep {
    pub name: String,
    #[serde(default = "default_initialized")]
    pub initialized: bool,
    /// App config overrides, dotted keys allowed
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

fn default_initialized() -> bool {
    true
}

/// A solid-color image placed on the page canvas
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptImage {
    pub name: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    #[serde(default = "default_pixels")]
    pub pixels: (u32, u32),
}

fn default_pixels() -> (u32, u32) {
    (1, 1)
}

impl ScriptImage {
    fn into_page_image(self) -> PageImage {
        let (width, height) = self.pixels;
        PageImage {
            name: self.name,
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            data: ImageData::Pixels {
                width,
                height,
                kind: ImageKind::Rgba32Bpp,
                data: vec![0x80; width as usize * height as usize * 4],
            },
        }
    }
}

impl Script {
    /// Parse a YAML or JSON script; each step is a single-key map
    pub fn parse(content: &str) -> ShellResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(content);
        Ok(serde_yaml::with::singleton_map_recursive::deserialize(deserializer)?)
    }

    pub fn load(path: &Path) -> ShellResult<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct StepReport {
    pub step: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<ShellEffect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InstanceReport {
    pub signature: Signature,
    pub active: bool,
    pub sidebar_width: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub struct TextLayerReport {
    pub rendered: bool,
    pub hidden: bool,
    pub scale: f64,
    pub rotation: u16,
    pub items: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub placeholders: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<StepReport>,
    pub active: Option<String>,
    pub instances: BTreeMap<String, InstanceReport>,
    pub text_layer: TextLayerReport,
}

/// Host that buffers effects until the driver collects them
#[derive(Debug, Default)]
pub struct ReplayHost {
    pending: Vec<ShellEffect>,
    metrics: StaticMetrics,
}

impl ReplayHost {
    fn take(&mut self) -> Vec<ShellEffect> {
        std::mem::take(&mut self.pending)
    }
}

impl Host for ReplayHost {
    fn apply(&mut self, effect: &ShellEffect) {
        self.pending.push(effect.clone());
    }

    fn container_metrics(&self, _instance: Signature) -> StaticMetrics {
        self.metrics
    }
}

/// Standard viewer markup, one copy per named instance
struct ScriptDom<'a> {
    instance: &'a str,
}

impl DomQuery for ScriptDom<'_> {
    fn element_by_id(&self, id: &str) -> Option<ElementHandle> {
        Some(ElementHandle::new(format!("{}#{id}", self.instance)))
    }

    fn document_root(&self) -> Option<ElementHandle> {
        Some(ElementHandle::new(format!("{}:root", self.instance)))
    }

    fn body(&self) -> Option<ElementHandle> {
        Some(ElementHandle::new(format!("{}:body", self.instance)))
    }
}

/// Null localization with a fixed layout direction
struct ScriptL10n(TextDirection);

impl Localization for ScriptL10n {
    fn language(&self) -> String {
        NullL10n.language()
    }

    fn direction(&self) -> TextDirection {
        self.0
    }

    fn get(&self, key: &str, args: Option<&L10nArgs<'_>>, fallback: Option<&str>) -> String {
        NullL10n.get(key, args, fallback)
    }
}

pub struct Replay {
    shell: ViewerShell<ReplayHost>,
    text_layer: TextLayerBuilder,
    names: BTreeMap<String, Signature>,
    settings: Settings,
}

impl Replay {
    pub fn new(settings: Settings, script: &Script) -> Self {
        let manager = match settings.seed {
            Some(seed) => InstanceManager::with_seed(seed),
            None => InstanceManager::new(),
        };
        let host = ReplayHost {
            pending: Vec::new(),
            metrics: StaticMetrics {
                width: script.container.width,
                left: script.container.left,
            },
        };
        let mut app_options = AppOptions::new();
        app_options.set_all(settings.options.clone());
        let mut layer_options = TextLayerBuilderOptions::from_app_options(&app_options);
        layer_options.device_pixel_ratio = settings.device_pixel_ratio;
        layer_options.enable_permissions |= settings.enable_permissions;
        if settings.image_layer_mode != ImageLayerMode::Off {
            layer_options.image_layer_mode = settings.image_layer_mode;
        }
        let text_layer =
            TextLayerBuilder::new(Box::new(GlyphLayoutPipeline::default()), layer_options);
        Self {
            shell: ViewerShell::with_manager(manager, host, Box::new(ScriptL10n(script.direction))),
            text_layer,
            names: BTreeMap::new(),
            settings,
        }
    }

    /// Run every step, recording failures per step instead of aborting
    pub fn run(mut self, script: Script) -> Report {
        let mut steps = Vec::with_capacity(script.steps.len());
        for (index, step) in script.steps.into_iter().enumerate() {
            let mut report = StepReport {
                step: index,
                ..StepReport::default()
            };
            match self.step(step) {
                Ok(clipboard) => report.clipboard = clipboard,
                Err(e) => {
                    warn!("Step {index} failed: {e}");
                    report.error = Some(e.to_string());
                }
            }
            report.effects = self.shell.host_mut().take();
            steps.push(report);
        }
        info!("Replayed {} steps", steps.len());
        self.report(steps)
    }

    fn signature(&self, name: &str) -> ShellResult<Signature> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ShellError::config(format!("no instance named {name:?}")))
    }

    fn step(&mut self, step: Step) -> ShellResult<Option<String>> {
        debug!("Replaying {step:?}");
        match step {
            Step::Create(create) => {
                if self.names.contains_key(&create.name) {
                    return Err(ShellError::config(format!(
                        "instance {:?} already exists",
                        create.name
                    )));
                }
                let app_config = gen_app_config(
                    &ScriptDom {
                        instance: &create.name,
                    },
                    &create.config,
                )?;
                let mut app_options = self.settings.options.clone();
                app_options.extend(create.options);
                let signature = self.shell.create_instance(InstanceConfig {
                    app_config,
                    app_options,
                    initialized: create.initialized,
                });
                self.names.insert(create.name, signature);
            }
            Step::Restore(name) => self.shell.restore(self.signature(&name)?)?,
            Step::Freeze(name) => self.shell.freeze(self.signature(&name)?)?,
            Step::PointerOver(name) => self.shell.pointer_over(self.signature(&name)?)?,
            Step::Initialized(name) => self.shell.mark_initialized(self.signature(&name)?)?,
            Step::Remove(name) => {
                let signature = self.signature(&name)?;
                self.shell.remove_instance(signature)?;
                self.names.remove(&name);
            }
            Step::SidebarView { instance, view } => {
                self.shell.set_sidebar_view(self.signature(&instance)?, view)?;
            }
            Step::PointerDown { instance, x, button } => {
                let cmd = SidebarCommand::PointerDown {
                    button,
                    client_x: x,
                };
                self.shell.sidebar_command(self.signature(&instance)?, cmd)?;
            }
            Step::PointerMove { instance, x } => {
                let cmd = SidebarCommand::PointerMove { client_x: x };
                self.shell.sidebar_command(self.signature(&instance)?, cmd)?;
            }
            Step::PointerUp(instance) => {
                let signature = self.signature(&instance)?;
                self.shell.sidebar_command(signature, SidebarCommand::PointerUp)?;
            }
            Step::WindowResize { width } => {
                self.shell.host_mut().metrics.width = width;
                self.shell.window_resized()?;
            }
            Step::TextContent(content) => self.text_layer.set_text_content_source(content),
            Step::Render {
                view_box,
                scale,
                rotation,
            } => {
                let viewport = Viewport::new(view_box, scale, rotation);
                if self.text_layer.render(&viewport)? == RenderStatus::Pending {
                    match self.text_layer.poll_render() {
                        Poll::Ready(result) => result?,
                        Poll::Pending => {
                            return Err(ShellError::pipeline("text layer did not finish"));
                        }
                    }
                }
            }
            Step::MouseDown(event) => self.text_layer.mouse_down(event),
            Step::MouseUp => self.text_layer.mouse_up(),
            Step::Copy(selection) => return Ok(self.text_layer.copy(&selection)),
            Step::Images(images) => {
                self.text_layer.begin_layout();
                for image in images {
                    self.text_layer.append_image(image.into_page_image());
                }
                self.text_layer.end_layout();
            }
            Step::LoadImage(index) => {
                if !self.text_layer.load_placeholder(index) {
                    return Err(ShellError::image_encoding(format!(
                        "placeholder {index} could not be loaded"
                    )));
                }
            }
        }
        Ok(None)
    }

    fn report(self, steps: Vec<StepReport>) -> Report {
        let active = self.shell.active();
        let instances = self
            .names
            .iter()
            .map(|(name, &signature)| {
                let report = InstanceReport {
                    signature,
                    active: active == Some(signature),
                    sidebar_width: self.shell.sidebar(signature).and_then(|s| s.width()),
                };
                (name.clone(), report)
            })
            .collect();
        let active = self
            .names
            .iter()
            .find(|&(_, &signature)| Some(signature) == active)
            .map(|(name, _)| name.clone());

        let layer = &self.text_layer;
        let text_layer = TextLayerReport {
            rendered: layer.rendering_done(),
            hidden: layer.is_hidden(),
            scale: layer.scale(),
            rotation: layer.rotation(),
            items: layer.text_items().to_vec(),
            placeholders: layer
                .placeholders()
                .iter()
                .map(|p| p.src.clone().unwrap_or_else(|| p.markup.clone()))
                .collect(),
            images: layer.image_nodes().iter().map(|n| n.id.clone()).collect(),
        };

        Report {
            steps,
            active,
            instances,
            text_layer,
        }
    }
}

/// Replay `script` under `settings`
pub fn replay(settings: Settings, script: Script) -> Report {
    Replay::new(settings, &script).run(script)
}
