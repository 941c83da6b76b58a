//! Application configuration: which UI elements the shell is anchored to
//!
//! The configuration is a plain struct of element handles. It is populated
//! through a [`DomQuery`] adapter so nothing here touches the environment,
//! and can be adjusted with JSON overrides whose keys may be dotted
//! (`"sidebarResizer.resizer"`) or nested objects that merge into a section.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ShellError, ShellResult};

/// Opaque reference to a UI element, as resolved by the host
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Element lookup provided by the host environment
pub trait DomQuery {
    fn element_by_id(&self, id: &str) -> Option<ElementHandle>;

    /// The document's root element (`<html>`)
    fn document_root(&self) -> Option<ElementHandle>;

    fn body(&self) -> Option<ElementHandle>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolbarConfig {
    pub container: Option<ElementHandle>,
    pub num_pages: Option<ElementHandle>,
    pub page_number: Option<ElementHandle>,
    pub scale_select: Option<ElementHandle>,
    pub custom_scale_option: Option<ElementHandle>,
    pub previous: Option<ElementHandle>,
    pub next: Option<ElementHandle>,
    pub zoom_in: Option<ElementHandle>,
    pub zoom_out: Option<ElementHandle>,
    pub view_find: Option<ElementHandle>,
    pub open_file: Option<ElementHandle>,
    pub print: Option<ElementHandle>,
    pub download: Option<ElementHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SecondaryToolbarConfig {
    pub toolbar: Option<ElementHandle>,
    pub toggle_button: Option<ElementHandle>,
    pub presentation_mode_button: Option<ElementHandle>,
    pub open_file_button: Option<ElementHandle>,
    pub print_button: Option<ElementHandle>,
    pub download_button: Option<ElementHandle>,
    pub first_page_button: Option<ElementHandle>,
    pub last_page_button: Option<ElementHandle>,
    pub page_rotate_cw_button: Option<ElementHandle>,
    pub page_rotate_ccw_button: Option<ElementHandle>,
    pub cursor_select_tool_button: Option<ElementHandle>,
    pub cursor_hand_tool_button: Option<ElementHandle>,
    pub document_properties_button: Option<ElementHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SidebarConfig {
    pub outer_container: Option<ElementHandle>,
    pub sidebar_container: Option<ElementHandle>,
    pub toggle_button: Option<ElementHandle>,
    pub thumbnail_button: Option<ElementHandle>,
    pub outline_button: Option<ElementHandle>,
    pub attachments_button: Option<ElementHandle>,
    pub layers_button: Option<ElementHandle>,
    pub thumbnail_view: Option<ElementHandle>,
    pub outline_view: Option<ElementHandle>,
    pub attachments_view: Option<ElementHandle>,
    pub layers_view: Option<ElementHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SidebarResizerConfig {
    /// Encloses both the viewer and the sidebar
    pub outer_container: Option<ElementHandle>,
    /// Drag handle adjusting the sidebar width
    pub resizer: Option<ElementHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FindBarConfig {
    pub bar: Option<ElementHandle>,
    pub toggle_button: Option<ElementHandle>,
    pub find_field: Option<ElementHandle>,
    pub highlight_all_checkbox: Option<ElementHandle>,
    pub case_sensitive_checkbox: Option<ElementHandle>,
    pub match_diacritics_checkbox: Option<ElementHandle>,
    pub entire_word_checkbox: Option<ElementHandle>,
    pub find_msg: Option<ElementHandle>,
    pub find_results_count: Option<ElementHandle>,
    pub find_previous_button: Option<ElementHandle>,
    pub find_next_button: Option<ElementHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PasswordOverlayConfig {
    pub dialog: Option<ElementHandle>,
    pub label: Option<ElementHandle>,
    pub input: Option<ElementHandle>,
    pub submit_button: Option<ElementHandle>,
    pub cancel_button: Option<ElementHandle>,
}

/// Elements a viewer instance is anchored to
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
    /// Pointer-over on this element restores a frozen instance
    pub document_root_element: Option<ElementHandle>,
    /// Receives focus when the instance is restored
    pub app_container: Option<ElementHandle>,
    pub main_container: Option<ElementHandle>,
    pub viewer_container: Option<ElementHandle>,
    pub toolbar: ToolbarConfig,
    pub secondary_toolbar: SecondaryToolbarConfig,
    pub sidebar: SidebarConfig,
    pub sidebar_resizer: SidebarResizerConfig,
    pub find_bar: FindBarConfig,
    pub password_overlay: PasswordOverlayConfig,
    pub progress_bar: Option<ElementHandle>,
    pub print_container: Option<ElementHandle>,
    pub open_file_input: Option<ElementHandle>,
}

/// Build the configuration for the standard viewer markup, then apply `overrides`
pub fn gen_app_config(
    dom: &dyn DomQuery,
    overrides: &Map<String, Value>,
) -> ShellResult<AppConfig> {
    let id = |name: &str| dom.element_by_id(name);
    let outer_container = id("outerContainer");

    let config = AppConfig {
        document_root_element: dom.document_root(),
        app_container: dom.body(),
        main_container: id("viewerContainer"),
        viewer_container: id("viewer"),
        toolbar: ToolbarConfig {
            container: id("toolbarViewer"),
            num_pages: id("numPages"),
            page_number: id("pageNumber"),
            scale_select: id("scaleSelect"),
            custom_scale_option: id("customScaleOption"),
            previous: id("previous"),
            next: id("next"),
            zoom_in: id("zoomIn"),
            zoom_out: id("zoomOut"),
            view_find: id("viewFind"),
            open_file: id("openFile"),
            print: id("print"),
            download: id("download"),
        },
        secondary_toolbar: SecondaryToolbarConfig {
            toolbar: id("secondaryToolbar"),
            toggle_button: id("secondaryToolbarToggle"),
            presentation_mode_button: id("presentationMode"),
            open_file_button: id("secondaryOpenFile"),
            print_button: id("secondaryPrint"),
            download_button: id("secondaryDownload"),
            first_page_button: id("firstPage"),
            last_page_button: id("lastPage"),
            page_rotate_cw_button: id("pageRotateCw"),
            page_rotate_ccw_button: id("pageRotateCcw"),
            cursor_select_tool_button: id("cursorSelectTool"),
            cursor_hand_tool_button: id("cursorHandTool"),
            document_properties_button: id("documentProperties"),
        },
        sidebar: SidebarConfig {
            outer_container: outer_container.clone(),
            sidebar_container: id("sidebarContainer"),
            toggle_button: id("sidebarToggle"),
            thumbnail_button: id("viewThumbnail"),
            outline_button: id("viewOutline"),
            attachments_button: id("viewAttachments"),
            layers_button: id("viewLayers"),
            thumbnail_view: id("thumbnailView"),
            outline_view: id("outlineView"),
            attachments_view: id("attachmentsView"),
            layers_view: id("layersView"),
        },
        sidebar_resizer: SidebarResizerConfig {
            outer_container,
            resizer: id("sidebarResizer"),
        },
        find_bar: FindBarConfig {
            bar: id("findbar"),
            toggle_button: id("viewFind"),
            find_field: id("findInput"),
            highlight_all_checkbox: id("findHighlightAll"),
            case_sensitive_checkbox: id("findMatchCase"),
            match_diacritics_checkbox: id("findMatchDiacritics"),
            entire_word_checkbox: id("findEntireWord"),
            find_msg: id("findMsg"),
            find_results_count: id("findResultsCount"),
            find_previous_button: id("findPrevious"),
            find_next_button: id("findNext"),
        },
        password_overlay: PasswordOverlayConfig {
            dialog: id("passwordDialog"),
            label: id("passwordText"),
            input: id("password"),
            submit_button: id("passwordSubmit"),
            cancel_button: id("passwordCancel"),
        },
        progress_bar: id("loadingBar"),
        print_container: id("printContainer"),
        open_file_input: id("openFile"),
    };

    if overrides.is_empty() {
        return Ok(config);
    }
    apply_overrides(config, overrides)
}

/// Merge overrides into an existing configuration
///
/// `"a.b": v` is shorthand for `"a": {"b": v}`. Objects merge into the
/// section they name; anything else replaces the value.
pub fn apply_overrides(
    config: AppConfig,
    overrides: &Map<String, Value>,
) -> ShellResult<AppConfig> {
    let Value::Object(mut tree) = serde_json::to_value(config)? else {
        return Err(ShellError::config("configuration did not serialize to an object"));
    };

    for (key, value) in overrides {
        let (key, value) = match key.split_once('.') {
            Some((parent, child)) if !parent.is_empty() => {
                let child = child.split('.').next().unwrap_or(child);
                let mut section = Map::new();
                section.insert(child.to_string(), value.clone());
                (parent.to_string(), Value::Object(section))
            }
            _ => (key.clone(), value.clone()),
        };

        match value {
            Value::Object(fields) => {
                let slot = tree.entry(key.clone()).or_insert(Value::Null);
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(section) = slot {
                    section.extend(fields);
                }
            }
            other => {
                tree.insert(key.clone(), other);
            }
        }
        debug!("Applied config override for {key}");
    }

    serde_json::from_value(Value::Object(tree))
        .map_err(|e| ShellError::config(format!("bad override: {e}")))
}
