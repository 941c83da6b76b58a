//! Selection helpers for the text layer
//!
//! A trailing end-of-content node is moved under the pointer while a drag
//! selection is in progress so browsers do not jump the selection to the
//! end of the page.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

pub const END_OF_CONTENT_CLASS: &str = "endOfContent";

/// State of the trailing end-of-content marker
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOfContent {
    /// Inline `top` style, e.g. `"37.50%"`
    pub top: Option<String>,
    pub active: bool,
    /// False when a stylesheet made the marker unselectable
    pub selectable: bool,
}

impl EndOfContent {
    pub fn new() -> Self {
        Self {
            top: None,
            active: false,
            selectable: true,
        }
    }
}

/// Where a mouse-down landed, relative to the layer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseDown {
    /// Whether the event targeted the layer element itself
    pub on_layer: bool,
    pub page_y: f64,
    /// Layer's top offset in page coordinates
    pub layer_top: f64,
    pub layer_height: f64,
}

/// Activate the marker and move it under the pointer
///
/// A click on the bare layer leaves the marker where it is.
pub fn mouse_down(marker: &mut EndOfContent, event: MouseDown) {
    if !event.on_layer && marker.selectable && event.layer_height > 0.0 {
        let divisor = event.layer_height;
        let top = ((event.page_y - event.layer_top) / divisor).max(0.0);
        marker.top = Some(format!("{:.2}%", top * 100.0));
    }
    marker.active = true;
}

pub fn mouse_up(marker: &mut EndOfContent) {
    marker.top = None;
    marker.active = false;
}

/// Clipboard text for a copy; `None` when copying is disallowed
///
/// The copy event itself is always consumed by the caller.
pub fn copy_text(selection: &str, enforce_permissions: bool) -> Option<String> {
    if enforce_permissions {
        return None;
    }
    Some(normalize_unicode(selection).replace('\0', ""))
}

/// Compatibility composition (NFKC), folding ligatures and full-width forms
pub fn normalize_unicode(text: &str) -> String {
    text.nfkc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(on_layer: bool, page_y: f64) -> MouseDown {
        MouseDown {
            on_layer,
            page_y,
            layer_top: 100.0,
            layer_height: 400.0,
        }
    }

    #[test]
    fn mouse_down_places_marker_in_percent() {
        let mut marker = EndOfContent::new();
        mouse_down(&mut marker, down(false, 250.0));
        assert_eq!(marker.top.as_deref(), Some("37.50%"));
        assert!(marker.active);
    }

    #[test]
    fn marker_never_goes_above_layer() {
        let mut marker = EndOfContent::new();
        mouse_down(&mut marker, down(false, 20.0));
        assert_eq!(marker.top.as_deref(), Some("0.00%"));
    }

    #[test]
    fn click_on_layer_itself_activates_without_moving() {
        let mut marker = EndOfContent::new();
        mouse_down(&mut marker, down(true, 250.0));
        assert_eq!(marker.top, None);
        assert!(marker.active);
    }

    #[test]
    fn unselectable_marker_only_activates() {
        let mut marker = EndOfContent {
            selectable: false,
            ..EndOfContent::new()
        };
        mouse_down(&mut marker, down(false, 250.0));
        assert_eq!(marker.top, None);
        assert!(marker.active);

        mouse_up(&mut marker);
        assert!(!marker.active);
    }

    #[test]
    fn copy_normalizes_and_strips_nul() {
        assert_eq!(
            copy_text("\u{FB01}nd\0 \u{FF21}", false).as_deref(),
            Some("find A")
        );
        assert_eq!(copy_text("secret", true), None);
    }
}
