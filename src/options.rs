//! Application options: defaults, user overrides and compatibility overrides

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ShellError, ShellResult};

/// Bitmask describing where an option is consumed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OptionKind(u8);

impl OptionKind {
    pub const VIEWER: Self = Self(0x02);
    pub const API: Self = Self(0x04);
    pub const WORKER: Self = Self(0x08);
    pub const PREFERENCE: Self = Self(0x80);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// Value of an application option
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Null,
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Float(value) => Some(*value),
            OptionValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, OptionValue::Null)
    }

    /// Preferences may only hold booleans, strings and integers
    fn is_valid_preference(&self) -> bool {
        matches!(
            self,
            OptionValue::Bool(_) | OptionValue::String(_) | OptionValue::Int(_)
        )
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::String(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DefaultOption {
    pub value: OptionValue,
    pub kind: OptionKind,
}

impl DefaultOption {
    fn new(value: impl Into<OptionValue>, kind: OptionKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }
}

const VIEWER_PREF: OptionKind = OptionKind::VIEWER.union(OptionKind::PREFERENCE);

static DEFAULT_OPTIONS: LazyLock<BTreeMap<String, DefaultOption>> = LazyLock::new(|| {
    [
        ("annotationMode", DefaultOption::new(2i64, VIEWER_PREF)),
        ("cursorToolOnLoad", DefaultOption::new(0i64, VIEWER_PREF)),
        ("defaultUrl", DefaultOption::new("", OptionKind::VIEWER)),
        ("defaultZoomValue", DefaultOption::new("", VIEWER_PREF)),
        ("disableHistory", DefaultOption::new(false, OptionKind::VIEWER)),
        ("disablePageLabels", DefaultOption::new(false, VIEWER_PREF)),
        (
            "docStyle",
            DefaultOption::new(OptionValue::Null, OptionKind::VIEWER),
        ),
        ("enablePermissions", DefaultOption::new(false, VIEWER_PREF)),
        ("enablePrintAutoRotate", DefaultOption::new(true, VIEWER_PREF)),
        ("externalLinkTarget", DefaultOption::new(0i64, VIEWER_PREF)),
        ("imageLayerMode", DefaultOption::new(0i64, VIEWER_PREF)),
        (
            "isOffscreenCanvasSupported",
            DefaultOption::new(true, OptionKind::VIEWER.union(OptionKind::API)),
        ),
        ("locale", DefaultOption::new("en-US", OptionKind::VIEWER)),
        (
            "maxCanvasPixels",
            DefaultOption::new(16_777_216i64, OptionKind::VIEWER),
        ),
        ("maxImageSize", DefaultOption::new(-1i64, OptionKind::API)),
        ("printResolution", DefaultOption::new(150i64, OptionKind::VIEWER)),
        ("scrollModeOnLoad", DefaultOption::new(-1i64, VIEWER_PREF)),
        ("sidebarViewOnLoad", DefaultOption::new(-1i64, VIEWER_PREF)),
        ("spreadModeOnLoad", DefaultOption::new(-1i64, VIEWER_PREF)),
        ("textLayerMode", DefaultOption::new(1i64, VIEWER_PREF)),
        (
            "workerSrc",
            DefaultOption::new("../build/pdf.worker.js", OptionKind::WORKER),
        ),
    ]
    .into_iter()
    .map(|(name, option)| (name.to_string(), option))
    .collect()
});

/// Per-instance option store
///
/// Lookup order is user option, then compatibility override, then default.
#[derive(Clone, Debug)]
pub struct AppOptions {
    defaults: BTreeMap<String, DefaultOption>,
    compatibility: HashMap<String, OptionValue>,
    user_options: BTreeMap<String, OptionValue>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AppOptions {
    pub fn new() -> Self {
        Self::with_defaults(DEFAULT_OPTIONS.clone())
    }

    pub fn with_defaults(defaults: BTreeMap<String, DefaultOption>) -> Self {
        Self {
            defaults,
            compatibility: HashMap::new(),
            user_options: BTreeMap::new(),
        }
    }

    /// Environment-specific overrides of default values
    pub fn with_compatibility(mut self, params: HashMap<String, OptionValue>) -> Self {
        self.compatibility = params;
        self
    }

    pub fn get(&self, name: &str) -> Option<OptionValue> {
        if let Some(value) = self.user_options.get(name) {
            return Some(value.clone());
        }
        self.defaults.get(name).map(|default| {
            self.compatibility_value(name)
                .unwrap_or(&default.value)
                .clone()
        })
    }

    /// A null compatibility override falls through to the default
    fn compatibility_value(&self, name: &str) -> Option<&OptionValue> {
        self.compatibility
            .get(name)
            .filter(|value| **value != OptionValue::Null)
    }

    /// Every known option, optionally restricted to `kind`
    ///
    /// With `kind == PREFERENCE` only default values are returned, and a
    /// default of a non-preference type is an error.
    pub fn get_all(&self, kind: Option<OptionKind>) -> ShellResult<BTreeMap<String, OptionValue>> {
        let mut options = BTreeMap::new();
        for (name, default) in &self.defaults {
            if let Some(kind) = kind {
                if !kind.intersects(default.kind) {
                    continue;
                }
                if kind == OptionKind::PREFERENCE {
                    if !default.value.is_valid_preference() {
                        return Err(ShellError::InvalidPreference { name: name.clone() });
                    }
                    options.insert(name.clone(), default.value.clone());
                    continue;
                }
            }
            let value = self
                .user_options
                .get(name)
                .or_else(|| self.compatibility_value(name))
                .unwrap_or(&default.value);
            options.insert(name.clone(), value.clone());
        }
        Ok(options)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        let name = name.into();
        let value = value.into();
        debug!("Setting option {name} = {value:?}");
        self.user_options.insert(name, value);
    }

    pub fn set_all<I, K>(&mut self, options: I)
    where
        I: IntoIterator<Item = (K, OptionValue)>,
        K: Into<String>,
    {
        for (name, value) in options {
            self.set(name, value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        self.user_options.remove(name)
    }

    pub fn has_user_options(&self) -> bool {
        !self.user_options.is_empty()
    }

    pub fn user_options(&self) -> &BTreeMap<String, OptionValue> {
        &self.user_options
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_int())
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(str::to_string))
    }
}
