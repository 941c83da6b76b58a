//! Localization seam and the fallback strings used without a real service

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Layout direction reported by the localization service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn is_rtl(self) -> bool {
        self == TextDirection::Rtl
    }

    pub fn parse(dir: &str) -> Self {
        if dir.eq_ignore_ascii_case("rtl") {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }
}

pub type L10nArgs<'a> = HashMap<&'a str, String>;

/// Localization service consumed by the shell
pub trait Localization {
    fn language(&self) -> String;

    fn direction(&self) -> TextDirection;

    /// Look up `key`, interpolating `args`; `fallback` overrides the built-in default
    fn get(&self, key: &str, args: Option<&L10nArgs<'_>>, fallback: Option<&str>) -> String;
}

/// No-op localization: English fallback strings, left-to-right
#[derive(Debug, Clone, Copy, Default)]
pub struct NullL10n;

impl Localization for NullL10n {
    fn language(&self) -> String {
        "en-us".to_string()
    }

    fn direction(&self) -> TextDirection {
        TextDirection::Ltr
    }

    fn get(&self, key: &str, args: Option<&L10nArgs<'_>>, fallback: Option<&str>) -> String {
        let text = match fallback {
            Some(text) => text,
            None => l10n_fallback(key, args),
        };
        format_l10n_value(text, args)
    }
}

static DEFAULT_L10N_STRINGS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("of_pages", "of {{pagesCount}}"),
            ("page_of_pages", "({{pageNumber}} of {{pagesCount}})"),
            ("document_properties_kb", "{{size_kb}} KB ({{size_b}} bytes)"),
            ("document_properties_mb", "{{size_mb}} MB ({{size_b}} bytes)"),
            ("document_properties_date_string", "{{date}}, {{time}}"),
            ("document_properties_page_size_unit_inches", "in"),
            ("document_properties_page_size_unit_millimeters", "mm"),
            ("document_properties_page_size_orientation_portrait", "portrait"),
            ("document_properties_page_size_orientation_landscape", "landscape"),
            ("document_properties_page_size_name_a3", "A3"),
            ("document_properties_page_size_name_a4", "A4"),
            ("document_properties_page_size_name_letter", "Letter"),
            ("document_properties_page_size_name_legal", "Legal"),
            (
                "document_properties_page_size_dimension_string",
                "{{width}} × {{height}} {{unit}} ({{orientation}})",
            ),
            (
                "document_properties_page_size_dimension_name_string",
                "{{width}} × {{height}} {{unit}} ({{name}}, {{orientation}})",
            ),
            ("document_properties_linearized_yes", "Yes"),
            ("document_properties_linearized_no", "No"),
            ("additional_layers", "Additional Layers"),
            ("page_landmark", "Page {{page}}"),
            ("thumb_page_title", "Page {{page}}"),
            ("thumb_page_canvas", "Thumbnail of Page {{page}}"),
            (
                "find_reached_top",
                "Reached top of document, continued from bottom",
            ),
            (
                "find_reached_bottom",
                "Reached end of document, continued from top",
            ),
            ("find_match_count[one]", "{{current}} of {{total}} match"),
            ("find_match_count[other]", "{{current}} of {{total}} matches"),
            ("find_match_count_limit[one]", "More than {{limit}} match"),
            ("find_match_count_limit[other]", "More than {{limit}} matches"),
            ("find_not_found", "Phrase not found"),
            ("page_scale_width", "Page Width"),
            ("page_scale_fit", "Page Fit"),
            ("page_scale_auto", "Automatic Zoom"),
            ("page_scale_actual", "Actual Size"),
            ("page_scale_percent", "{{scale}}%"),
            ("loading_error", "An error occurred while loading the PDF."),
            ("invalid_file_error", "Invalid or corrupted PDF file."),
            ("missing_file_error", "Missing PDF file."),
            ("unexpected_response_error", "Unexpected server response."),
            ("rendering_error", "An error occurred while rendering the page."),
            ("annotation_date_string", "{{date}}, {{time}}"),
            (
                "printing_not_supported",
                "Warning: Printing is not fully supported by this browser.",
            ),
            (
                "printing_not_ready",
                "Warning: The PDF is not fully loaded for printing.",
            ),
            (
                "web_fonts_disabled",
                "Web fonts are disabled: unable to use embedded PDF fonts.",
            ),
            ("print_progress_percent", "{{progress}}%"),
        ])
    });

static L10N_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("Failed to compile l10n argument regex")
});

/// Incompletely specified language codes and the locale they stand for
const PARTIAL_LANG_CODES: &[(&str, &str)] = &[
    ("en", "en-US"),
    ("es", "es-ES"),
    ("fy", "fy-NL"),
    ("ga", "ga-IE"),
    ("gu", "gu-IN"),
    ("hi", "hi-IN"),
    ("hy", "hy-AM"),
    ("nb", "nb-NO"),
    ("ne", "ne-NP"),
    ("nn", "nn-NO"),
    ("pa", "pa-IN"),
    ("pt", "pt-PT"),
    ("sv", "sv-SE"),
    ("zh", "zh-CN"),
];

/// Built-in English string for `key`, resolving plural keys from `args`
pub fn l10n_fallback(key: &str, args: Option<&L10nArgs<'_>>) -> &'static str {
    let plural = |arg: &str| {
        let is_one = args
            .and_then(|args| args.get(arg))
            .is_some_and(|value| value == "1");
        if is_one { "one" } else { "other" }
    };
    let resolved = match key {
        "find_match_count" => format!("find_match_count[{}]", plural("total")),
        "find_match_count_limit" => format!("find_match_count_limit[{}]", plural("limit")),
        _ => key.to_string(),
    };
    DEFAULT_L10N_STRINGS
        .get(resolved.as_str())
        .copied()
        .unwrap_or("")
}

/// Expand a bare language code such as `zh` to its full locale
pub fn fixup_lang_code(lang_code: &str) -> String {
    let lower = lang_code.to_lowercase();
    PARTIAL_LANG_CODES
        .iter()
        .find(|(partial, _)| *partial == lower)
        .map_or_else(|| lang_code.to_string(), |(_, full)| (*full).to_string())
}

/// Replace `{{name}}` placeholders; unknown names are left untouched
pub fn format_l10n_value(text: &str, args: Option<&L10nArgs<'_>>) -> String {
    let Some(args) = args else {
        return text.to_string();
    };
    L10N_ARG_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            match args.get(name) {
                Some(value) => value.clone(),
                None => format!("{{{{{name}}}}}"),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_keys_resolve_from_args() {
        let one = L10nArgs::from([("total", "1".to_string())]);
        let many = L10nArgs::from([("total", "4".to_string())]);

        assert_eq!(
            l10n_fallback("find_match_count", Some(&one)),
            "{{current}} of {{total}} match"
        );
        assert_eq!(
            l10n_fallback("find_match_count", Some(&many)),
            "{{current}} of {{total}} matches"
        );
        assert_eq!(
            l10n_fallback("find_match_count_limit", None),
            "More than {{limit}} matches"
        );
        assert_eq!(l10n_fallback("no_such_key", None), "");
    }

    #[test]
    fn format_keeps_unknown_placeholders() {
        let args = L10nArgs::from([("page", "3".to_string())]);
        assert_eq!(
            format_l10n_value("Page {{ page }} of {{total}}", Some(&args)),
            "Page 3 of {{total}}"
        );
        assert_eq!(format_l10n_value("{{page}}", None), "{{page}}");
    }

    #[test]
    fn lang_code_fixup() {
        assert_eq!(fixup_lang_code("ZH"), "zh-CN");
        assert_eq!(fixup_lang_code("pt"), "pt-PT");
        assert_eq!(fixup_lang_code("de-DE"), "de-DE");
    }

    #[test]
    fn null_l10n_interpolates_fallback() {
        let l10n = NullL10n;
        let args = L10nArgs::from([
            ("current", "2".to_string()),
            ("total", "1".to_string()),
        ]);
        assert_eq!(
            l10n.get("find_match_count", Some(&args), None),
            "2 of 1 match"
        );
        assert_eq!(l10n.get("custom", None, Some("Hello")), "Hello");
        assert_eq!(l10n.direction(), TextDirection::Ltr);
        assert!(TextDirection::parse("RTL").is_rtl());
    }
}
