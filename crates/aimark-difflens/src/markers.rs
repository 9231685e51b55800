//! Marker registry: which comment syntax delimits AI-generated regions for
//! which file extensions.

use std::collections::HashMap;
use std::sync::LazyLock;

use aimark_core::LanguageFamily;
use regex::Regex;

/// Start and end marker patterns for one language family.
///
/// Patterns are case-insensitive and searched anywhere in the trimmed line.
#[derive(Debug)]
pub struct MarkerPair {
    /// Opens an AI-generated region.
    pub start: Regex,
    /// Closes an AI-generated region.
    pub end: Regex,
}

impl MarkerPair {
    fn compile(start: &str, end: &str) -> Self {
        // Patterns are fixed literals below; failure here is a programming error.
        Self {
            start: Regex::new(start).expect("valid start marker pattern"),
            end: Regex::new(end).expect("valid end marker pattern"),
        }
    }
}

static C_LIKE: LazyLock<MarkerPair> = LazyLock::new(|| {
    MarkerPair::compile(r"(?i)//\s*AI-generated start", r"(?i)//\s*AI-generated end")
});

static SCRIPT_LIKE: LazyLock<MarkerPair> = LazyLock::new(|| {
    MarkerPair::compile(r"(?i)#\s*AI-generated start", r"(?i)#\s*AI-generated end")
});

static MARKUP: LazyLock<MarkerPair> = LazyLock::new(|| {
    MarkerPair::compile(
        r"(?i)<!--\s*AI-generated start\s*-->",
        r"(?i)<!--\s*AI-generated end\s*-->",
    )
});

static STYLE_SHEET: LazyLock<MarkerPair> = LazyLock::new(|| {
    MarkerPair::compile(
        r"(?i)/\*\s*AI-generated start\s*\*/",
        r"(?i)/\*\s*AI-generated end\s*\*/",
    )
});

/// Marker pair for `family`.
///
/// # Examples
///
/// ```
/// use aimark_core::LanguageFamily;
/// use aimark_difflens::markers::markers_for;
///
/// let pair = markers_for(LanguageFamily::ScriptLike);
/// assert!(pair.start.is_match("# ai-generated START"));
/// assert!(!pair.start.is_match("// AI-generated start"));
/// ```
pub fn markers_for(family: LanguageFamily) -> &'static MarkerPair {
    match family {
        LanguageFamily::CLike => &C_LIKE,
        LanguageFamily::ScriptLike => &SCRIPT_LIKE,
        LanguageFamily::Markup => &MARKUP,
        LanguageFamily::StyleSheet => &STYLE_SHEET,
    }
}

/// Family for a file extension using the built-in table.
///
/// Unknown or absent extensions fall back to [`LanguageFamily::CLike`].
///
/// # Examples
///
/// ```
/// use aimark_core::LanguageFamily;
/// use aimark_difflens::markers::family_for;
///
/// assert_eq!(family_for(Some("PY")), LanguageFamily::ScriptLike);
/// assert_eq!(family_for(Some("scss")), LanguageFamily::StyleSheet);
/// assert_eq!(family_for(Some("unknown")), LanguageFamily::CLike);
/// assert_eq!(family_for(None), LanguageFamily::CLike);
/// ```
pub fn family_for(extension: Option<&str>) -> LanguageFamily {
    let Some(ext) = extension else {
        return LanguageFamily::default();
    };
    match ext.to_ascii_lowercase().as_str() {
        "js" | "jsx" | "mjs" | "ts" | "tsx" | "java" | "c" | "h" | "cpp" | "cc" | "hpp"
        | "cs" | "go" | "rs" | "kt" | "swift" | "php" | "scala" | "dart" => LanguageFamily::CLike,
        "py" | "rb" | "sh" | "bash" | "zsh" | "pl" | "r" | "yaml" | "yml" | "toml" | "ps1" => {
            LanguageFamily::ScriptLike
        }
        "html" | "htm" | "xml" | "xhtml" | "svg" => LanguageFamily::Markup,
        "css" | "scss" | "less" => LanguageFamily::StyleSheet,
        _ => LanguageFamily::default(),
    }
}

/// Lowercased extension of the last path component.
///
/// Everything after the final `.` counts, so dotfiles such as `.gitignore`
/// have an extension. A name without a `.`, or ending in one, has none.
///
/// # Examples
///
/// ```
/// use aimark_difflens::markers::extension_of;
///
/// assert_eq!(extension_of("src/App.TSX").as_deref(), Some("tsx"));
/// assert_eq!(extension_of("pkg.v2/Makefile"), None);
/// assert_eq!(extension_of(".gitignore").as_deref(), Some("gitignore"));
/// ```
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Extension lookup with configurable overrides on top of [`family_for`].
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use aimark_core::LanguageFamily;
/// use aimark_difflens::markers::MarkerRegistry;
///
/// let registry = MarkerRegistry::with_overrides(HashMap::from([
///     ("tf".to_string(), LanguageFamily::ScriptLike),
/// ]));
/// assert_eq!(registry.family_for_path("infra/main.tf"), LanguageFamily::ScriptLike);
/// assert_eq!(registry.family_for_path("web/index.html"), LanguageFamily::Markup);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    overrides: HashMap<String, LanguageFamily>,
}

impl MarkerRegistry {
    /// Registry with only the built-in table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose `overrides` win over the built-in table.
    pub fn with_overrides(overrides: HashMap<String, LanguageFamily>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(ext, family)| (ext.trim_start_matches('.').to_ascii_lowercase(), family))
            .collect();
        Self { overrides }
    }

    /// Family for an extension, overrides first.
    pub fn family_for(&self, extension: Option<&str>) -> LanguageFamily {
        extension
            .and_then(|ext| self.overrides.get(&ext.to_ascii_lowercase()).copied())
            .unwrap_or_else(|| family_for(extension))
    }

    /// Family for a file path.
    pub fn family_for_path(&self, path: &str) -> LanguageFamily {
        self.family_for(extension_of(path).as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_each_family() {
        for ext in ["js", "java", "c", "cpp", "cs", "ts"] {
            assert_eq!(family_for(Some(ext)), LanguageFamily::CLike, "{ext}");
        }
        for ext in ["py", "rb", "sh"] {
            assert_eq!(family_for(Some(ext)), LanguageFamily::ScriptLike, "{ext}");
        }
        for ext in ["html", "xml", "xhtml"] {
            assert_eq!(family_for(Some(ext)), LanguageFamily::Markup, "{ext}");
        }
        for ext in ["css", "scss", "less"] {
            assert_eq!(family_for(Some(ext)), LanguageFamily::StyleSheet, "{ext}");
        }
    }

    #[test]
    fn unknown_extension_defaults_to_c_like() {
        assert_eq!(family_for(Some("md")), LanguageFamily::CLike);
        assert_eq!(family_for(Some("")), LanguageFamily::CLike);
        assert_eq!(family_for(None), LanguageFamily::CLike);
    }

    #[test]
    fn c_like_markers() {
        let pair = markers_for(LanguageFamily::CLike);
        assert!(pair.start.is_match("// AI-generated start"));
        assert!(pair.start.is_match("//AI-GENERATED START"));
        assert!(pair.start.is_match("let x = 1; // ai-generated start"));
        assert!(pair.end.is_match("//   AI-generated end"));
        assert!(!pair.start.is_match("/* AI-generated start */"));
        assert!(!pair.start.is_match("# AI-generated start"));
    }

    #[test]
    fn markup_markers_need_closing_token() {
        let pair = markers_for(LanguageFamily::Markup);
        assert!(pair.start.is_match("<!-- AI-generated start -->"));
        assert!(pair.start.is_match("<!--AI-generated start-->"));
        assert!(!pair.start.is_match("<!-- AI-generated start"));
        assert!(pair.end.is_match("<!-- ai-generated end -->"));
    }

    #[test]
    fn style_sheet_markers() {
        let pair = markers_for(LanguageFamily::StyleSheet);
        assert!(pair.start.is_match("/* AI-generated start */"));
        assert!(pair.end.is_match("/*AI-generated end*/"));
        assert!(!pair.start.is_match("// AI-generated start"));
    }

    #[test]
    fn start_pattern_does_not_match_end_marker() {
        for family in [
            LanguageFamily::CLike,
            LanguageFamily::ScriptLike,
            LanguageFamily::Markup,
            LanguageFamily::StyleSheet,
        ] {
            let pair = markers_for(family);
            assert!(!pair.start.is_match("AI-generated end"));
            assert!(!pair.end.is_match("AI-generated start"));
        }
    }

    #[test]
    fn extension_of_edge_cases() {
        assert_eq!(extension_of("app.py").as_deref(), Some("py"));
        assert_eq!(extension_of("a/b/c.tar.GZ").as_deref(), Some("gz"));
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of("notes."), None);
        assert_eq!(extension_of("dir.d/README"), None);
    }

    #[test]
    fn overrides_are_case_insensitive_and_accept_leading_dot() {
        let registry = MarkerRegistry::with_overrides(HashMap::from([
            (".TF".to_string(), LanguageFamily::ScriptLike),
            ("js".to_string(), LanguageFamily::Markup),
        ]));
        assert_eq!(registry.family_for(Some("tf")), LanguageFamily::ScriptLike);
        assert_eq!(registry.family_for(Some("JS")), LanguageFamily::Markup);
        assert_eq!(registry.family_for(Some("py")), LanguageFamily::ScriptLike);
        assert_eq!(registry.family_for(None), LanguageFamily::CLike);
    }

    #[test]
    fn default_registry_matches_builtin_table() {
        let registry = MarkerRegistry::new();
        assert_eq!(registry.family_for_path("styles/site.css"), LanguageFamily::StyleSheet);
        assert_eq!(registry.family_for_path("Dockerfile"), LanguageFamily::CLike);
    }
}
