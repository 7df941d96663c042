//! Route template compilation.
//!
//! # Template Syntax
//! - Literal characters match themselves (regex metacharacters are escaped)
//! - `:name` captures a segment, by default one or more characters other
//!   than `/ ? & # .`
//! - A per-name sub-pattern overrides the default segment pattern
//! - `?` is always a literal question mark, never an "optional" marker
//!
//! # Design Decisions
//! - Anchored at both ends: templates match whole paths only
//! - Placeholders compile to internally named groups, so capture groups
//!   inside custom sub-patterns cannot shift placeholder positions
//! - A pre-built [`Regex`] is used as-is, with its groups exposed positionally

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::error::RouteError;

/// Segment pattern used for placeholders without a custom sub-pattern.
pub const DEFAULT_SEGMENT: &str = r"[^/?&#.]+";

/// Compiled size limit for route regexes.
pub const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// Compile `source` under [`MAX_REGEX_SIZE`]. Sub-patterns come from
/// configuration, so an oversized one fails here instead of eating memory.
pub fn build_regex(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source)
        .size_limit(MAX_REGEX_SIZE)
        .dfa_size_limit(MAX_REGEX_SIZE)
        .build()
}

/// Placeholder name → sub-pattern.
pub type Patterns = HashMap<String, String>;

/// A route template, either a path string or a pre-built matcher.
#[derive(Debug, Clone)]
pub enum Template {
    Path(String),
    Regex(Regex),
}

impl From<&str> for Template {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for Template {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Regex> for Template {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    param_names: Vec<String>,
    /// Capture group indices reported by [`PathPattern::captures`].
    slots: Vec<usize>,
}

impl PathPattern {
    /// Compile a template string using `patterns` for custom placeholders.
    pub fn compile(template: &str, patterns: &Patterns) -> Result<Self, RouteError> {
        let (source, param_names) = translate(template, patterns);
        let regex = build_regex(&source).map_err(|source| RouteError::InvalidPattern {
            template: template.to_string(),
            source,
        })?;
        let slots = (0..param_names.len())
            .filter_map(|i| {
                let group = group_name(i);
                regex
                    .capture_names()
                    .position(|name| name == Some(group.as_str()))
            })
            .collect();

        Ok(Self {
            source: template.to_string(),
            regex,
            param_names,
            slots,
        })
    }

    /// Wrap a pre-built matcher. It declares no placeholder names.
    pub fn from_regex(regex: Regex) -> Self {
        let slots = (1..regex.captures_len()).collect();
        Self {
            source: regex.as_str().to_string(),
            regex,
            param_names: Vec::new(),
            slots,
        }
    }

    pub fn compile_template(template: Template, patterns: &Patterns) -> Result<Self, RouteError> {
        match template {
            Template::Path(path) => Self::compile(&path, patterns),
            Template::Regex(regex) => Ok(Self::from_regex(regex)),
        }
    }

    /// The declared template (or the matcher source for pre-built matchers).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Captured values in placeholder order, or `None` if `path` doesn't match.
    pub fn captures(&self, path: &str) -> Option<Vec<Option<String>>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.slots
                .iter()
                .map(|&slot| caps.get(slot).map(|m| m.as_str().to_string()))
                .collect(),
        )
    }
}

fn group_name(index: usize) -> String {
    format!("p{}", index)
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn translate(template: &str, patterns: &Patterns) -> (String, Vec<String>) {
    let mut regex = String::from("^");
    let mut names = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek().copied().is_some_and(is_word) {
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if !is_word(next) {
                    break;
                }
                name.push(next);
                chars.next();
            }
            let segment = patterns
                .get(&name)
                .map(String::as_str)
                .unwrap_or(DEFAULT_SEGMENT);
            regex.push_str(&format!("(?P<{}>{})", group_name(names.len()), segment));
            names.push(name);
        } else {
            let mut buf = [0u8; 4];
            regex.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }

    regex.push('$');
    (regex, names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str) -> PathPattern {
        PathPattern::compile(template, &Patterns::new()).unwrap()
    }

    #[test]
    fn test_literal_template_matches_exactly() {
        let pattern = compile("/wiki/index.html");
        assert!(pattern.is_match("/wiki/index.html"));
        assert!(!pattern.is_match("/wiki/indexxhtml"));
        assert!(!pattern.is_match("/wiki/index.html/"));
        assert!(!pattern.is_match("/prefix/wiki/index.html"));
        assert!(pattern.param_names().is_empty());
    }

    #[test]
    fn test_placeholder_capture() {
        let pattern = compile("/wiki/:path/show");
        assert_eq!(pattern.param_names(), ["path"]);
        assert_eq!(
            pattern.captures("/wiki/Home/show"),
            Some(vec![Some("Home".to_string())])
        );
        // Empty segment cannot satisfy the placeholder
        assert_eq!(pattern.captures("/wiki//show"), None);
    }

    #[test]
    fn test_default_segment_excludes_separators() {
        let pattern = compile("/:name");
        for path in ["/a/b", "/a.txt", "/a&b", "/a#b", "/a?b"] {
            assert!(!pattern.is_match(path), "{} should not match", path);
        }
        assert!(pattern.is_match("/plain-name_1"));
    }

    #[test]
    fn test_multiple_placeholders_in_order() {
        let pattern = compile("/:user/:repo/:action");
        assert_eq!(pattern.param_names(), ["user", "repo", "action"]);
        assert_eq!(
            pattern.captures("/alice/notes/edit").unwrap(),
            vec![Some("alice".into()), Some("notes".into()), Some("edit".into())]
        );
    }

    #[test]
    fn test_custom_sub_pattern() {
        let mut patterns = Patterns::new();
        patterns.insert("path".into(), ".*".into());
        let pattern = PathPattern::compile("/:path/edit", &patterns).unwrap();
        assert_eq!(
            pattern.captures("/docs/setup.md/edit").unwrap(),
            vec![Some("docs/setup.md".into())]
        );
    }

    #[test]
    fn test_groups_inside_custom_pattern_do_not_shift() {
        let mut patterns = Patterns::new();
        patterns.insert("file".into(), r"(\w+)\.(\w+)".into());
        let pattern = PathPattern::compile("/:file/:action", &patterns).unwrap();
        assert_eq!(
            pattern.captures("/main.rs/show").unwrap(),
            vec![Some("main.rs".into()), Some("show".into())]
        );
    }

    #[test]
    fn test_question_mark_is_literal() {
        let pattern = compile("/search?");
        assert!(pattern.is_match("/search?"));
        assert!(!pattern.is_match("/search"));
        assert!(!pattern.is_match("/searc"));

        let pattern = compile("/:name?");
        assert!(pattern.is_match("/x?"));
        assert!(!pattern.is_match("/x"));
    }

    #[test]
    fn test_colon_without_name_is_literal() {
        let pattern = compile("/a:/b");
        assert!(pattern.is_match("/a:/b"));
        assert!(pattern.param_names().is_empty());
    }

    #[test]
    fn test_prebuilt_regex_exposes_groups() {
        let pattern = PathPattern::from_regex(Regex::new(r"^/files/(\d+)-(\w+)$").unwrap());
        assert!(pattern.param_names().is_empty());
        assert_eq!(pattern.source(), r"^/files/(\d+)-(\w+)$");
        assert_eq!(
            pattern.captures("/files/12-abc").unwrap(),
            vec![Some("12".into()), Some("abc".into())]
        );
    }

    #[test]
    fn test_round_trip_substitution() {
        let template = "/wiki/:page/rev/:sha";
        let pattern = compile(template);
        let path = template.replace(":page", "Getting-Started").replace(":sha", "a1b2c3");
        assert_eq!(
            pattern.captures(&path).unwrap(),
            vec![Some("Getting-Started".into()), Some("a1b2c3".into())]
        );
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let a = compile("/x/:y.z");
        let b = compile("/x/:y.z");
        assert_eq!(a.regex().as_str(), b.regex().as_str());
    }

    #[test]
    fn test_invalid_sub_pattern() {
        let mut patterns = Patterns::new();
        patterns.insert("bad".into(), "(".into());
        let err = PathPattern::compile("/:bad", &patterns).unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
    }

    #[test]
    fn test_oversized_sub_pattern_is_rejected() {
        let mut patterns = Patterns::new();
        patterns.insert("id".into(), r"(?:\w{1000}){1000}".into());
        match PathPattern::compile("/x/:id", &patterns) {
            Err(RouteError::InvalidPattern { template, source }) => {
                assert_eq!(template, "/x/:id");
                assert!(matches!(source, regex::Error::CompiledTooBig(_)));
            }
            Ok(pattern) => panic!("compiled {}", pattern.source()),
        }
    }
}
