//! Per-method route table.
//!
//! # Responsibilities
//! - Compile templates and bind them to handlers, per HTTP method
//! - Look up the first matching route, optionally resuming after a given entry
//! - Render the table for debugging
//!
//! # Design Decisions
//! - Registration order is match order: first match wins
//! - `METHOD declared-path` is the binding key; re-registering it replaces
//!   the handler in place and keeps the original pattern and position
//! - `get` also binds `HEAD`
//! - Built once during startup, then frozen inside the application

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::dispatch::{Flow, RequestContext};
use crate::error::RouteError;
use crate::routing::pattern::{PathPattern, Patterns, Template};

/// A route handler.
pub type Handler = Arc<dyn Fn(&mut RequestContext) -> Flow + Send + Sync>;

/// A registered route.
#[derive(Clone)]
pub struct RouteEntry {
    pattern: PathPattern,
    handler: Handler,
}

impl RouteEntry {
    /// The template string this route was declared with.
    pub fn declared_path(&self) -> &str {
        self.pattern.source()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn param_names(&self) -> &[String] {
        self.pattern.param_names()
    }

    /// Run the bound handler.
    pub fn call(&self, ctx: &mut RequestContext) -> Flow {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("declared_path", &self.declared_path())
            .field("param_names", &self.param_names())
            .finish_non_exhaustive()
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// Position of the entry in its method's list.
    pub index: usize,
    pub entry: &'a RouteEntry,
    pub captures: Vec<Option<String>>,
}

/// Routes keyed by method name.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, Vec<RouteEntry>>,
    patterns: Patterns,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge table-wide placeholder sub-patterns used by later registrations.
    pub fn set_patterns<I, K, V>(&mut self, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.patterns
            .extend(patterns.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn patterns(&self) -> &Patterns {
        &self.patterns
    }

    /// Bind `handler` to every method × template pair.
    ///
    /// `patterns` is merged over the table-wide sub-patterns for this call only.
    pub fn register<I, T, F>(
        &mut self,
        methods: &[Method],
        templates: I,
        patterns: &Patterns,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        let mut merged = self.patterns.clone();
        merged.extend(patterns.iter().map(|(k, v)| (k.clone(), v.clone())));
        let handler: Handler = Arc::new(handler);

        for template in templates {
            let pattern = PathPattern::compile_template(template.into(), &merged)?;
            for method in methods {
                let list = self.routes.entry(method.as_str().to_string()).or_default();
                match list
                    .iter_mut()
                    .find(|entry| entry.declared_path() == pattern.source())
                {
                    Some(existing) => {
                        tracing::debug!(method = %method, path = %pattern.source(), "Replacing route handler");
                        existing.handler = Arc::clone(&handler);
                    }
                    None => list.push(RouteEntry {
                        pattern: pattern.clone(),
                        handler: Arc::clone(&handler),
                    }),
                }
            }
        }
        Ok(self)
    }

    /// `GET` (and `HEAD`) routes.
    pub fn get<I, T, F>(&mut self, templates: I, handler: F) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.get_with(templates, &Patterns::new(), handler)
    }

    pub fn get_with<I, T, F>(
        &mut self,
        templates: I,
        patterns: &Patterns,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.register(&[Method::GET, Method::HEAD], templates, patterns, handler)
    }

    pub fn put<I, T, F>(&mut self, templates: I, handler: F) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.register(&[Method::PUT], templates, &Patterns::new(), handler)
    }

    pub fn put_with<I, T, F>(
        &mut self,
        templates: I,
        patterns: &Patterns,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.register(&[Method::PUT], templates, patterns, handler)
    }

    pub fn post<I, T, F>(&mut self, templates: I, handler: F) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.register(&[Method::POST], templates, &Patterns::new(), handler)
    }

    pub fn post_with<I, T, F>(
        &mut self,
        templates: I,
        patterns: &Patterns,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.register(&[Method::POST], templates, patterns, handler)
    }

    pub fn delete<I, T, F>(&mut self, templates: I, handler: F) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.register(&[Method::DELETE], templates, &Patterns::new(), handler)
    }

    pub fn delete_with<I, T, F>(
        &mut self,
        templates: I,
        patterns: &Patterns,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.register(&[Method::DELETE], templates, patterns, handler)
    }

    pub fn head<I, T, F>(&mut self, templates: I, handler: F) -> Result<&mut Self, RouteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
        F: Fn(&mut RequestContext) -> Flow + Send + Sync + 'static,
    {
        self.register(&[Method::HEAD], templates, &Patterns::new(), handler)
    }

    /// Entries for `method`, in match order.
    pub fn routes(&self, method: &Method) -> &[RouteEntry] {
        self.routes
            .get(method.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First entry matching `path`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.match_from(method, path, 0)
    }

    /// First entry at position `start` or later matching `path`.
    pub fn match_from(&self, method: &Method, path: &str, start: usize) -> Option<RouteMatch<'_>> {
        self.routes(method)
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(index, entry)| {
                entry.pattern.captures(path).map(|captures| RouteMatch {
                    index,
                    entry,
                    captures,
                })
            })
    }

    /// Human-readable listing of every route and its compiled matcher.
    pub fn dump(&self) -> String {
        let mut out = String::from("=== ROUTES ===\n");
        for (method, entries) in &self.routes {
            out.push_str(&format!("  {}:\n", method));
            for entry in entries {
                out.push_str(&format!(
                    "    {} -> {}\n",
                    entry.declared_path(),
                    entry.pattern.regex().as_str()
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Outcome;

    fn ok(text: &'static str) -> impl Fn(&mut RequestContext) -> Flow + Send + Sync + 'static {
        move |_| Ok(Outcome::from(text))
    }

    #[test]
    fn test_get_also_binds_head() {
        let mut table = RouteTable::new();
        table.get(["/page"], ok("page")).unwrap();
        assert_eq!(table.routes(&Method::GET).len(), 1);
        assert_eq!(table.routes(&Method::HEAD).len(), 1);
        assert!(table.routes(&Method::POST).is_empty());
    }

    #[test]
    fn test_reregistering_replaces_without_growing() {
        let mut table = RouteTable::new();
        table.get(["/a", "/b"], ok("first")).unwrap();
        table.get(["/a"], ok("second")).unwrap();
        let routes = table.routes(&Method::GET);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].declared_path(), "/a");
        assert_eq!(routes[1].declared_path(), "/b");
    }

    #[test]
    fn test_first_registered_wins() {
        let mut table = RouteTable::new();
        table.get(["/a", "/:x"], ok("x")).unwrap();
        let found = table.match_route(&Method::GET, "/a").unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.entry.declared_path(), "/a");

        let found = table.match_route(&Method::GET, "/zzz").unwrap();
        assert_eq!(found.entry.declared_path(), "/:x");
        assert_eq!(found.captures, vec![Some("zzz".to_string())]);
    }

    #[test]
    fn test_match_from_resumes_after_entry() {
        let mut table = RouteTable::new();
        table.get(["/a", "/:x", "/b"], ok("x")).unwrap();
        let first = table.match_route(&Method::GET, "/a").unwrap();
        let next = table.match_from(&Method::GET, "/a", first.index + 1).unwrap();
        assert_eq!(next.entry.declared_path(), "/:x");
        assert!(table.match_from(&Method::GET, "/a", next.index + 1).is_none());
    }

    #[test]
    fn test_per_call_patterns_merge_over_table_patterns() {
        let mut table = RouteTable::new();
        table.set_patterns([("path", "[a-z]+")]);
        table.get(["/strict/:path"], ok("strict")).unwrap();
        let mut loose = Patterns::new();
        loose.insert("path".into(), ".+".into());
        table.get_with(["/loose/:path"], &loose, ok("loose")).unwrap();

        assert!(table.match_route(&Method::GET, "/strict/abc").is_some());
        assert!(table.match_route(&Method::GET, "/strict/ABC").is_none());
        assert!(table.match_route(&Method::GET, "/loose/A/B.c").is_some());
    }

    #[test]
    fn test_verbs_are_separate() {
        let mut table = RouteTable::new();
        table
            .put(["/x"], ok("put"))
            .unwrap()
            .post(["/x"], ok("post"))
            .unwrap()
            .delete(["/x"], ok("delete"))
            .unwrap()
            .head(["/only-head"], ok("head"))
            .unwrap();
        assert!(table.match_route(&Method::PUT, "/x").is_some());
        assert!(table.match_route(&Method::POST, "/x").is_some());
        assert!(table.match_route(&Method::DELETE, "/x").is_some());
        assert!(table.match_route(&Method::GET, "/x").is_none());
        assert!(table.match_route(&Method::HEAD, "/only-head").is_some());
        assert!(table.match_route(&Method::GET, "/only-head").is_none());
    }

    #[test]
    fn test_dump_lists_routes() {
        let mut table = RouteTable::new();
        table.get(["/:page"], ok("page")).unwrap();
        let dump = table.dump();
        assert!(dump.starts_with("=== ROUTES ===\n"));
        assert!(dump.contains("  GET:\n"));
        assert!(dump.contains("    /:page -> ^/(?P<p0>[^/?&#.]+)$"));
    }
}
