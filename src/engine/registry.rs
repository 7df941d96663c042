//! Engine registration and selection.
//!
//! # Selection
//! ```text
//! find(resource, {name?, layout?})
//!     name := name ?? metadata.output ?? metadata.engine   (unless resource is meta)
//!     candidates := engines named `name`, or every engine in discovery order
//!     keep accepts(resource) && (!layout || has_layout)
//!     → lowest priority (stable), or EngineNotAvailable
//! ```
//!
//! # Design Decisions
//! - Behavior is a trait with default methods; options live beside it
//! - Selection hands out a fresh [`EngineHandle`]; per-render state lives
//!   in the [`RenderContext`], never in the shared behavior
//! - Registrations publish a new snapshot, like the hook registry

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::engine::context::RenderContext;
use crate::error::DispatchError;
use crate::resource::Resource;

/// Priority used when none is given. Lower wins.
pub const DEFAULT_ENGINE_PRIORITY: i32 = 99;

/// Rendering behavior. Every method has a default.
pub trait Engine: Send + Sync {
    /// Whether this engine can render `resource`. Defaults to "has text".
    fn accepts(&self, resource: &dyn Resource) -> bool {
        resource.content().is_some()
    }

    /// Produce output. Defaults to the raw content.
    fn output(&self, context: &RenderContext) -> Result<String, DispatchError> {
        let resource = context.resource();
        resource
            .content()
            .map(str::to_owned)
            .ok_or_else(|| DispatchError::fault(format!("{} has no content", resource.path())))
    }

    /// Output mime type. Defaults to the resource's own.
    fn mime(&self, resource: &dyn Resource) -> String {
        resource.mime().to_string()
    }
}

/// Engine with every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEngine;

impl Engine for DefaultEngine {}

/// Registration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Output is wrapped in the page layout.
    pub layout: bool,
    /// Output may be cached.
    pub cacheable: bool,
    pub priority: i32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            layout: false,
            cacheable: false,
            priority: DEFAULT_ENGINE_PRIORITY,
        }
    }
}

/// A registered engine: name, options and behavior.
#[derive(Clone)]
pub struct EngineHandle {
    name: String,
    options: EngineOptions,
    behavior: Arc<dyn Engine>,
}

impl EngineHandle {
    pub fn new(name: impl Into<String>, options: EngineOptions, behavior: Arc<dyn Engine>) -> Self {
        Self {
            name: name.into(),
            options,
            behavior,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn has_layout(&self) -> bool {
        self.options.layout
    }

    pub fn is_cacheable(&self) -> bool {
        self.options.cacheable
    }

    pub fn priority(&self) -> i32 {
        self.options.priority
    }

    pub fn accepts(&self, resource: &dyn Resource) -> bool {
        self.behavior.accepts(resource)
    }

    pub fn mime(&self, resource: &dyn Resource) -> String {
        self.behavior.mime(resource)
    }

    /// Bind this engine to `context` and produce its output.
    pub fn render(&self, context: &mut RenderContext) -> Result<String, DispatchError> {
        context.bind_engine(self.clone());
        let _entered = context.span().clone().entered();
        tracing::debug!(engine = %self.name, "Rendering");
        self.behavior.output(context)
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Constraints for [`EngineRegistry::find`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Only consider engines with this name.
    pub name: Option<String>,
    /// Only consider engines that use the page layout.
    pub layout: bool,
}

impl FindOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            layout: false,
        }
    }
}

type Groups = Vec<(String, Vec<EngineHandle>)>;

/// Engines grouped by name, in discovery order.
pub struct EngineRegistry {
    groups: ArcSwap<Groups>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            groups: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Create and register an engine in one step.
    pub fn create<E>(&self, name: impl Into<String>, options: EngineOptions, behavior: E) -> EngineHandle
    where
        E: Engine + 'static,
    {
        let engine = EngineHandle::new(name, options, Arc::new(behavior));
        self.register(engine.clone());
        engine
    }

    pub fn register(&self, engine: EngineHandle) {
        tracing::debug!(engine = %engine.name, priority = engine.priority(), "Engine registered");
        self.groups.rcu(|current| {
            let mut next = Groups::clone(current);
            match next.iter_mut().find(|(name, _)| *name == engine.name) {
                Some((_, list)) => list.push(engine.clone()),
                None => next.push((engine.name.clone(), vec![engine.clone()])),
            }
            next
        });
    }

    /// Registered group names in discovery order.
    pub fn names(&self) -> Vec<String> {
        self.groups.load().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Every engine accepting `resource`, sorted by name.
    pub fn find_all(&self, resource: &dyn Resource) -> Vec<EngineHandle> {
        let groups = self.groups.load();
        let mut found: Vec<EngineHandle> = groups
            .iter()
            .flat_map(|(_, list)| list.iter())
            .filter(|engine| engine.accepts(resource))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Best engine for `resource`.
    pub fn find(&self, resource: &dyn Resource, options: &FindOptions) -> Result<EngineHandle, DispatchError> {
        let name = options.name.clone().or_else(|| default_name(resource));
        let groups = self.groups.load();

        let mut candidates: Vec<&EngineHandle> = match &name {
            Some(name) => groups
                .iter()
                .filter(|(group, _)| group == name)
                .flat_map(|(_, list)| list.iter())
                .collect(),
            None => groups.iter().flat_map(|(_, list)| list.iter()).collect(),
        };
        candidates.sort_by_key(|engine| engine.priority());

        candidates
            .into_iter()
            .find(|engine| engine.accepts(resource) && (!options.layout || engine.has_layout()))
            .cloned()
            .ok_or_else(|| DispatchError::EngineNotAvailable {
                engine: name.unwrap_or_else(|| "any".to_string()),
                path: resource.path().to_string(),
                mime: resource.mime().to_string(),
            })
    }

    /// Like [`EngineRegistry::find`], but `None` instead of an error.
    pub fn try_find(&self, resource: &dyn Resource, options: &FindOptions) -> Option<EngineHandle> {
        self.find(resource, options).ok()
    }
}

/// Engine requested by the resource's own metadata.
fn default_name(resource: &dyn Resource) -> Option<String> {
    if resource.is_meta() {
        return None;
    }
    let metadata = resource.metadata();
    metadata
        .get("output")
        .or_else(|| metadata.get("engine"))
        .and_then(|value| value.as_str())
        .map(str::to_owned)
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Page, Tree};

    struct Fixed {
        accepts: bool,
        text: &'static str,
    }

    impl Engine for Fixed {
        fn accepts(&self, _resource: &dyn Resource) -> bool {
            self.accepts
        }

        fn output(&self, _context: &RenderContext) -> Result<String, DispatchError> {
            Ok(self.text.to_string())
        }
    }

    fn priority(priority: i32) -> EngineOptions {
        EngineOptions {
            priority,
            ..EngineOptions::default()
        }
    }

    fn page() -> Page {
        Page::new("Home", "hello")
    }

    #[test]
    fn test_lowest_priority_wins() {
        let registry = EngineRegistry::new();
        registry.create("a", priority(5), Fixed { accepts: true, text: "a" });
        registry.create("b", priority(2), Fixed { accepts: true, text: "b" });
        assert_eq!(registry.find(&page(), &FindOptions::default()).unwrap().name(), "b");
    }

    #[test]
    fn test_non_accepting_engine_is_skipped() {
        let registry = EngineRegistry::new();
        registry.create("a", priority(5), Fixed { accepts: true, text: "a" });
        registry.create("b", priority(2), Fixed { accepts: false, text: "b" });
        assert_eq!(registry.find(&page(), &FindOptions::default()).unwrap().name(), "a");
    }

    #[test]
    fn test_none_accepting_is_not_available() {
        let registry = EngineRegistry::new();
        registry.create("a", priority(5), Fixed { accepts: false, text: "a" });
        let err = registry.find(&page(), &FindOptions::default()).unwrap_err();
        assert!(matches!(err, DispatchError::EngineNotAvailable { .. }));
        assert!(registry.try_find(&page(), &FindOptions::default()).is_none());
    }

    #[test]
    fn test_named_engine_is_strict() {
        let registry = EngineRegistry::new();
        registry.create("a", priority(5), Fixed { accepts: true, text: "a" });
        registry.create("b", priority(2), Fixed { accepts: false, text: "b" });
        let err = registry.find(&page(), &FindOptions::named("b")).unwrap_err();
        match err {
            DispatchError::EngineNotAvailable { engine, path, .. } => {
                assert_eq!(engine, "b");
                assert_eq!(path, "Home");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(registry.find(&page(), &FindOptions::named("missing")).is_err());
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let registry = EngineRegistry::new();
        registry.create("first", priority(1), Fixed { accepts: true, text: "1" });
        registry.create("second", priority(1), Fixed { accepts: true, text: "2" });
        assert_eq!(registry.find(&page(), &FindOptions::default()).unwrap().name(), "first");
    }

    #[test]
    fn test_shared_name_group() {
        let registry = EngineRegistry::new();
        registry.create("view", priority(9), Fixed { accepts: true, text: "general" });
        registry.create("view", priority(1), Fixed { accepts: true, text: "special" });
        let engine = registry.find(&page(), &FindOptions::named("view")).unwrap();
        let mut context = RenderContext::new(Arc::new(page()), Default::default());
        assert_eq!(engine.render(&mut context).unwrap(), "special");
        assert_eq!(registry.names(), vec!["view"]);
    }

    #[test]
    fn test_layout_constraint() {
        let registry = EngineRegistry::new();
        registry.create("raw", priority(1), Fixed { accepts: true, text: "raw" });
        registry.create(
            "page",
            EngineOptions { layout: true, ..priority(50) },
            Fixed { accepts: true, text: "page" },
        );
        let options = FindOptions { name: None, layout: true };
        assert_eq!(registry.find(&page(), &options).unwrap().name(), "page");
    }

    #[test]
    fn test_metadata_names_default_engine() {
        let registry = EngineRegistry::new();
        registry.create("a", priority(1), Fixed { accepts: true, text: "a" });
        registry.create("b", priority(5), Fixed { accepts: true, text: "b" });

        let wants_b = page().with_metadata("output", "b");
        assert_eq!(registry.find(&wants_b, &FindOptions::default()).unwrap().name(), "b");

        let engine_key = page().with_metadata("engine", "b");
        assert_eq!(registry.find(&engine_key, &FindOptions::default()).unwrap().name(), "b");

        // Explicit name beats metadata
        assert_eq!(registry.find(&wants_b, &FindOptions::named("a")).unwrap().name(), "a");

        // Meta resources ignore their own metadata
        let meta = page().with_metadata("output", "b").as_meta();
        assert_eq!(registry.find(&meta, &FindOptions::default()).unwrap().name(), "a");
    }

    #[test]
    fn test_find_all_sorted_by_name() {
        let registry = EngineRegistry::new();
        registry.create("zeta", priority(1), Fixed { accepts: true, text: "" });
        registry.create("alpha", priority(9), Fixed { accepts: true, text: "" });
        registry.create("mid", priority(5), Fixed { accepts: false, text: "" });
        let names: Vec<String> = registry
            .find_all(&page())
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_default_behavior() {
        let registry = EngineRegistry::new();
        let engine = registry.create("default", EngineOptions::default(), DefaultEngine);
        let text = page();
        let tree = Tree::new("docs", Vec::new());
        assert!(engine.accepts(&text));
        assert!(!engine.accepts(&tree));
        assert_eq!(engine.mime(&text), "text/plain");

        let mut context = RenderContext::new(Arc::new(text), Default::default());
        assert_eq!(engine.render(&mut context).unwrap(), "hello");
        assert_eq!(context.engine().map(EngineHandle::name), Some("default"));
        assert_eq!(engine.priority(), DEFAULT_ENGINE_PRIORITY);
        assert!(!engine.has_layout() && !engine.is_cacheable());
    }
}
