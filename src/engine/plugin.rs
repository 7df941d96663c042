//! Hooks wiring the engine subsystem into request handling.
//!
//! # Data Flow
//! ```text
//! handler sets ctx.resource, invokes before_resource_show
//!     → find engine (params[output] / params[engine] / resource metadata)
//!     → render into a fresh RenderContext
//!     → layout engine:  halt(layout.render(view))          text/html
//!       otherwise:      halt(raw output)                   engine mime
//! ```
//!
//! [`PageLayout`] renders `templates/layout.html` through askama.

use std::sync::Arc;

use askama::Template;

use crate::dispatch::{halt, RequestContext};
use crate::engine::context::RenderContext;
use crate::engine::registry::FindOptions;
use crate::error::DispatchError;
use crate::helpers::{actions_menu, breadcrumbs, engines_menu, show_messages};
use crate::hooks::{names, HookArgs, HookRegistry};
use crate::resource::Resource;

/// Everything a layout needs to wrap engine output.
#[derive(Debug)]
pub struct View<'a> {
    pub resource: &'a dyn Resource,
    pub engine: &'a str,
    pub content: &'a str,
    pub messages: &'a [(String, String)],
    /// Concatenated `after_view_menu` outputs.
    pub menu: &'a str,
}

/// Page chrome around layout engines.
pub trait Layout: Send + Sync {
    fn render(&self, view: &View<'_>) -> Result<String, DispatchError>;
}

/// Minimal HTML page: title, breadcrumbs, menu, messages, content.
#[derive(Debug, Clone)]
pub struct PageLayout {
    title: String,
}

impl PageLayout {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

/// `templates/layout.html`. Title, path and engine are escaped; the other
/// fields are already HTML.
#[derive(Template)]
#[template(path = "layout.html")]
struct LayoutTemplate<'a> {
    title: &'a str,
    path: &'a str,
    engine: &'a str,
    breadcrumbs: String,
    menu: &'a str,
    messages: String,
    content: &'a str,
}

impl Layout for PageLayout {
    fn render(&self, view: &View<'_>) -> Result<String, DispatchError> {
        LayoutTemplate {
            title: &self.title,
            path: view.resource.path(),
            engine: view.engine,
            breadcrumbs: breadcrumbs(view.resource),
            menu: view.menu,
            messages: show_messages(view.messages),
            content: view.content,
        }
        .render()
        .map_err(|e| DispatchError::fault(format!("Layout rendering failed: {}", e)))
    }
}

/// Register the `before_resource_show` renderer plus the actions and
/// engines menus.
pub fn install(hooks: &HookRegistry, layout: Arc<dyn Layout>) {
    hooks.register(names::BEFORE_RESOURCE_SHOW, move |ctx, _args| {
        let Some(resource) = ctx.resource().cloned() else {
            return Ok(None);
        };
        show(ctx, resource, layout.as_ref())
    });

    hooks.register(names::AFTER_VIEW_MENU, |ctx, _args| Ok(Some(actions_menu(ctx))));
    hooks.register(names::AFTER_VIEW_MENU, |ctx, _args| Ok(Some(engines_menu(ctx))));
}

fn show(
    ctx: &mut RequestContext,
    resource: Arc<dyn Resource>,
    layout: &dyn Layout,
) -> crate::dispatch::Flow<Option<String>> {
    let name = ctx
        .param("output")
        .or_else(|| ctx.param("engine"))
        .map(str::to_owned);
    let engine = ctx.engines().find(
        resource.as_ref(),
        &FindOptions {
            name,
            layout: false,
        },
    )?;

    let mut render =
        RenderContext::new(Arc::clone(&resource), ctx.params().clone()).with_engines(Arc::clone(ctx.engines()));
    let content = {
        let _entered = ctx.span().clone().entered();
        engine.render(&mut render)?
    };
    ctx.set_engine(engine.name());
    tracing::debug!(
        resource = %resource.path(),
        engine = %engine.name(),
        layout = engine.has_layout(),
        "Resource rendered"
    );

    if engine.has_layout() {
        let menu = ctx.invoke_hook_text(names::AFTER_VIEW_MENU, &HookArgs::Resource(resource.as_ref()))?;
        let page = layout.render(&View {
            resource: resource.as_ref(),
            engine: engine.name(),
            content: &content,
            messages: ctx.messages(),
            menu: &menu,
        })?;
        ctx.response.set_content_type("text/html; charset=utf-8");
        halt(page)
    } else {
        ctx.response.set_content_type(&engine.mime(resource.as_ref()));
        halt(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Control, Outcome};
    use crate::engine::builtin::register_builtin;
    use crate::engine::EngineRegistry;
    use crate::http::request::Request;
    use crate::resource::Page;
    use axum::http::Method;

    fn context(target: &str, resource: Page) -> RequestContext {
        let hooks = Arc::new(HookRegistry::new());
        let engines = Arc::new(EngineRegistry::new());
        register_builtin(&engines);
        install(&hooks, Arc::new(PageLayout::new("Wiki")));
        let mut ctx = RequestContext::new(&Request::new(Method::GET, target), hooks, engines);
        ctx.set_resource(Arc::new(resource));
        ctx
    }

    fn shown(ctx: &mut RequestContext) -> Result<Outcome, Control> {
        let resource = ctx.resource().cloned().unwrap();
        match ctx.invoke_hook(names::BEFORE_RESOURCE_SHOW, &HookArgs::Resource(resource.as_ref())) {
            Err(Control::Halt(outcome)) => Ok(outcome),
            Err(other) => Err(other),
            Ok(_) => panic!("expected the renderer to halt"),
        }
    }

    #[test]
    fn test_layout_engine_wraps_page() {
        let mut ctx = context("/Home", Page::new("Home", "Hello"));
        ctx.message("info", "Saved");
        let Outcome::Text(html) = shown(&mut ctx).unwrap() else {
            panic!("expected text");
        };
        assert!(html.contains("<title>Home - Wiki</title>"));
        assert!(html.contains("<p>Hello</p>"));
        assert!(html.contains("<li class=\"info\">Saved</li>"));
        assert!(html.contains("<li class=\"selected\"><a href=\"/Home?output=page\">page</a></li>"));
        assert!(html.contains("<li><a href=\"/Home/engines\">engines</a></li>"));
        assert!(html.find("class=\"actions\"") < html.find("class=\"engines\""));
        assert_eq!(ctx.engine(), Some("page"));
        assert_eq!(ctx.response.content_type(), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_layout_escapes_title_and_path() {
        let layout = PageLayout::new("Tom & Jerry's");
        let page = Page::new("a<b>", "x");
        let html = layout
            .render(&View {
                resource: &page,
                engine: "page",
                content: "<p>x</p>",
                messages: &[],
                menu: "",
            })
            .unwrap();
        assert!(html.contains("<title>a&lt;b&gt; - Tom &amp; Jerry"));
        assert!(!html.contains("a<b>"));
        assert!(html.contains("<div id=\"content\">\n<p>x</p></div>"));
    }

    #[test]
    fn test_layout_for_root_shows_site_title() {
        let layout = PageLayout::new("Wiki");
        let root = crate::resource::Tree::new("", Vec::new());
        let html = layout
            .render(&View {
                resource: &root,
                engine: "gallery",
                content: "",
                messages: &[],
                menu: "",
            })
            .unwrap();
        assert!(html.contains("<title>Wiki</title>"));
        assert!(html.contains("<body class=\"engine-gallery\">"));
    }

    #[test]
    fn test_raw_engine_sets_mime() {
        let mut ctx = context("/Home?output=download", Page::new("Home", "Hello"));
        assert_eq!(shown(&mut ctx).unwrap(), Outcome::from("Hello"));
        assert_eq!(ctx.engine(), Some("download"));
        assert_eq!(ctx.response.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_engine_param_alias() {
        let mut ctx = context("/Home?engine=download", Page::new("Home", "Hello"));
        assert_eq!(shown(&mut ctx).unwrap(), Outcome::from("Hello"));
    }

    #[test]
    fn test_unknown_engine_faults() {
        let mut ctx = context("/Home?output=nope", Page::new("Home", "Hello"));
        match shown(&mut ctx) {
            Err(Control::Fault(DispatchError::EngineNotAvailable { engine, .. })) => assert_eq!(engine, "nope"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_without_resource_is_noop() {
        let hooks = Arc::new(HookRegistry::new());
        install(&hooks, Arc::new(PageLayout::new("Wiki")));
        let mut ctx = RequestContext::new(
            &Request::new(Method::GET, "/"),
            Arc::clone(&hooks),
            Arc::new(EngineRegistry::new()),
        );
        let outputs = ctx.invoke_hook(names::BEFORE_RESOURCE_SHOW, &HookArgs::None).unwrap();
        assert_eq!(outputs, vec![None]);
    }
}
