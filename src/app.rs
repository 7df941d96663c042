//! The wiki application: routes over a [`ResourceStore`].
//!
//! # Routes
//! ```text
//! GET  /                  → 302 /Home
//! GET  /:path/engines     → engines able to render the resource
//! GET  /:path/show        ┐
//! GET  /:path             ┘ before_resource_show, else raw content
//! PUT  /:path             ┐
//! POST /:path             ┘ before_page_save, save, 302 back to the page
//! ```
//!
//! `:path` spans slashes (`.+`); the more specific templates are
//! registered first so they win.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::dispatch::{redirect, ApplicationBuilder, Flow, Outcome, RequestContext};
use crate::engine::{self, PageLayout};
use crate::error::{DispatchError, RouteError};
use crate::helpers::{engines_menu, object_path, PathOptions};
use crate::hooks::{names, HookArgs};
use crate::resource::{Page, Resource, ResourceStore};
use crate::routing::{Patterns, RouteTable};

/// Page shown for `/`.
pub const HOME: &str = "/Home";

/// Builder with the built-in engines, the engine plugin and the wiki routes.
pub fn builder(
    store: Arc<dyn ResourceStore>,
    site_title: &str,
    patterns: &Patterns,
) -> Result<ApplicationBuilder, RouteError> {
    let mut builder = ApplicationBuilder::new();
    builder.routes().set_patterns(patterns.clone());
    install_routes(builder.routes(), store)?;
    engine::install(builder.hooks(), Arc::new(PageLayout::new(site_title)));
    engine::register_builtin(builder.engines());
    Ok(builder)
}

/// Register the wiki routes.
pub fn install_routes(routes: &mut RouteTable, store: Arc<dyn ResourceStore>) -> Result<(), RouteError> {
    let path_spans_slashes = Patterns::from([("path".to_string(), ".+".to_string())]);

    routes.get(["/"], |_ctx| redirect(HOME))?;

    let finder = Arc::clone(&store);
    routes.get_with(["/:path/engines"], &path_spans_slashes, move |ctx| {
        let resource = find(finder.as_ref(), ctx)?;
        ctx.set_resource(resource);
        ctx.response.set_content_type("text/html; charset=utf-8");
        Ok(Outcome::Text(engines_menu(ctx)))
    })?;

    let finder = Arc::clone(&store);
    routes.get_with(["/:path/show", "/:path"], &path_spans_slashes, move |ctx| {
        let resource = find(finder.as_ref(), ctx)?;
        show(ctx, resource)
    })?;

    let saver = Arc::clone(&store);
    let saving = move |ctx: &mut RequestContext| save(saver.as_ref(), ctx);
    routes.put_with(["/:path"], &path_spans_slashes, saving.clone())?;
    routes.post_with(["/:path"], &path_spans_slashes, saving)?;

    Ok(())
}

fn find(store: &dyn ResourceStore, ctx: &RequestContext) -> Result<Arc<dyn Resource>, DispatchError> {
    let path = ctx.param("path").unwrap_or_default();
    store
        .find(path)
        .ok_or_else(|| DispatchError::with_status(StatusCode::NOT_FOUND, format!("Resource {} not found", path)))
}

fn show(ctx: &mut RequestContext, resource: Arc<dyn Resource>) -> Flow {
    ctx.set_resource(Arc::clone(&resource));
    ctx.invoke_hook(names::BEFORE_RESOURCE_SHOW, &HookArgs::Resource(resource.as_ref()))?;

    // Nothing rendered it; serve the raw content.
    tracing::debug!(resource = %resource.path(), "No renderer halted, serving raw content");
    ctx.response.set_content_type(resource.mime());
    Ok(Outcome::Text(resource.content().unwrap_or_default().to_string()))
}

fn save(store: &dyn ResourceStore, ctx: &mut RequestContext) -> Flow {
    let path = ctx.param("path").unwrap_or_default().to_string();
    let content = ctx
        .param("content")
        .ok_or_else(|| DispatchError::with_status(StatusCode::BAD_REQUEST, "Missing content"))?
        .to_string();

    let page = Page::new(path, content);
    ctx.invoke_hook(names::BEFORE_PAGE_SAVE, &HookArgs::Resource(&page))?;

    let location = object_path(&page, PathOptions::default());
    tracing::info!(path = %page.path(), "Page saved");
    store.save(page)?;
    redirect(location)
}
