//! Render context passed to engines.
//!
//! A context owns the resource being rendered plus two parameter maps:
//! `params` (visible request parameters) and `private` (values engines and
//! layouts hand to each other). Nested renders use [`RenderContext::subcontext`];
//! the child keeps a weak link to its parent and never writes through it.
//! A context built from a request carries the application's
//! [`EngineRegistry`], so nested renders can pick their own engine.

use std::sync::{Arc, Weak};

use crate::engine::registry::{EngineHandle, EngineRegistry, FindOptions};
use crate::error::DispatchError;
use crate::http::request::{ParamValue, Params};
use crate::resource::Resource;

pub struct RenderContext {
    resource: Arc<dyn Resource>,
    engine: Option<EngineHandle>,
    params: Params,
    private: Params,
    parent: Option<Weak<RenderContext>>,
    engines: Option<Arc<EngineRegistry>>,
    span: tracing::Span,
}

impl RenderContext {
    pub fn new(resource: Arc<dyn Resource>, params: Params) -> Self {
        let span = tracing::debug_span!("render", resource = %resource.path());
        Self {
            resource,
            engine: None,
            params,
            private: Params::new(),
            parent: None,
            engines: None,
            span,
        }
    }

    pub fn with_private(mut self, private: Params) -> Self {
        self.private = private;
        self
    }

    /// Registry used by [`RenderContext::render_nested`].
    pub fn with_engines(mut self, engines: Arc<EngineRegistry>) -> Self {
        self.engines = Some(engines);
        self
    }

    /// Child context for a nested render.
    ///
    /// `resource` defaults to the parent's. `params` and `private` are merged
    /// over copies of the parent's maps.
    pub fn subcontext(
        self: &Arc<Self>,
        resource: Option<Arc<dyn Resource>>,
        params: Params,
        private: Params,
    ) -> RenderContext {
        let resource = resource.unwrap_or_else(|| Arc::clone(&self.resource));
        let span = tracing::debug_span!(parent: &self.span, "render", resource = %resource.path());

        let mut merged_params = self.params.clone();
        merged_params.extend(params);
        let mut merged_private = self.private.clone();
        merged_private.extend(private);

        RenderContext {
            resource,
            engine: None,
            params: merged_params,
            private: merged_private,
            parent: Some(Arc::downgrade(self)),
            engines: self.engines.clone(),
            span,
        }
    }

    /// Render `resource` (or this context's resource) in a child context,
    /// with the engine the registry selects for it.
    pub fn render_nested(
        self: &Arc<Self>,
        resource: Option<Arc<dyn Resource>>,
        params: Params,
        options: &FindOptions,
    ) -> Result<String, DispatchError> {
        let engines = self
            .engines
            .as_ref()
            .ok_or_else(|| DispatchError::fault("Render context has no engine registry"))?;
        let mut child = self.subcontext(resource, params, Params::new());
        let engine = engines.find(child.resource().as_ref(), options)?;
        tracing::debug!(parent: &self.span, resource = %child.resource().path(), engine = %engine.name(), "Nested render");
        engine.render(&mut child)
    }

    pub fn resource(&self) -> &Arc<dyn Resource> {
        &self.resource
    }

    /// Engine currently rendering this context.
    pub fn engine(&self) -> Option<&EngineHandle> {
        self.engine.as_ref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(ParamValue::as_str)
    }

    pub fn private(&self) -> &Params {
        &self.private
    }

    pub fn set_private(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.private.insert(name.into(), value.into());
    }

    /// The enclosing context, while it is still alive.
    pub fn parent(&self) -> Option<Arc<RenderContext>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn engines(&self) -> Option<&Arc<EngineRegistry>> {
        self.engines.as_ref()
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub(crate) fn bind_engine(&mut self, engine: EngineHandle) {
        self.engine = Some(engine);
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("resource", &self.resource.path())
            .field("engine", &self.engine.as_ref().map(EngineHandle::name))
            .field("params", &self.params)
            .field("private", &self.private)
            .field("nested", &self.parent.is_some())
            .finish()
    }
}
