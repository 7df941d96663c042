//! Per-request state.
//!
//! A [`RequestContext`] is created when a request arrives and dropped when
//! its response is finalized. It is never shared between requests; the
//! only cross-request state it touches are the hook and engine registries.

use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use uuid::Uuid;

use crate::dispatch::normalize::{encode_params, unescape_path};
use crate::dispatch::Flow;
use crate::engine::EngineRegistry;
use crate::hooks::{HookArgs, HookOutput, HookRegistry};
use crate::http::request::{ParamValue, Params, Request};
use crate::http::response::Response;
use crate::resource::Resource;

/// Everything a handler or hook can see and change about one request.
pub struct RequestContext {
    id: String,
    method: Method,
    raw_path: String,
    path: String,
    headers: HeaderMap,
    original_params: Params,
    route_params: Params,
    params: Params,
    /// Response under construction.
    pub response: Response,
    messages: Vec<(String, String)>,
    resource: Option<Arc<dyn Resource>>,
    engine: Option<String>,
    hooks: Arc<HookRegistry>,
    engines: Arc<EngineRegistry>,
    span: tracing::Span,
}

impl RequestContext {
    /// Build the context for `request`, normalizing path and parameters.
    pub fn new(request: &Request, hooks: Arc<HookRegistry>, engines: Arc<EngineRegistry>) -> Self {
        let id = request
            .request_id()
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = unescape_path(&request.path);
        let params = encode_params(request.params());
        let span = tracing::debug_span!(
            "dispatch",
            request_id = %id,
            method = %request.method,
            path = %path,
        );

        Self {
            id,
            method: request.method.clone(),
            raw_path: request.path.clone(),
            path,
            headers: request.headers.clone(),
            original_params: params.clone(),
            route_params: Params::new(),
            params,
            response: Response::default(),
            messages: Vec::new(),
            resource: None,
            engine: None,
            hooks,
            engines,
            span,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path as received, still percent-encoded.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Unescaped path used for routing.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Merged parameters: request parameters overlaid with route captures.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Text value of a merged parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(ParamValue::as_str)
    }

    /// Query and body parameters as received.
    pub fn original_params(&self) -> &Params {
        &self.original_params
    }

    /// Parameters captured by the current route.
    pub fn route_params(&self) -> &Params {
        &self.route_params
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(name.into(), value.into());
    }

    /// Bind the captures of a matched route.
    ///
    /// Captures are zipped with `names`; without names, captures are exposed
    /// as a `captures` list. The result is merged over a copy of the original
    /// parameters, route values winning on collision.
    pub(crate) fn bind_route(&mut self, names: &[String], captures: Vec<Option<String>>) {
        let mut route_params = Params::new();
        if !names.is_empty() {
            for (name, value) in names.iter().zip(captures) {
                if let Some(value) = value {
                    route_params.insert(name.clone(), ParamValue::Text(value));
                }
            }
        } else if !captures.is_empty() {
            let values = captures
                .into_iter()
                .map(|value| ParamValue::Text(value.unwrap_or_default()))
                .collect();
            route_params.insert("captures".to_string(), ParamValue::List(values));
        }

        let mut params = self.original_params.clone();
        params.extend(route_params.clone());
        self.params = params;
        self.route_params = route_params;
    }

    /// Queue a user-facing message.
    pub fn message(&mut self, level: impl Into<String>, text: impl Into<String>) {
        self.messages.push((level.into(), text.into()));
    }

    pub fn messages(&self) -> &[(String, String)] {
        &self.messages
    }

    pub fn resource(&self) -> Option<&Arc<dyn Resource>> {
        self.resource.as_ref()
    }

    pub fn set_resource(&mut self, resource: Arc<dyn Resource>) {
        self.resource = Some(resource);
    }

    /// Name of the engine that rendered this request, if any.
    pub fn engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    pub fn set_engine(&mut self, name: impl Into<String>) {
        self.engine = Some(name.into());
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn engines(&self) -> &Arc<EngineRegistry> {
        &self.engines
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Invoke a hook by name with this context.
    pub fn invoke_hook(&mut self, name: &str, args: &HookArgs<'_>) -> Flow<Vec<HookOutput>> {
        let hooks = Arc::clone(&self.hooks);
        hooks.invoke(name, self, args)
    }

    /// Invoke a presentation hook and join its outputs.
    pub fn invoke_hook_text(&mut self, name: &str, args: &HookArgs<'_>) -> Flow<String> {
        let hooks = Arc::clone(&self.hooks);
        hooks.invoke_text(name, self, args)
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("status", &self.response.status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(target: &str) -> RequestContext {
        RequestContext::new(
            &Request::new(Method::GET, target),
            Arc::new(HookRegistry::new()),
            Arc::new(EngineRegistry::new()),
        )
    }

    #[test]
    fn test_route_params_override_query() {
        let mut ctx = context("/wiki/Home?path=shadowed&output=raw");
        ctx.bind_route(&["path".to_string()], vec![Some("Home".into())]);
        assert_eq!(ctx.param("path"), Some("Home"));
        assert_eq!(ctx.param("output"), Some("raw"));
        assert_eq!(ctx.original_params()["path"].as_str(), Some("shadowed"));
        assert_eq!(ctx.route_params().len(), 1);
    }

    #[test]
    fn test_unnamed_captures_exposed_as_list() {
        let mut ctx = context("/files/1-a");
        ctx.bind_route(&[], vec![Some("1".into()), Some("a".into())]);
        let captures = ctx.params()["captures"].as_list().unwrap();
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[1].as_str(), Some("a"));
    }

    #[test]
    fn test_rebinding_starts_from_original() {
        let mut ctx = context("/x");
        ctx.bind_route(&["a".to_string()], vec![Some("1".into())]);
        ctx.bind_route(&["b".to_string()], vec![Some("2".into())]);
        assert!(ctx.param("a").is_none());
        assert_eq!(ctx.param("b"), Some("2"));
    }

    #[test]
    fn test_path_is_unescaped_and_id_generated() {
        let ctx = context("/Hello%20World");
        assert_eq!(ctx.raw_path(), "/Hello%20World");
        assert_eq!(ctx.path(), "/Hello World");
        assert!(Uuid::parse_str(ctx.request_id()).is_ok());
    }

    #[test]
    fn test_request_id_header_is_kept() {
        let request = Request::new(Method::GET, "/").with_header(
            axum::http::HeaderName::from_static("x-request-id"),
            "abc-123",
        );
        let ctx = RequestContext::new(
            &request,
            Arc::new(HookRegistry::new()),
            Arc::new(EngineRegistry::new()),
        );
        assert_eq!(ctx.request_id(), "abc-123");
    }
}
