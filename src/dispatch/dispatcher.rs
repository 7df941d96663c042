//! Request lifecycle.
//!
//! # States
//! ```text
//! Received → Normalized → Routed → Executing → Finalizing → Sent
//!                            │          │
//!                            ├→ NotFound (no route, or every match passed)
//!                            └──────────┴→ Forwarded / ErrorHandling
//! ```
//!
//! # Design Decisions
//! - Synchronous: one request runs start to finish on one worker
//! - Routes are frozen at build time; hooks and engines are shared snapshots
//! - Control signals travel as values ([`Control`]), matched at each layer
//! - Every fault is presented, never retried
//! - A panic while routing becomes a `fault` and is presented like one

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::dispatch::{Control, Flow, Outcome, RequestContext};
use crate::engine::EngineRegistry;
use crate::error::DispatchError;
use crate::hooks::{names, HookArgs, HookRegistry};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::routing::RouteTable;

/// Anything that turns a request into a response.
pub trait Endpoint: Send + Sync {
    fn call(&self, request: Request) -> Response;
}

impl<F> Endpoint for F
where
    F: Fn(Request) -> Response + Send + Sync,
{
    fn call(&self, request: Request) -> Response {
        self(request)
    }
}

/// Raised when a handler asks to forward the request.
struct Forwarded;

/// Collects routes, hooks, engines and the fallback before serving.
pub struct ApplicationBuilder {
    routes: RouteTable,
    hooks: Arc<HookRegistry>,
    engines: Arc<EngineRegistry>,
    fallback: Option<Arc<dyn Endpoint>>,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            hooks: Arc::new(HookRegistry::new()),
            engines: Arc::new(EngineRegistry::new()),
            fallback: None,
        }
    }

    pub fn routes(&mut self) -> &mut RouteTable {
        &mut self.routes
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn engines(&self) -> &Arc<EngineRegistry> {
        &self.engines
    }

    /// Sub-application receiving forwarded requests.
    pub fn fallback(&mut self, endpoint: Arc<dyn Endpoint>) -> &mut Self {
        self.fallback = Some(endpoint);
        self
    }

    /// Freeze the route table.
    pub fn build(self) -> Application {
        tracing::debug!(routes = %self.routes.dump(), "Route table frozen");
        Application {
            routes: self.routes,
            hooks: self.hooks,
            engines: self.engines,
            fallback: self.fallback,
        }
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The dispatcher: routes, hooks and engines bound together.
pub struct Application {
    routes: RouteTable,
    hooks: Arc<HookRegistry>,
    engines: Arc<EngineRegistry>,
    fallback: Option<Arc<dyn Endpoint>>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn engines(&self) -> &Arc<EngineRegistry> {
        &self.engines
    }

    /// Handle one request.
    pub fn call(&self, request: Request) -> Response {
        let mut ctx = RequestContext::new(
            &request,
            Arc::clone(&self.hooks),
            Arc::clone(&self.engines),
        );
        let span = ctx.span().clone();
        let _entered = span.enter();

        match self.perform(&mut ctx) {
            Ok(()) => {
                tracing::debug!(status = %ctx.response.status, "Request dispatched");
                ctx.response.finish(request.is_head())
            }
            Err(Forwarded) => match &self.fallback {
                Some(app) => {
                    tracing::debug!("Forwarding to sub application");
                    app.call(request)
                }
                None => {
                    let err = DispatchError::RouteNotFound {
                        message: "Sub application not set".to_string(),
                    };
                    let outcome = self.handle_error(&mut ctx, &err);
                    outcome.apply(&mut ctx.response);
                    ctx.response.finish(request.is_head())
                }
            },
        }
    }

    fn perform(&self, ctx: &mut RequestContext) -> Result<(), Forwarded> {
        let routed = panic::catch_unwind(AssertUnwindSafe(|| self.route(ctx))).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!(panic = %message, "Request handling panicked");
            Err(DispatchError::fault(message).into())
        });

        let outcome = match routed {
            Ok(outcome) | Err(Control::Halt(outcome)) => outcome,
            Err(Control::Redirect(uri)) => {
                tracing::debug!(location = %uri, "Redirecting");
                ctx.response.redirect(&uri);
                return Ok(());
            }
            Err(Control::Forward) => return Err(Forwarded),
            Err(Control::Pass) => {
                let err = DispatchError::route_not_found(ctx.path());
                self.handle_error(ctx, &err)
            }
            Err(Control::Fault(err)) => self.handle_error(ctx, &err),
        };
        outcome.apply(&mut ctx.response);
        Ok(())
    }

    fn route(&self, ctx: &mut RequestContext) -> Flow {
        let hooks = Arc::clone(&self.hooks);
        hooks.invoke(names::BEFORE_ROUTING, ctx, &HookArgs::None)?;

        let method = ctx.method().clone();
        let path = ctx.path().to_string();
        let mut start = 0;

        while let Some(found) = self.routes.match_from(&method, &path, start) {
            start = found.index + 1;
            let entry = found.entry;
            tracing::debug!(route = %entry.declared_path(), "Route matched");
            ctx.bind_route(entry.param_names(), found.captures);

            let args = HookArgs::Action {
                method: &method,
                route: entry.declared_path(),
            };
            match hooks.with_hooks(names::ACTION, ctx, &args, |ctx| entry.call(ctx)) {
                Err(Control::Pass) => {
                    tracing::debug!(route = %entry.declared_path(), "Route passed");
                }
                result => return result,
            }
        }

        Err(DispatchError::route_not_found(&path).into())
    }

    /// Present `err`: status and message first, then the category hook.
    fn handle_error(&self, ctx: &mut RequestContext, err: &DispatchError) -> Outcome {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %err, "Request failed");
        } else {
            tracing::info!(status = %status, error = %err, "Request failed");
        }
        ctx.response.status = status;
        ctx.response.set_text(err.to_string());

        let hooks = Arc::clone(&self.hooks);
        match hooks.invoke_text(&names::error(err.category()), ctx, &HookArgs::Error(err)) {
            Ok(text) if !text.is_empty() => Outcome::Text(text),
            Ok(_) => Outcome::Empty,
            Err(Control::Halt(outcome)) => outcome,
            Err(other) => {
                tracing::warn!(category = err.category(), signal = ?other, "Error presentation hook failed");
                Outcome::Empty
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Request handling panicked".to_string()
    }
}

impl Endpoint for Application {
    fn call(&self, request: Request) -> Response {
        Application::call(self, request)
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.routes)
            .field("hooks", &self.hooks)
            .field("engines", &self.engines)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
