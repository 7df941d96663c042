//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → context.rs (normalize path and params, build RequestContext)
//!     → dispatcher.rs: before_routing → match route → action hooks + handler
//!     → control.rs (Outcome / Control signals → Response)
//!     → Response (HEAD stripped), or forward to the fallback Endpoint
//! ```

pub mod context;
pub mod control;
pub mod dispatcher;
pub mod normalize;

pub use context::RequestContext;
pub use control::{forward, halt, pass, redirect, Body, Control, Flow, Outcome};
pub use dispatcher::{Application, ApplicationBuilder, Endpoint};
