//! Wiki request dispatching: routing, lifecycle hooks and rendering engines.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum, request id, body limit)
//!                          │
//!                          ▼
//!                     dispatch::Application
//!                          │  normalize → before_routing
//!                          ▼
//!                     routing::RouteTable (first match, pass resumes)
//!                          │
//!                          ▼
//!                     hooks: before_action → handler → after_action
//!                          │
//!                          ▼  handler shows a resource
//!                     before_resource_show → engine::EngineRegistry::find
//!                          │                   → render → layout / raw
//!                          ▼
//!     ◀────────────── http::response::Response (HEAD stripped)
//! ```

// Core subsystems
pub mod dispatch;
pub mod engine;
pub mod hooks;
pub mod http;
pub mod routing;

// Application
pub mod app;
pub mod helpers;
pub mod resource;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use dispatch::{Application, ApplicationBuilder};
pub use error::{DispatchError, RouteError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
