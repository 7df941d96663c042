//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, conversion)
//!     → request.rs (method, path, query, headers, body; param parsing)
//!     → [dispatcher: routing, hooks, engines]
//!     → response.rs (status, headers, body; HEAD stripping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ParamValue, Params, Request, X_REQUEST_ID};
pub use response::Response;
pub use server::HttpServer;
