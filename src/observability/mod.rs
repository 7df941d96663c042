//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / engines / server produce:
//!     → logging.rs (structured events, spans carrying the request id)
//!     → metrics.rs (request counter, latency histogram)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every span of a request
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
