//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     "/wiki/:path/show" + sub-patterns
//!     → pattern.rs (escape literals, placeholders → capture groups)
//!     → table.rs (bind per method, registration order kept)
//!     → frozen inside the Application
//!
//! Incoming Request (method, unescaped path)
//!     → table.rs (scan entries for the method, in order)
//!     → Return: first RouteMatch (index, entry, captures) or None
//! ```
//!
//! # Design Decisions
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)
//! - Matching can resume after an entry, so a handler can pass

pub mod pattern;
pub mod table;

pub use pattern::{PathPattern, Patterns, Template, DEFAULT_SEGMENT};
pub use table::{Handler, RouteEntry, RouteMatch, RouteTable};
