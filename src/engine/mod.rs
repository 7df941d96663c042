//! Rendering engines.
//!
//! # Responsibilities
//! - Keep the set of engines, grouped by name ([`EngineRegistry`])
//! - Pick the engine for a resource by name, acceptance, layout and priority
//! - Render through a per-request [`RenderContext`]
//! - Hook rendering into `before_resource_show` ([`plugin::install`])
//!
//! # Data Flow
//! ```text
//! startup:  builtin.rs → registry.rs (create / register)
//! request:  before_resource_show → plugin.rs → registry.find → render
//!                                            → layout or raw response
//! ```

pub mod builtin;
pub mod context;
pub mod plugin;
pub mod registry;

pub use builtin::register_builtin;
pub use context::RenderContext;
pub use plugin::{install, Layout, PageLayout, View};
pub use registry::{
    DefaultEngine, Engine, EngineHandle, EngineOptions, EngineRegistry, FindOptions,
    DEFAULT_ENGINE_PRIORITY,
};
