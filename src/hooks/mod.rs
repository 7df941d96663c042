//! Extension hooks.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     extensions → registry.rs (register by name + priority)
//!
//! Per request:
//!     dispatcher → invoke("before_routing")
//!               → with_hooks("action"): before_action → handler → after_action
//!     handlers   → invoke("before_resource_show"), invoke("before_page_save")
//!     errors     → invoke("error:<category>") for presentation
//! ```

pub mod registry;

pub use registry::{HookArgs, HookFn, HookOutput, HookRegistry, DEFAULT_PRIORITY};

/// Well-known hook names.
pub mod names {
    pub const BEFORE_ROUTING: &str = "before_routing";
    /// Wrapping hook; callbacks register as `before_action` / `after_action`.
    pub const ACTION: &str = "action";
    pub const BEFORE_ACTION: &str = "before_action";
    pub const AFTER_ACTION: &str = "after_action";
    pub const BEFORE_RESOURCE_SHOW: &str = "before_resource_show";
    pub const BEFORE_PAGE_SAVE: &str = "before_page_save";
    /// Presentation hook; outputs are appended to the view menu.
    pub const AFTER_VIEW_MENU: &str = "after_view_menu";

    /// Presentation hook for a fault category.
    pub fn error(category: &str) -> String {
        format!("error:{}", category)
    }
}
