//! Priority-ordered hook registry.
//!
//! # Responsibilities
//! - Store callbacks per hook name with a priority
//! - Invoke them in ascending priority, registration order breaking ties
//! - Wrap an operation in `before_<name>` / `after_<name>` hooks
//!
//! # Design Decisions
//! - Table published as an immutable snapshot (`ArcSwap`); registration
//!   copies, inserts and swaps, so readers never see a partial update and
//!   never take a lock
//! - Any control signal from a callback aborts the remaining callbacks
//! - Callbacks own no registry state; side effects belong to the extension

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Method;

use crate::dispatch::{Flow, RequestContext};
use crate::error::DispatchError;
use crate::resource::Resource;

/// Priority used when none is given.
pub const DEFAULT_PRIORITY: i32 = 99;

/// Value a single callback contributes, e.g. a fragment of markup.
pub type HookOutput = Option<String>;

/// A hook callback.
pub type HookFn = Arc<dyn Fn(&mut RequestContext, &HookArgs<'_>) -> Flow<HookOutput> + Send + Sync>;

/// Arguments passed alongside the request context.
#[derive(Debug, Clone, Copy)]
pub enum HookArgs<'a> {
    None,
    /// The matched route, for `before_action` / `after_action`.
    Action { method: &'a Method, route: &'a str },
    /// The resource being shown or saved.
    Resource(&'a dyn Resource),
    /// The fault being presented.
    Error(&'a DispatchError),
}

#[derive(Clone)]
struct HookEntry {
    priority: i32,
    sequence: u64,
    callback: HookFn,
}

/// Hook name → callbacks sorted by `(priority, sequence)`.
pub struct HookRegistry {
    table: ArcSwap<HashMap<String, Vec<HookEntry>>>,
    sequence: AtomicU64,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Register `callback` under `name` with the default priority.
    pub fn register<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&mut RequestContext, &HookArgs<'_>) -> Flow<HookOutput> + Send + Sync + 'static,
    {
        self.register_with_priority(name, DEFAULT_PRIORITY, callback);
    }

    /// Register `callback` under `name`. Lower priorities run first.
    pub fn register_with_priority<F>(&self, name: impl Into<String>, priority: i32, callback: F)
    where
        F: Fn(&mut RequestContext, &HookArgs<'_>) -> Flow<HookOutput> + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = HookEntry {
            priority,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            callback: Arc::new(callback),
        };

        self.table.rcu(|current| {
            let mut next = HashMap::clone(current);
            let list = next.entry(name.clone()).or_default();
            let key = (entry.priority, entry.sequence);
            let pos = list.partition_point(|e| (e.priority, e.sequence) < key);
            list.insert(pos, entry.clone());
            next
        });

        tracing::debug!(hook = %name, priority, "Hook registered");
    }

    /// Number of callbacks registered under `name`.
    pub fn count(&self, name: &str) -> usize {
        self.table.load().get(name).map(Vec::len).unwrap_or(0)
    }

    /// Run every callback for `name`, collecting their outputs.
    pub fn invoke(
        &self,
        name: &str,
        ctx: &mut RequestContext,
        args: &HookArgs<'_>,
    ) -> Flow<Vec<HookOutput>> {
        let table = self.table.load_full();
        let Some(entries) = table.get(name) else {
            return Ok(Vec::new());
        };

        tracing::trace!(hook = %name, callbacks = entries.len(), "Invoking hook");
        let mut outputs = Vec::with_capacity(entries.len());
        for entry in entries {
            outputs.push((entry.callback)(ctx, args)?);
        }
        Ok(outputs)
    }

    /// Run `name` and concatenate the non-empty outputs.
    pub fn invoke_text(
        &self,
        name: &str,
        ctx: &mut RequestContext,
        args: &HookArgs<'_>,
    ) -> Flow<String> {
        Ok(self.invoke(name, ctx, args)?.into_iter().flatten().collect())
    }

    /// Run `inner` between the `before_<name>` and `after_<name>` hooks.
    ///
    /// Any signal raised by a hook or by `inner` short-circuits the rest.
    pub fn with_hooks<T, F>(
        &self,
        name: &str,
        ctx: &mut RequestContext,
        args: &HookArgs<'_>,
        inner: F,
    ) -> Flow<T>
    where
        F: FnOnce(&mut RequestContext) -> Flow<T>,
    {
        self.invoke(&format!("before_{}", name), ctx, args)?;
        let value = inner(ctx)?;
        self.invoke(&format!("after_{}", name), ctx, args)?;
        Ok(value)
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.load();
        let mut counts: Vec<(&String, usize)> = table.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("HookRegistry").field("hooks", &counts).finish()
    }
}
