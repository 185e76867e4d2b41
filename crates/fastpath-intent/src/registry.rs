//! Named tool handler registry.
//!
//! The host populates the registry with one handler per tool name.  A tool
//! may also be *declared* without a handler, which lets the executor tell
//! "this tool does not exist" apart from "this tool exists but nothing can run
//! it right now".
//!
//! Internally the registry is backed by [`DashMap`], so it can be shared
//! across concurrent `route()` calls without a global lock.
//!
//! # Example
//!
//! ```rust
//! # use fastpath_intent::registry::{ToolRegistry, handler_fn};
//! let registry = ToolRegistry::new();
//! registry.register(
//!     "get_time",
//!     "Report the current time",
//!     handler_fn(|_params| async { Ok(serde_json::json!("12:00")) }),
//! );
//! registry.declare("open_application", "Launch an application");
//!
//! assert!(registry.handler("get_time").is_ok());
//! assert!(registry.handler("open_application").is_err());
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

use fastpath_kernel::Params;

use crate::error::{IntentError, Result};

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// An action the router can execute.
///
/// Handlers may signal failure either by returning `Err` or, by convention,
/// by returning text that starts with a failure prefix such as
/// `"Failed to "`.  The executor reconciles both.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, params: &Params) -> Result<Value>;
}

struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn call(&self, params: &Params) -> Result<Value> {
        (self.f)(params.clone()).await
    }
}

/// Wrap an async closure as a [`ToolHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Snapshot of a registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    /// Whether a handler is attached.
    pub has_handler: bool,
    pub registered_at: DateTime<Utc>,
}

struct ToolEntry {
    description: String,
    handler: Option<Arc<dyn ToolHandler>>,
    registered_at: DateTime<Utc>,
}

impl ToolEntry {
    fn info(&self, name: &str) -> ToolInfo {
        ToolInfo {
            name: name.to_string(),
            description: self.description.clone(),
            has_handler: self.handler.is_some(),
            registered_at: self.registered_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Concurrent tool registry backed by [`DashMap`].
///
/// The registry is cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    inner: Arc<DashMap<String, ToolEntry>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with its handler.
    ///
    /// If a tool with the same name already exists, it is overwritten.
    pub fn register(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) {
        let name = name.into();
        tracing::debug!(tool = %name, "tool registered");
        self.inner.insert(
            name,
            ToolEntry {
                description: description.into(),
                handler: Some(handler),
                registered_at: Utc::now(),
            },
        );
    }

    /// Declare a tool without attaching a handler.
    pub fn declare(&self, name: impl Into<String>, description: impl Into<String>) {
        let name = name.into();
        tracing::debug!(tool = %name, "tool declared without handler");
        self.inner.insert(
            name,
            ToolEntry {
                description: description.into(),
                handler: None,
                registered_at: Utc::now(),
            },
        );
    }

    /// Remove a tool.  Returns its last snapshot if it existed.
    pub fn unregister(&self, name: &str) -> Option<ToolInfo> {
        let removed = self.inner.remove(name).map(|(name, entry)| entry.info(&name));
        if removed.is_some() {
            tracing::debug!(tool = %name, "tool unregistered");
        }
        removed
    }

    /// Look up the handler for `name`.
    pub fn handler(&self, name: &str) -> Result<Arc<dyn ToolHandler>> {
        let entry = self.inner.get(name).ok_or_else(|| IntentError::ToolNotFound {
            tool_name: name.to_string(),
        })?;
        entry.handler.clone().ok_or_else(|| IntentError::NoHandler {
            tool_name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<ToolInfo> {
        self.inner.get(name).map(|entry| entry.info(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshots of every tool, sorted by name.
    pub fn list(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self
            .inner
            .iter()
            .map(|e| e.value().info(e.key()))
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo() -> Arc<dyn ToolHandler> {
        handler_fn(|params| async move { Ok(Value::Object(params)) })
    }

    #[tokio::test]
    async fn register_and_call() {
        let registry = ToolRegistry::new();
        registry.register("echo", "Echo parameters", echo());

        let mut params = Params::new();
        params.insert("level".into(), json!(42));
        let handler = registry.handler("echo").unwrap();
        assert_eq!(handler.call(&params).await.unwrap(), json!({"level": 42}));
    }

    #[test]
    fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.handler("nope").err().unwrap();
        assert!(matches!(err, IntentError::ToolNotFound { .. }));
    }

    #[test]
    fn declared_tool_has_no_handler() {
        let registry = ToolRegistry::new();
        registry.declare("open_application", "Launch an app");
        let err = registry.handler("open_application").err().unwrap();
        assert!(matches!(err, IntentError::NoHandler { .. }));
        assert!(!registry.get("open_application").unwrap().has_handler);
    }

    #[test]
    fn names_are_sorted_and_unregister_works() {
        let registry = ToolRegistry::new();
        registry.register("b", "", echo());
        registry.register("a", "", echo());
        registry.declare("c", "");
        assert_eq!(registry.names(), vec!["a", "b", "c"]);

        let removed = registry.unregister("b").unwrap();
        assert_eq!(removed.name, "b");
        assert!(registry.unregister("b").is_none());
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains("b"));
    }

    #[test]
    fn clones_share_state() {
        let registry = ToolRegistry::new();
        let clone = registry.clone();
        clone.register("x", "", echo());
        assert!(registry.contains("x"));
    }
}
