//! Intent router error types.
//!
//! All subsystems in this crate surface errors through [`IntentError`].  None
//! of them escape [`crate::IntentRouter::route`]: the router turns every
//! failure into data on its [`crate::RouteResult`].

/// Unified error type for the intent router.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Classifier errors ---------------------------------------------------
    /// The model artifact does not exist.
    #[error("model artifact not found: {path}")]
    ModelNotFound { path: String },

    /// The model artifact exists but could not be read or validated.
    #[error("failed to load model: {reason}")]
    ModelLoad { reason: String },

    /// No classifier backend is available in this build or configuration.
    #[error("classifier backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    // -- Tool errors ---------------------------------------------------------
    /// No tool with this name is registered.
    #[error("tool not found: {tool_name}")]
    ToolNotFound { tool_name: String },

    /// The tool is declared but has no handler attached.
    #[error("no handler registered for tool: {tool_name}")]
    NoHandler { tool_name: String },

    /// A tool handler reported a failure.
    #[error("tool execution failed for `{tool_name}`: {reason}")]
    ToolExecution { tool_name: String, reason: String },

    /// A tool handler did not finish within the configured timeout.
    #[error("tool `{tool_name}` timed out after {timeout_ms} ms")]
    ToolTimeout { tool_name: String, timeout_ms: u64 },

    // -- Configuration errors ------------------------------------------------
    /// Configuration loading or validation failed.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the kernel crate.
    #[error("kernel error: {0}")]
    Kernel(#[from] fastpath_kernel::KernelError),

    // -- Serialization / IO --------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // -- Generic -------------------------------------------------------------
    /// Catch-all for unexpected internal errors.
    #[error("internal intent error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
