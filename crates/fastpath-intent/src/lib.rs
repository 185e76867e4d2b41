//! Cascading intent router for fastpath.
//!
//! This crate composes the kernel's deterministic matcher with the slower
//! tiers:
//!
//! - **Statistical tier**: an optional bag-of-words model loaded once at
//!   start-up via [`classifier::StatisticalClassifier`].
//! - **Tool execution**: a named-handler registry and the executor that
//!   normalises handler output, including soft-failure detection, via
//!   [`executor::ToolExecutor`].
//! - **Telemetry**: a bounded log of routing outcomes with derived statistics
//!   via [`telemetry::TelemetryManager`].
//! - **Routing**: the tiered decision pipeline in [`router::IntentRouter`].

pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod registry;
pub mod ring;
pub mod router;
pub mod telemetry;

pub use classifier::{
    BackendStatus, ClassifierBackend, ClassifierState, FileBackend, ModelArtifact, ModelBackend,
    NaiveBayesModel, StatisticalClassifier, TextModel,
};
pub use config::{ClassifierConfig, ExecutorConfig, RouterConfig};
pub use error::{IntentError, Result};
pub use executor::{ExecutionRecord, ToolExecutor, ToolLatency};
pub use registry::{ToolHandler, ToolInfo, ToolRegistry, handler_fn};
pub use router::IntentRouter;
pub use telemetry::{TelemetryManager, TelemetryStats, TierStats, ToolUsage};

pub use fastpath_kernel::{
    ClassificationResult, ClassificationTier, Params, RouteResult, TelemetryEvent,
    ToolExecutionResult,
};
