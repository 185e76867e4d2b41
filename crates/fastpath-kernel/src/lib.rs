//! fastpath kernel.
//!
//! This crate holds the deterministic, I/O-free half of the fastpath intent
//! cascade:
//!
//! - **[`types`]** -- Value objects shared by every tier: [`ClassificationTier`],
//!   [`RouteResult`], [`ClassificationResult`], [`ToolExecutionResult`] and
//!   [`TelemetryEvent`].
//! - **[`patterns`]** -- Regex-table matcher with ordered action and query
//!   tables and per-rule parameter extractors.
//! - **[`catalogue`]** -- The built-in intent tables installed by
//!   [`PatternMatcher::builtin`].
//! - **[`extract`]** -- Per-intent text-to-parameter extraction used by the
//!   statistical tier.
//! - **[`error`]** -- Unified kernel error types via [`thiserror`].
//!
//! Everything here is read-only after construction and therefore `Send + Sync`
//! without any locking.

pub mod catalogue;
pub mod error;
pub mod extract;
pub mod patterns;
pub mod types;

pub use error::{KernelError, Result};
pub use extract::ParameterExtractor;
pub use patterns::{ExtractorFn, PatternMatch, PatternMatcher, PatternRule};
pub use types::{
    ClassificationResult, ClassificationTier, Params, RouteResult, TelemetryEvent,
    ToolExecutionResult,
};
