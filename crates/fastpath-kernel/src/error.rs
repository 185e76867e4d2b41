//! Kernel error types.
//!
//! All kernel subsystems surface errors through [`KernelError`].  Extraction
//! failures are expected during matching and are recovered by the matcher;
//! pattern errors only occur while building rule tables.

/// Unified error type for the fastpath kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Pattern table errors ------------------------------------------------
    /// A regex pattern supplied to the matcher is invalid.
    #[error("invalid regex pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A rule was registered with a confidence outside `[0, 1]`.
    #[error("invalid confidence {confidence} for intent `{intent}`")]
    InvalidConfidence { intent: String, confidence: f64 },

    // -- Extraction errors ---------------------------------------------------
    /// A rule's parameter extractor rejected the matched text.
    #[error("parameter extraction failed for `{intent}`: {reason}")]
    ExtractionFailed { intent: String, reason: String },

    // -- Generic -------------------------------------------------------------
    /// Catch-all for unexpected internal errors.
    #[error("internal kernel error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
