//! Value objects shared across the routing tiers.
//!
//! Every type here is owned by the call that produced it.  Only the telemetry
//! log and the rule tables live for the whole process, and neither holds
//! references into these values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Structured parameters handed to a tool (e.g. `{"action": "set", "level": 42}`).
pub type Params = serde_json::Map<String, Value>;

/// Maximum number of characters of a query retained in telemetry.
pub const MAX_TELEMETRY_QUERY_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// One stage of the classification cascade.
///
/// The declaration order is the evaluation order: a later tier is only
/// consulted after every earlier tier has declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationTier {
    /// Regex rule tables.
    Deterministic,
    /// Bag-of-words statistical model.
    Statistical,
    /// Nothing local resolved the query; escalate to the LLM handler.
    Fallback,
}

impl ClassificationTier {
    /// All tiers in evaluation order.
    pub const ALL: [ClassificationTier; 3] = [
        ClassificationTier::Deterministic,
        ClassificationTier::Statistical,
        ClassificationTier::Fallback,
    ];
}

impl std::fmt::Display for ClassificationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deterministic => write!(f, "deterministic"),
            Self::Statistical => write!(f, "statistical"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

// ---------------------------------------------------------------------------
// Statistical classification
// ---------------------------------------------------------------------------

/// Output of the statistical tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Top-ranked label, or `"unknown"` when the model produced nothing.
    pub intent: String,

    /// Probability of the top label, in `[0, 1]`.
    pub confidence: f64,

    /// Second and third ranked labels.  Diagnostic only, never executed.
    pub alternatives: Vec<(String, f64)>,
}

impl ClassificationResult {
    /// Label reported when no prediction is available.
    pub const UNKNOWN: &'static str = "unknown";

    /// The zero-confidence result returned whenever the model is unavailable.
    pub fn unknown() -> Self {
        Self {
            intent: Self::UNKNOWN.to_string(),
            confidence: 0.0,
            alternatives: Vec::new(),
        }
    }

    /// Whether this result carries an actual prediction.
    pub fn is_unknown(&self) -> bool {
        self.intent == Self::UNKNOWN
    }
}

// ---------------------------------------------------------------------------
// Tool execution
// ---------------------------------------------------------------------------

/// Normalised outcome of invoking a tool handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub success: bool,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecutionResult {
    /// A successful invocation.
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: response.into(),
            error: None,
        }
    }

    /// A failed invocation with no usable response text.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: String::new(),
            error: Some(error.into()),
        }
    }

    /// A handler that returned normally but whose text signals failure.
    ///
    /// The text is kept as both the response and the error.
    pub fn soft_failure(response: impl Into<String>) -> Self {
        let response = response.into();
        Self {
            success: false,
            error: Some(response.clone()),
            response,
        }
    }
}

// ---------------------------------------------------------------------------
// Route result
// ---------------------------------------------------------------------------

/// The outcome of routing one query through the cascade.
///
/// `handled == true` always carries `response` and `tool_name`;
/// `handled == false` always carries `reason`.  The `failed_*` fields and
/// `original_tier` are only set when a tier matched but its tool execution
/// failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub handled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<ClassificationTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_tier: Option<ClassificationTier>,
}

impl RouteResult {
    /// A query resolved locally by `tier`.
    pub fn handled(
        tier: ClassificationTier,
        tool_name: impl Into<String>,
        confidence: f64,
        response: impl Into<String>,
    ) -> Self {
        Self {
            handled: true,
            response: Some(response.into()),
            tool_name: Some(tool_name.into()),
            confidence: Some(confidence),
            tier: Some(tier),
            reason: None,
            failed_tool_name: None,
            failed_error: None,
            original_tier: None,
        }
    }

    /// A query no tier could resolve.
    pub fn unhandled(reason: impl Into<String>) -> Self {
        Self {
            handled: false,
            response: None,
            tool_name: None,
            confidence: None,
            tier: Some(ClassificationTier::Fallback),
            reason: Some(reason.into()),
            failed_tool_name: None,
            failed_error: None,
            original_tier: None,
        }
    }

    /// Attach the context of a tier that matched but whose execution failed.
    pub fn with_failure(
        mut self,
        original_tier: ClassificationTier,
        tool_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        self.failed_tool_name = Some(tool_name.into());
        self.failed_error = Some(error.into());
        self.original_tier = Some(original_tier);
        self
    }

    /// Whether a tier matched and then failed to execute.
    pub fn is_execution_failure(&self) -> bool {
        self.original_tier.is_some()
    }
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// One routing outcome, recorded exactly once per `route()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub id: Uuid,
    /// The query, truncated to [`MAX_TELEMETRY_QUERY_CHARS`] characters.
    pub query: String,
    /// Tier at which the call terminated.
    pub tier: ClassificationTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub latency_ms: u64,
    pub timestamp_ms: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TelemetryEvent {
    /// Create an event stamped with the current time.
    pub fn new(query: &str, tier: ClassificationTier, success: bool, latency_ms: u64) -> Self {
        Self {
            id: Uuid::now_v7(),
            query: truncate_query(query),
            tier,
            tool_name: None,
            confidence: None,
            latency_ms,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            success,
            error: None,
        }
    }

    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Cut a query down to the telemetry character budget on a char boundary.
fn truncate_query(query: &str) -> String {
    query.chars().take(MAX_TELEMETRY_QUERY_CHARS).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
