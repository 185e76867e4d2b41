//! Router configuration.
//!
//! [`RouterConfig`] carries the tier thresholds and the sizing of the bounded
//! buffers.  Defaults match the behaviour the cascade was tuned for; every
//! field can be overridden from a TOML file, from `FASTPATH_*` environment
//! variables, or fluently with the `with_*` builders.
//!
//! ```toml
//! deterministic_threshold = 0.95
//! statistical_high_threshold = 0.85
//! statistical_attempt_threshold = 0.60
//! telemetry_capacity = 1000
//!
//! [executor]
//! timeout_ms = 30000   # 0 disables the timeout
//! latency_window = 200
//!
//! [classifier]
//! enabled = true
//! model_path = "models/intent-classifier.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fastpath_kernel::catalogue::QUERY_INTENTS;

use crate::error::{IntentError, Result};

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Configuration for the tool executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Timeout for a single tool execution, in milliseconds.  `0` means no
    /// timeout.
    ///
    /// Default: **30 000 ms**.
    pub timeout_ms: u64,

    /// Number of recent executions kept for latency reporting.
    ///
    /// Default: **200**.
    pub latency_window: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            latency_window: 200,
        }
    }
}

impl ExecutorConfig {
    /// The execution timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Configuration for the statistical tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// When `false` no backend is built and the tier is permanently
    /// unavailable.
    pub enabled: bool,

    /// Path of the JSON model artifact.
    pub model_path: PathBuf,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: PathBuf::from("models/intent-classifier.json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Thresholds and sizing for [`crate::IntentRouter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Minimum rule confidence for a deterministic match to be executed.
    pub deterministic_threshold: f64,

    /// Statistical confidence at or above which the predicted intent is
    /// executed unconditionally.
    pub statistical_high_threshold: f64,

    /// Statistical confidence at or above which extraction and execution are
    /// still attempted, unless the intent is parameterless.
    pub statistical_attempt_threshold: f64,

    /// Capacity of the telemetry ring buffer.
    pub telemetry_capacity: usize,

    /// Intents that are declined in the middle confidence band because they
    /// take no parameters to corroborate the prediction.
    pub parameterless_intents: Vec<String>,

    pub executor: ExecutorConfig,

    pub classifier: ClassifierConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            deterministic_threshold: 0.95,
            statistical_high_threshold: 0.85,
            statistical_attempt_threshold: 0.60,
            telemetry_capacity: 1000,
            parameterless_intents: QUERY_INTENTS.iter().map(|s| s.to_string()).collect(),
            executor: ExecutorConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.  Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| IntentError::Config {
            reason: format!("failed to parse config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| IntentError::Config {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        tracing::debug!(path = %path.display(), "router config loaded");
        Self::from_toml_str(&content)
    }

    /// Apply `FASTPATH_*` overrides from the process environment.
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup, then re-validate.
    ///
    /// Recognised keys: `FASTPATH_DETERMINISTIC_THRESHOLD`,
    /// `FASTPATH_STATISTICAL_HIGH_THRESHOLD`,
    /// `FASTPATH_STATISTICAL_ATTEMPT_THRESHOLD`, `FASTPATH_TELEMETRY_CAPACITY`,
    /// `FASTPATH_MODEL_PATH`, `FASTPATH_TOOL_TIMEOUT_MS`.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FASTPATH_DETERMINISTIC_THRESHOLD") {
            self.deterministic_threshold = parse_override("FASTPATH_DETERMINISTIC_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("FASTPATH_STATISTICAL_HIGH_THRESHOLD") {
            self.statistical_high_threshold =
                parse_override("FASTPATH_STATISTICAL_HIGH_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("FASTPATH_STATISTICAL_ATTEMPT_THRESHOLD") {
            self.statistical_attempt_threshold =
                parse_override("FASTPATH_STATISTICAL_ATTEMPT_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("FASTPATH_TELEMETRY_CAPACITY") {
            self.telemetry_capacity = parse_override("FASTPATH_TELEMETRY_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("FASTPATH_MODEL_PATH") {
            self.classifier.model_path = PathBuf::from(v.trim());
        }
        if let Some(v) = lookup("FASTPATH_TOOL_TIMEOUT_MS") {
            self.executor.timeout_ms = parse_override("FASTPATH_TOOL_TIMEOUT_MS", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check thresholds and capacities for consistency.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("deterministic_threshold", self.deterministic_threshold),
            ("statistical_high_threshold", self.statistical_high_threshold),
            ("statistical_attempt_threshold", self.statistical_attempt_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(IntentError::Config {
                    reason: format!("{name} must be within [0, 1], got {value}"),
                });
            }
        }
        if self.statistical_attempt_threshold > self.statistical_high_threshold {
            return Err(IntentError::Config {
                reason: format!(
                    "statistical_attempt_threshold ({}) exceeds statistical_high_threshold ({})",
                    self.statistical_attempt_threshold, self.statistical_high_threshold
                ),
            });
        }
        if self.telemetry_capacity == 0 {
            return Err(IntentError::Config {
                reason: "telemetry_capacity must be positive".into(),
            });
        }
        if self.executor.latency_window == 0 {
            return Err(IntentError::Config {
                reason: "executor.latency_window must be positive".into(),
            });
        }
        Ok(())
    }

    /// Whether `intent` is declined in the middle confidence band.
    pub fn is_parameterless(&self, intent: &str) -> bool {
        self.parameterless_intents.iter().any(|i| i == intent)
    }

    pub fn with_deterministic_threshold(mut self, threshold: f64) -> Self {
        self.deterministic_threshold = threshold;
        self
    }

    pub fn with_statistical_thresholds(mut self, high: f64, attempt: f64) -> Self {
        self.statistical_high_threshold = high;
        self.statistical_attempt_threshold = attempt;
        self
    }

    pub fn with_telemetry_capacity(mut self, capacity: usize) -> Self {
        self.telemetry_capacity = capacity;
        self
    }

    pub fn with_tool_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.executor.timeout_ms = timeout_ms;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.classifier.model_path = path.into();
        self
    }

    pub fn with_classifier_enabled(mut self, enabled: bool) -> Self {
        self.classifier.enabled = enabled;
        self
    }
}

fn parse_override<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| IntentError::Config {
        reason: format!("{key}={raw:?} is invalid: {e}"),
    })
}
