//! Tiered intent router.
//!
//! [`IntentRouter::route`] walks a query through the cascade in strict order:
//!
//! 1. **Deterministic** -- the regex tables.  A match at or above
//!    `deterministic_threshold` is executed immediately.
//! 2. **Statistical** -- the bag-of-words classifier, skipped when no model
//!    is loaded.  Predictions at or above `statistical_high_threshold` are
//!    executed; predictions in the band down to
//!    `statistical_attempt_threshold` are executed unless the intent is
//!    parameterless.
//! 3. **Fallback** -- nothing resolved the query; the result tells the host
//!    to escalate to its LLM handler.
//!
//! A tier whose tool execution fails does not retry.  The failure is carried
//! forward and reported on the final result, and the next tier still runs.
//! Exactly one telemetry event is recorded per call.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use fastpath_kernel::{
    ClassificationTier, ParameterExtractor, PatternMatcher, RouteResult, TelemetryEvent,
};

use crate::classifier::{ClassifierState, FileBackend, StatisticalClassifier};
use crate::config::RouterConfig;
use crate::error::Result;
use crate::executor::{ToolExecutor, panic_message};
use crate::registry::ToolRegistry;
use crate::telemetry::TelemetryManager;

/// A tier that matched but whose execution failed.
#[derive(Debug)]
struct Failure {
    tier: ClassificationTier,
    tool_name: String,
    error: String,
}

/// The cascading intent router.
pub struct IntentRouter {
    config: RouterConfig,
    matcher: PatternMatcher,
    extractor: ParameterExtractor,
    classifier: Arc<StatisticalClassifier>,
    executor: Arc<ToolExecutor>,
    telemetry: Arc<TelemetryManager>,
}

impl IntentRouter {
    /// Assemble a router from explicit parts.
    pub fn new(
        config: RouterConfig,
        matcher: PatternMatcher,
        classifier: Arc<StatisticalClassifier>,
        executor: Arc<ToolExecutor>,
    ) -> Result<Self> {
        config.validate()?;
        let telemetry = Arc::new(TelemetryManager::new(config.telemetry_capacity));
        Ok(Self {
            extractor: ParameterExtractor::new()?,
            config,
            matcher,
            classifier,
            executor,
            telemetry,
        })
    }

    /// Build a router with the built-in rule tables, the configured model
    /// file and `registry` as the tool source.
    pub fn from_config(config: RouterConfig, registry: ToolRegistry) -> Result<Self> {
        let classifier = if config.classifier.enabled {
            StatisticalClassifier::new(Arc::new(FileBackend::new(&config.classifier.model_path)))
        } else {
            StatisticalClassifier::disabled()
        };
        let executor = ToolExecutor::new(registry, config.executor.clone());
        Self::new(
            config,
            PatternMatcher::builtin()?,
            Arc::new(classifier),
            Arc::new(executor),
        )
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn classifier(&self) -> &Arc<StatisticalClassifier> {
        &self.classifier
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    pub fn telemetry(&self) -> &Arc<TelemetryManager> {
        &self.telemetry
    }

    /// Load the statistical model now instead of on the first route.
    pub async fn warm_up(&self) -> ClassifierState {
        self.classifier.initialize().await;
        self.classifier.state()
    }

    /// Route one query.  Never fails and never panics: every outcome,
    /// including an internal fault, is reported on the returned result.
    pub async fn route(&self, query: &str) -> RouteResult {
        let start = Instant::now();

        let result = match AssertUnwindSafe(self.route_inner(query)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(error = %message, "router fault, degrading to fallback");
                RouteResult::unhandled(format!("internal router fault: {message}"))
            }
        };

        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.record(query, &result, latency_ms);
        result
    }

    async fn route_inner(&self, query: &str) -> RouteResult {
        let mut failure: Option<Failure> = None;

        // -- Deterministic ----------------------------------------------------
        let pattern = self.matcher.match_query(query);
        if pattern.matched && pattern.confidence >= self.config.deterministic_threshold {
            let params = pattern.params.clone().unwrap_or_default();
            let exec = self
                .executor
                .execute_for_tier(&pattern.tool_name, &params, ClassificationTier::Deterministic)
                .await;
            if exec.success {
                tracing::info!(
                    tier = %ClassificationTier::Deterministic,
                    tool = %pattern.tool_name,
                    confidence = pattern.confidence,
                    "query handled"
                );
                return RouteResult::handled(
                    ClassificationTier::Deterministic,
                    pattern.tool_name,
                    pattern.confidence,
                    exec.response,
                );
            }
            failure = Some(Failure {
                tier: ClassificationTier::Deterministic,
                tool_name: pattern.tool_name.clone(),
                error: exec.error.unwrap_or_else(|| exec.response.clone()),
            });
        } else if pattern.matched {
            tracing::debug!(
                tool = %pattern.tool_name,
                confidence = pattern.confidence,
                threshold = self.config.deterministic_threshold,
                "deterministic match below threshold"
            );
        }

        // -- Statistical ------------------------------------------------------
        self.classifier.initialize().await;
        let statistical_confidence = if self.classifier.is_available() {
            let prediction = self.classifier.classify(query);
            if self.should_execute(&prediction.intent, prediction.confidence) {
                let params = self.extractor.extract(query, &prediction.intent);
                let exec = self
                    .executor
                    .execute_for_tier(&prediction.intent, &params, ClassificationTier::Statistical)
                    .await;
                if exec.success {
                    tracing::info!(
                        tier = %ClassificationTier::Statistical,
                        tool = %prediction.intent,
                        confidence = prediction.confidence,
                        "query handled"
                    );
                    return RouteResult::handled(
                        ClassificationTier::Statistical,
                        prediction.intent,
                        prediction.confidence,
                        exec.response,
                    );
                }
                failure = Some(Failure {
                    tier: ClassificationTier::Statistical,
                    tool_name: prediction.intent.clone(),
                    error: exec.error.unwrap_or_else(|| exec.response.clone()),
                });
            } else {
                tracing::debug!(
                    intent = %prediction.intent,
                    confidence = prediction.confidence,
                    "statistical tier declined"
                );
            }
            Some(prediction.confidence)
        } else {
            None
        };

        // -- Fallback ---------------------------------------------------------
        let statistical = match statistical_confidence {
            Some(c) => format!("{c:.2}"),
            None => "unavailable".to_string(),
        };
        let confidences = format!(
            "deterministic confidence {:.2}, statistical confidence {statistical}",
            pattern.confidence
        );

        match failure {
            Some(f) => {
                tracing::debug!(
                    original_tier = %f.tier,
                    tool = %f.tool_name,
                    "escalating after execution failure"
                );
                RouteResult::unhandled(format!(
                    "{} tier matched `{}` but execution failed ({confidences})",
                    f.tier, f.tool_name
                ))
                .with_failure(f.tier, f.tool_name, f.error)
            }
            None => {
                tracing::debug!(%confidences, "escalating to fallback");
                RouteResult::unhandled(format!("no tier resolved the query ({confidences})"))
            }
        }
    }

    /// Statistical gating: execute above the high threshold, and in the
    /// middle band only for intents that take parameters.
    fn should_execute(&self, intent: &str, confidence: f64) -> bool {
        if intent == fastpath_kernel::ClassificationResult::UNKNOWN {
            return false;
        }
        if confidence >= self.config.statistical_high_threshold {
            return true;
        }
        confidence >= self.config.statistical_attempt_threshold
            && !self.config.is_parameterless(intent)
    }

    fn record(&self, query: &str, result: &RouteResult, latency_ms: u64) {
        let tier = result.tier.unwrap_or(ClassificationTier::Fallback);
        let mut event = TelemetryEvent::new(query, tier, result.handled, latency_ms);
        if let Some(tool) = result.tool_name.as_ref().or(result.failed_tool_name.as_ref()) {
            event = event.with_tool(tool.as_str());
        }
        if let Some(confidence) = result.confidence {
            event = event.with_confidence(confidence);
        }
        if let Some(error) = &result.failed_error {
            event = event.with_error(error.as_str());
        }
        self.telemetry.record(event);
    }
}

impl std::fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRouter")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .field("executor", &self.executor)
            .finish()
    }
}
