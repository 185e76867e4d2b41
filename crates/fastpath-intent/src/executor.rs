//! Tool executor.
//!
//! Looks up a handler in the [`ToolRegistry`], invokes it with the extracted
//! parameters and normalises whatever comes back into a
//! [`ToolExecutionResult`].  Nothing escapes as an error: missing tools,
//! handler errors, panics, timeouts and soft failures all become
//! `success == false` results.  Every call appends exactly one
//! [`ExecutionRecord`] to a bounded latency window.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use fastpath_kernel::{ClassificationTier, Params, ToolExecutionResult};

use crate::config::ExecutorConfig;
use crate::registry::ToolRegistry;
use crate::ring::BoundedLog;

/// Response prefixes that mark a normally-returned handler result as failed.
/// Compared case-insensitively against the start of the response.
pub const SOFT_FAILURE_PREFIXES: [&str; 6] = [
    "failed to ",
    "error:",
    "error executing",
    "could not ",
    "unable to ",
    "cannot ",
];

/// Whether `response` signals failure by textual convention.
pub fn is_soft_failure(response: &str) -> bool {
    let head = response.trim_start();
    SOFT_FAILURE_PREFIXES.iter().any(|prefix| {
        head.get(..prefix.len())
            .is_some_and(|h| h.eq_ignore_ascii_case(prefix))
    })
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub tool_name: String,
    /// Tier that requested the execution, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<ClassificationTier>,
    pub latency_ms: u64,
    pub timestamp_ms: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Latency summary for one tool over the retained window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolLatency {
    pub tool_name: String,
    pub count: usize,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Invokes registered tool handlers.
pub struct ToolExecutor {
    registry: ToolRegistry,
    config: ExecutorConfig,
    history: BoundedLog<ExecutionRecord>,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, config: ExecutorConfig) -> Self {
        let history = BoundedLog::new(config.latency_window);
        Self {
            registry,
            config,
            history,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `tool_name` outside of any routing tier.
    pub async fn execute(&self, tool_name: &str, params: &Params) -> ToolExecutionResult {
        self.run(tool_name, params, None).await
    }

    /// Execute `tool_name` on behalf of `tier`.
    pub async fn execute_for_tier(
        &self,
        tool_name: &str,
        params: &Params,
        tier: ClassificationTier,
    ) -> ToolExecutionResult {
        self.run(tool_name, params, Some(tier)).await
    }

    async fn run(
        &self,
        tool_name: &str,
        params: &Params,
        tier: Option<ClassificationTier>,
    ) -> ToolExecutionResult {
        let start = Instant::now();
        let result = self.invoke(tool_name, params).await;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if result.success {
            tracing::debug!(tool = %tool_name, latency_ms, "tool executed");
        } else {
            tracing::warn!(
                tool = %tool_name,
                latency_ms,
                error = result.error.as_deref().unwrap_or_default(),
                "tool execution failed"
            );
        }

        self.history.push(ExecutionRecord {
            tool_name: tool_name.to_string(),
            tier,
            latency_ms,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            success: result.success,
            error: result.error.clone(),
        });
        result
    }

    async fn invoke(&self, tool_name: &str, params: &Params) -> ToolExecutionResult {
        let handler = match self.registry.handler(tool_name) {
            Ok(handler) => handler,
            Err(e) => return ToolExecutionResult::failed(e.to_string()),
        };

        let call = AssertUnwindSafe(handler.call(params)).catch_unwind();
        let outcome = match self.config.timeout() {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return ToolExecutionResult::failed(format!(
                        "timed out after {} ms",
                        self.config.timeout_ms
                    ));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(value)) => normalize_output(value),
            Ok(Err(e)) => ToolExecutionResult::failed(e.to_string()),
            Err(panic) => ToolExecutionResult::failed(format!(
                "tool panicked: {}",
                panic_message(panic.as_ref())
            )),
        }
    }

    /// Whether `tool_name` is registered with a handler.
    pub fn has_tool_available(&self, tool_name: &str) -> bool {
        self.registry.handler(tool_name).is_ok()
    }

    /// Sorted names of every tool that can currently be executed.
    pub fn get_available_tools(&self) -> Vec<String> {
        self.registry
            .names()
            .into_iter()
            .filter(|name| self.has_tool_available(name))
            .collect()
    }

    /// Retained execution records, oldest first.
    pub fn recent_executions(&self) -> Vec<ExecutionRecord> {
        self.history.snapshot()
    }

    /// Latency summary for `tool_name`, or `None` if it has no retained
    /// executions.
    pub fn tool_latency(&self, tool_name: &str) -> Option<ToolLatency> {
        let latencies: Vec<u64> = self
            .history
            .snapshot()
            .into_iter()
            .filter(|r| r.tool_name == tool_name)
            .map(|r| r.latency_ms)
            .collect();
        if latencies.is_empty() {
            return None;
        }
        let total: u64 = latencies.iter().sum();
        Some(ToolLatency {
            tool_name: tool_name.to_string(),
            count: latencies.len(),
            avg_latency_ms: total as f64 / latencies.len() as f64,
            max_latency_ms: latencies.iter().copied().max().unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("history_len", &self.history.len())
            .finish()
    }
}

fn normalize_output(value: Value) -> ToolExecutionResult {
    let response = match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => match serde_json::to_string(&other) {
            Ok(s) => s,
            Err(e) => return ToolExecutionResult::failed(format!("unserialisable tool output: {e}")),
        },
    };
    if is_soft_failure(&response) {
        ToolExecutionResult::soft_failure(response)
    } else {
        ToolExecutionResult::ok(response)
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::error::IntentError;
    use crate::registry::handler_fn;

    fn executor(registry: ToolRegistry) -> ToolExecutor {
        ToolExecutor::new(registry, ExecutorConfig::default())
    }

    #[test]
    fn soft_failure_prefixes() {
        assert!(is_soft_failure("Failed to open file"));
        assert!(is_soft_failure("  ERROR: disk full"));
        assert!(is_soft_failure("Error executing command"));
        assert!(is_soft_failure("could not find window"));
        assert!(is_soft_failure("Unable to connect"));
        assert!(is_soft_failure("Cannot parse"));
        assert!(!is_soft_failure("Volume set to 40"));
        assert!(!is_soft_failure("No errors found"));
        assert!(!is_soft_failure("Cannotbe"));
        assert!(!is_soft_failure("é"));
    }

    #[tokio::test]
    async fn string_output_passes_through() {
        let registry = ToolRegistry::new();
        registry.register("t", "", handler_fn(|_| async { Ok(json!("done")) }));
        let result = executor(registry).execute("t", &Params::new()).await;
        assert_eq!(result, ToolExecutionResult::ok("done"));
    }

    #[tokio::test]
    async fn structured_output_is_serialized() {
        let registry = ToolRegistry::new();
        registry.register(
            "t",
            "",
            handler_fn(|_| async { Ok(json!({"level": 40, "muted": false})) }),
        );
        let result = executor(registry).execute("t", &Params::new()).await;
        assert!(result.success);
        let parsed: Value = serde_json::from_str(&result.response).unwrap();
        assert_eq!(parsed, json!({"level": 40, "muted": false}));
    }

    #[tokio::test]
    async fn soft_failure_is_reclassified() {
        let registry = ToolRegistry::new();
        registry.register(
            "open_file",
            "",
            handler_fn(|_| async { Ok(json!("Failed to open file")) }),
        );
        let result = executor(registry).execute("open_file", &Params::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Failed to open file"));
    }

    #[tokio::test]
    async fn handler_error_becomes_failure() {
        let registry = ToolRegistry::new();
        registry.register(
            "t",
            "",
            handler_fn(|_| async {
                Err(IntentError::ToolExecution {
                    tool_name: "t".into(),
                    reason: "device busy".into(),
                })
            }),
        );
        let result = executor(registry).execute("t", &Params::new()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("device busy"));
    }

    #[tokio::test]
    async fn handler_panic_becomes_failure() {
        let registry = ToolRegistry::new();
        registry.register(
            "t",
            "",
            handler_fn(|_| async {
                if true {
                    panic!("boom");
                }
                Ok(Value::Null)
            }),
        );
        let result = executor(registry).execute("t", &Params::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("tool panicked: boom"));
    }

    #[tokio::test]
    async fn missing_and_declared_tools_fail_with_reason() {
        let registry = ToolRegistry::new();
        registry.declare("declared", "");
        let exec = executor(registry);

        let missing = exec.execute("absent", &Params::new()).await;
        assert_eq!(missing.error.as_deref(), Some("tool not found: absent"));

        let declared = exec.execute("declared", &Params::new()).await;
        assert!(declared.error.unwrap().contains("no handler"));

        assert_eq!(exec.recent_executions().len(), 2);
        assert!(!exec.has_tool_available("declared"));
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let registry = ToolRegistry::new();
        registry.register(
            "slow",
            "",
            handler_fn(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!("late"))
            }),
        );
        let exec = ToolExecutor::new(
            registry,
            ExecutorConfig {
                timeout_ms: 100,
                ..ExecutorConfig::default()
            },
        );
        let result = exec.execute("slow", &Params::new()).await;
        assert_eq!(result.error.as_deref(), Some("timed out after 100 ms"));
    }

    #[tokio::test]
    async fn records_every_call_with_tier() {
        let registry = ToolRegistry::new();
        registry.register("a", "", handler_fn(|_| async { Ok(json!("ok")) }));
        registry.register("b", "", handler_fn(|_| async { Ok(json!("ok")) }));
        let exec = executor(registry);

        exec.execute_for_tier("a", &Params::new(), ClassificationTier::Deterministic)
            .await;
        exec.execute_for_tier("a", &Params::new(), ClassificationTier::Statistical)
            .await;
        exec.execute("b", &Params::new()).await;

        let records = exec.recent_executions();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].tier, Some(ClassificationTier::Deterministic));
        assert_eq!(records[2].tier, None);

        let latency = exec.tool_latency("a").unwrap();
        assert_eq!(latency.count, 2);
        assert!(exec.tool_latency("zzz").is_none());
        assert_eq!(exec.get_available_tools(), vec!["a", "b"]);
    }
}
