//! Routing telemetry.
//!
//! A fixed-capacity log of [`TelemetryEvent`]s, one per `route()` call.
//! Aggregates are derived from the retained events on every read; `record`
//! only appends.

use std::collections::HashMap;

use serde::Serialize;

use fastpath_kernel::{ClassificationTier, TelemetryEvent};

use crate::error::Result;
use crate::ring::BoundedLog;

/// Default capacity of the telemetry log.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Number of entries in [`TelemetryStats::top_tools`].
pub const TOP_TOOLS: usize = 10;

/// Number of entries in [`TelemetryStats::recent`].
pub const RECENT_EVENTS: usize = 10;

/// Aggregates for one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierStats {
    pub tier: ClassificationTier,
    pub count: usize,
    /// Share of all retained events that terminated at this tier.
    pub coverage: f64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolUsage {
    pub tool_name: String,
    pub count: usize,
}

/// Snapshot of derived telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryStats {
    pub total_events: usize,
    /// One entry per tier, in evaluation order.
    pub tiers: Vec<TierStats>,
    pub success_rate: f64,
    /// Most-invoked tools, most frequent first.
    pub top_tools: Vec<ToolUsage>,
    /// Newest events, oldest first.
    pub recent: Vec<TelemetryEvent>,
}

impl TelemetryStats {
    pub fn tier(&self, tier: ClassificationTier) -> Option<&TierStats> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

/// Bounded routing-outcome log.
#[derive(Debug)]
pub struct TelemetryManager {
    log: BoundedLog<TelemetryEvent>,
}

impl Default for TelemetryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TelemetryManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: BoundedLog::new(capacity),
        }
    }

    pub fn record(&self, event: TelemetryEvent) {
        tracing::trace!(
            tier = %event.tier,
            success = event.success,
            latency_ms = event.latency_ms,
            "telemetry event recorded"
        );
        self.log.push(event);
    }

    /// Derive statistics from the retained events.
    pub fn get_stats(&self) -> TelemetryStats {
        let events = self.log.snapshot();
        let total = events.len();

        let tiers = ClassificationTier::ALL
            .iter()
            .map(|&tier| {
                let latencies: Vec<u64> = events
                    .iter()
                    .filter(|e| e.tier == tier)
                    .map(|e| e.latency_ms)
                    .collect();
                TierStats {
                    tier,
                    count: latencies.len(),
                    coverage: ratio(latencies.len(), total),
                    avg_latency_ms: mean(&latencies),
                }
            })
            .collect();

        let successes = events.iter().filter(|e| e.success).count();

        let mut usage: HashMap<&str, usize> = HashMap::new();
        for name in events.iter().filter_map(|e| e.tool_name.as_deref()) {
            *usage.entry(name).or_default() += 1;
        }
        let mut top_tools: Vec<ToolUsage> = usage
            .into_iter()
            .map(|(name, count)| ToolUsage {
                tool_name: name.to_string(),
                count,
            })
            .collect();
        top_tools.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tool_name.cmp(&b.tool_name)));
        top_tools.truncate(TOP_TOOLS);

        let recent = events[total.saturating_sub(RECENT_EVENTS)..].to_vec();

        TelemetryStats {
            total_events: total,
            tiers,
            success_rate: ratio(successes, total),
            top_tools,
            recent,
        }
    }

    /// Every retained event, oldest first.
    pub fn export(&self) -> Vec<TelemetryEvent> {
        self.log.snapshot()
    }

    /// Retained events as a pretty-printed JSON array.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.log.snapshot())?)
    }

    pub fn clear(&self) {
        self.log.clear();
        tracing::debug!("telemetry cleared");
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.log.capacity()
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<u64>() as f64 / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(query: &str, tier: ClassificationTier, tool: Option<&str>, ok: bool, ms: u64) -> TelemetryEvent {
        let event = TelemetryEvent::new(query, tier, ok, ms);
        match tool {
            Some(t) => event.with_tool(t),
            None => event,
        }
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = TelemetryManager::default().get_stats();
        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.tiers.len(), 3);
        assert!(stats.tiers.iter().all(|t| t.count == 0 && t.coverage == 0.0));
        assert!(stats.top_tools.is_empty());
    }

    #[test]
    fn ring_keeps_most_recent_in_order() {
        let telemetry = TelemetryManager::new(5);
        for i in 0..8 {
            telemetry.record(event(&format!("q{i}"), ClassificationTier::Fallback, None, false, 1));
        }
        let exported: Vec<String> = telemetry.export().into_iter().map(|e| e.query).collect();
        assert_eq!(exported, vec!["q3", "q4", "q5", "q6", "q7"]);
        assert_eq!(telemetry.len(), 5);
        assert_eq!(telemetry.capacity(), 5);
    }

    #[test]
    fn derives_tier_coverage_and_latency() {
        let telemetry = TelemetryManager::new(100);
        telemetry.record(event("mute", ClassificationTier::Deterministic, Some("system_volume"), true, 2));
        telemetry.record(event("mute", ClassificationTier::Deterministic, Some("system_volume"), true, 4));
        telemetry.record(event("louder pls", ClassificationTier::Statistical, Some("system_volume"), true, 30));
        telemetry.record(event("???", ClassificationTier::Fallback, None, false, 10));

        let stats = telemetry.get_stats();
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.success_rate, 0.75);

        let det = stats.tier(ClassificationTier::Deterministic).unwrap();
        assert_eq!(det.count, 2);
        assert_eq!(det.coverage, 0.5);
        assert_eq!(det.avg_latency_ms, 3.0);
        assert_eq!(stats.tier(ClassificationTier::Fallback).unwrap().coverage, 0.25);

        assert_eq!(
            stats.top_tools,
            vec![ToolUsage {
                tool_name: "system_volume".into(),
                count: 3
            }]
        );
        // Reading does not mutate.
        assert_eq!(telemetry.len(), 4);
    }

    #[test]
    fn top_tools_break_ties_by_name() {
        let telemetry = TelemetryManager::new(100);
        for tool in ["b", "a", "c", "c"] {
            telemetry.record(event("x", ClassificationTier::Deterministic, Some(tool), true, 1));
        }
        let names: Vec<String> = telemetry
            .get_stats()
            .top_tools
            .into_iter()
            .map(|t| t.tool_name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn recent_window_is_bounded() {
        let telemetry = TelemetryManager::new(100);
        for i in 0..25 {
            telemetry.record(event(&i.to_string(), ClassificationTier::Fallback, None, false, 1));
        }
        let recent = telemetry.get_stats().recent;
        assert_eq!(recent.len(), RECENT_EVENTS);
        assert_eq!(recent[0].query, "15");
        assert_eq!(recent[9].query, "24");
    }

    #[test]
    fn export_json_and_clear() {
        let telemetry = TelemetryManager::new(10);
        telemetry.record(event("mute", ClassificationTier::Deterministic, Some("system_volume"), true, 1));
        let json: serde_json::Value = serde_json::from_str(&telemetry.export_json().unwrap()).unwrap();
        assert_eq!(json[0]["tier"], "deterministic");
        assert_eq!(json[0]["tool_name"], "system_volume");

        telemetry.clear();
        assert!(telemetry.is_empty());
    }
}
