//! Deterministic regex-table matcher.
//!
//! Rules are grouped by intent into two ordered tables:
//!
//! | Table | Rules | Evaluated |
//! |-------|-------|-----------|
//! | Action | Regex + confidence + parameter extractor | First |
//! | Query | Regex + confidence, no parameters | Second |
//!
//! Within a table, intents are visited in declaration order and rules within
//! an intent in declaration order.  The first rule whose regex matches (and,
//! for action rules, whose extractor succeeds) wins.  Action rules come first
//! so that a parameterised intent is never shadowed by a broader
//! zero-parameter rule for the same phrase.
//!
//! # Example
//!
//! ```rust
//! # use fastpath_kernel::patterns::PatternMatcher;
//! # use fastpath_kernel::Params;
//! let mut matcher = PatternMatcher::new();
//! matcher
//!     .add_action_rule("greet", r"(?i)^say hi to (?P<name>\w+)$", 0.97, |caps| {
//!         let mut params = Params::new();
//!         params.insert("name".into(), caps["name"].into());
//!         Ok(params)
//!     })
//!     .unwrap();
//!
//! let result = matcher.match_query("say hi to alice");
//! assert!(result.matched);
//! assert_eq!(result.tool_name, "greet");
//! ```

use std::sync::Arc;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::catalogue;
use crate::error::{KernelError, Result};
use crate::types::Params;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Turns the captures of a matched action rule into tool parameters.
///
/// Returning an error marks the rule as a non-match; matching continues with
/// the next rule.
pub type ExtractorFn = Arc<dyn Fn(&Captures<'_>) -> Result<Params> + Send + Sync>;

/// A single compiled rule.
#[derive(Clone)]
pub struct PatternRule {
    /// The compiled regex.
    compiled: Regex,
    /// Confidence in `[0, 1]` reported when this rule matches.
    pub confidence: f64,
    /// Parameter extractor; `None` for query rules.
    extractor: Option<ExtractorFn>,
}

impl PatternRule {
    /// The original pattern string.
    pub fn pattern(&self) -> &str {
        self.compiled.as_str()
    }

    /// Whether this rule produces parameters.
    pub fn is_action(&self) -> bool {
        self.extractor.is_some()
    }
}

impl std::fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRule")
            .field("pattern", &self.pattern())
            .field("confidence", &self.confidence)
            .field("action", &self.is_action())
            .finish()
    }
}

/// The rules registered for one intent.
#[derive(Debug, Clone)]
struct IntentRules {
    intent: String,
    rules: Vec<PatternRule>,
}

/// Outcome of [`PatternMatcher::match_query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// The matched intent, which doubles as the tool name.  Empty when
    /// nothing matched.
    pub tool_name: String,
    /// Confidence of the matching rule, `0.0` when nothing matched.
    pub confidence: f64,
    /// Parameters produced by an action rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    pub matched: bool,
}

impl PatternMatch {
    /// The result reported when no rule matched.
    pub fn none() -> Self {
        Self {
            tool_name: String::new(),
            confidence: 0.0,
            params: None,
            matched: false,
        }
    }
}

// ---------------------------------------------------------------------------
// PatternMatcher
// ---------------------------------------------------------------------------

/// Ordered regex tables mapping user text to intents.
///
/// The tables are read-only once construction is finished, so the matcher can
/// be shared behind an `Arc` without locking.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    /// Parameterised intents, evaluated first.
    action_intents: Vec<IntentRules>,
    /// Zero-parameter intents, evaluated second.
    query_intents: Vec<IntentRules>,
}

impl PatternMatcher {
    /// Create a matcher with empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher preloaded with the built-in intent catalogue.
    pub fn builtin() -> Result<Self> {
        let mut matcher = Self::new();
        catalogue::install(&mut matcher)?;
        tracing::debug!(
            action_rules = matcher.action_rule_count(),
            query_rules = matcher.query_rule_count(),
            "built-in pattern tables compiled"
        );
        Ok(matcher)
    }

    /// Register a parameterised rule for `intent`.
    ///
    /// Rules for an intent already in the table are appended after its
    /// existing rules; a new intent is appended after all existing intents.
    pub fn add_action_rule<F>(
        &mut self,
        intent: impl Into<String>,
        pattern: &str,
        confidence: f64,
        extractor: F,
    ) -> Result<()>
    where
        F: Fn(&Captures<'_>) -> Result<Params> + Send + Sync + 'static,
    {
        let intent = intent.into();
        let rule = compile_rule(&intent, pattern, confidence, Some(Arc::new(extractor)))?;
        push_rule(&mut self.action_intents, intent, rule);
        Ok(())
    }

    /// Register a zero-parameter rule for `intent`.
    pub fn add_query_rule(
        &mut self,
        intent: impl Into<String>,
        pattern: &str,
        confidence: f64,
    ) -> Result<()> {
        let intent = intent.into();
        let rule = compile_rule(&intent, pattern, confidence, None)?;
        push_rule(&mut self.query_intents, intent, rule);
        Ok(())
    }

    /// Match a query against the action table, then the query table.
    ///
    /// Only surrounding whitespace is normalised; case handling is up to each
    /// regex.  An extractor error skips that rule and matching continues.
    pub fn match_query(&self, query: &str) -> PatternMatch {
        let query = query.trim();
        if query.is_empty() {
            return PatternMatch::none();
        }

        for entry in &self.action_intents {
            for rule in &entry.rules {
                let Some(caps) = rule.compiled.captures(query) else {
                    continue;
                };
                let Some(extractor) = &rule.extractor else {
                    continue;
                };
                match extractor(&caps) {
                    Ok(params) => {
                        tracing::trace!(intent = %entry.intent, pattern = rule.pattern(), "action rule matched");
                        return PatternMatch {
                            tool_name: entry.intent.clone(),
                            confidence: rule.confidence,
                            params: Some(params),
                            matched: true,
                        };
                    }
                    Err(e) => {
                        tracing::debug!(
                            intent = %entry.intent,
                            pattern = rule.pattern(),
                            error = %e,
                            "extractor rejected match, trying next rule"
                        );
                    }
                }
            }
        }

        for entry in &self.query_intents {
            if let Some(rule) = entry.rules.iter().find(|r| r.compiled.is_match(query)) {
                tracing::trace!(intent = %entry.intent, pattern = rule.pattern(), "query rule matched");
                return PatternMatch {
                    tool_name: entry.intent.clone(),
                    confidence: rule.confidence,
                    params: None,
                    matched: true,
                };
            }
        }

        PatternMatch::none()
    }

    /// Intent names of the action table, in declaration order.
    pub fn action_intents(&self) -> Vec<&str> {
        self.action_intents.iter().map(|e| e.intent.as_str()).collect()
    }

    /// Intent names of the query table, in declaration order.
    pub fn query_intents(&self) -> Vec<&str> {
        self.query_intents.iter().map(|e| e.intent.as_str()).collect()
    }

    /// Return the number of registered action rules.
    pub fn action_rule_count(&self) -> usize {
        self.action_intents.iter().map(|e| e.rules.len()).sum()
    }

    /// Return the number of registered query rules.
    pub fn query_rule_count(&self) -> usize {
        self.query_intents.iter().map(|e| e.rules.len()).sum()
    }
}

// -- Private helpers --------------------------------------------------------

fn compile_rule(
    intent: &str,
    pattern: &str,
    confidence: f64,
    extractor: Option<ExtractorFn>,
) -> Result<PatternRule> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(KernelError::InvalidConfidence {
            intent: intent.to_string(),
            confidence,
        });
    }

    let compiled = Regex::new(pattern).map_err(|e| KernelError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    Ok(PatternRule {
        compiled,
        confidence,
        extractor,
    })
}

fn push_rule(table: &mut Vec<IntentRules>, intent: String, rule: PatternRule) {
    match table.iter_mut().find(|e| e.intent == intent) {
        Some(entry) => entry.rules.push(rule),
        None => table.push(IntentRules {
            intent,
            rules: vec![rule],
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
