//! Per-intent parameter extraction.
//!
//! The statistical tier only yields an intent label, so the parameters a tool
//! needs are recovered from the raw text here.  Every intent owns a cascade of
//! candidate regexes; the first one that matches *and* whose builder accepts
//! the captures decides the result.  Intents with no usable signal fall back
//! to fixed defaults (volume "up" means level 75, "down" means 25) or to an
//! empty map.  Extraction never fails: an unrecognised shape is `{}`.
//!
//! Numeric policies:
//!
//! - Levels are rounded to the nearest integer and clamped to `[0, 100]`.
//! - Durations are whole minutes: hours × 60 and fractional minutes are
//!   rounded up, seconds are divided down to minutes but never below one.

use std::collections::HashMap;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::catalogue::intents;
use crate::error::{KernelError, Result};
use crate::types::Params;

/// Level used when the user asks for "louder" / "brighter" without a number.
pub const DEFAULT_LEVEL_UP: u64 = 75;

/// Level used when the user asks for "quieter" / "dimmer" without a number.
pub const DEFAULT_LEVEL_DOWN: u64 = 25;

type Builder = fn(&Captures<'_>) -> Option<Params>;

/// One candidate regex in an intent's cascade.
struct Step {
    regex: Regex,
    build: Builder,
}

/// The cascade for one intent.
///
/// `extras` run only after a primary step succeeded; each one that matches
/// merges its parameters into the result (e.g. a timer label).
struct Strategy {
    steps: Vec<Step>,
    extras: Vec<Step>,
}

// ---------------------------------------------------------------------------
// Cascades
// ---------------------------------------------------------------------------

const VOLUME_STEPS: &[(&str, Builder)] = &[
    (r"(?i)\b(?P<action>unmute|mute)\b", build_mute),
    (r"(?i)\b(?:to|at)\s+(?P<level>\d+(?:\.\d+)?)\s*(?:%|percent)?", build_set_level),
    (r"(?i)\b(?P<level>\d+(?:\.\d+)?)\s*(?:%|percent)", build_set_level),
    (r"(?i)\b(?:up|increase|raise|louder|higher|boost)\b", build_level_up),
    (r"(?i)\b(?:down|decrease|lower|quieter|softer|reduce)\b", build_level_down),
    (r"(?i)\b(?P<level>\d+(?:\.\d+)?)\b", build_set_level),
];

const BRIGHTNESS_STEPS: &[(&str, Builder)] = &[
    (r"(?i)\b(?:to|at)\s+(?P<level>\d+(?:\.\d+)?)\s*(?:%|percent)?", build_set_level),
    (r"(?i)\b(?P<level>\d+(?:\.\d+)?)\s*(?:%|percent)", build_set_level),
    (r"(?i)\b(?:up|increase|raise|brighter|brighten|higher)\b", build_level_up),
    (r"(?i)\b(?:down|decrease|lower|dimmer|dim|darker|reduce)\b", build_level_down),
    (r"(?i)\b(?P<level>\d+(?:\.\d+)?)\b", build_set_level),
];

const TIMER_STEPS: &[(&str, Builder)] = &[
    (r"(?i)(?P<amount>\d+(?:\.\d+)?)\s*(?P<unit>hours?|hrs?|h)\b", build_duration),
    (r"(?i)(?P<amount>\d+(?:\.\d+)?)\s*(?P<unit>minutes?|mins?|m)\b", build_duration),
    (r"(?i)(?P<amount>\d+(?:\.\d+)?)\s*(?P<unit>seconds?|secs?|s)\b", build_duration),
    (r"(?i)\bhalf\s+an?\s+hour\b", build_half_hour),
    (r"(?i)\b(?:an|one)\s+hour\b", build_one_hour),
];

const TIMER_EXTRAS: &[(&str, Builder)] = &[(
    r"(?i)\b(?:to|for)\s+(?P<label>[a-z][a-z' ]*[a-z])\s*[.!?]?\s*$",
    build_label,
)];

const OPEN_APP_STEPS: &[(&str, Builder)] = &[
    (
        r"(?i)^\s*(?:please\s+)?(?:open|launch|start|run)\s+(?:up\s+)?(?:the\s+)?(?:app(?:lication)?\s+)?(?P<app>.+?)(?:\s+app(?:lication)?)?\s*[.!]?\s*$",
        build_app,
    ),
    (r"(?i)\b(?:open|launch|start)\s+(?P<app>[a-z0-9][\w.+-]*)", build_app),
];

const CLOSE_APP_STEPS: &[(&str, Builder)] = &[
    (
        r"(?i)^\s*(?:please\s+)?(?:close|quit|exit|kill)\s+(?:the\s+)?(?:app(?:lication)?\s+)?(?P<app>.+?)(?:\s+app(?:lication)?)?\s*[.!]?\s*$",
        build_app,
    ),
    (r"(?i)\b(?:close|quit|exit|kill)\s+(?P<app>[a-z0-9][\w.+-]*)", build_app),
];

const OPEN_URL_STEPS: &[(&str, Builder)] = &[
    (r"(?i)(?P<url>https?://\S+)", build_url),
    (
        r"(?i)\b(?P<url>(?:www\.)?[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.[a-z]{2,24}(?:/\S*)?)",
        build_url,
    ),
];

const WEB_SEARCH_STEPS: &[(&str, Builder)] = &[
    (
        r"(?i)\b(?:search|google|look\s+up|find)\s+(?:the\s+web\s+|online\s+|the\s+internet\s+)?(?:for\s+)?(?P<query>.+?)\s*\??\s*$",
        build_search_query,
    ),
    (r"(?i)^\s*(?P<query>.+?)\s*\??\s*$", build_search_query),
];

const NOTE_STEPS: &[(&str, Builder)] = &[
    (r#"["“](?P<content>[^"”]+)["”]"#, build_note),
    (r"(?i)\bnote\s*(?::|saying|that|to)?\s+(?P<content>.+)$", build_note),
    (
        r"(?i)\b(?:remember|jot\s+down|write\s+down)\s+(?:that\s+)?(?P<content>.+)$",
        build_note,
    ),
];

const FILE_SEARCH_STEPS: &[(&str, Builder)] = &[
    (r#"["“](?P<name>[^"”]+)["”]"#, build_file_name),
    (r"(?i)\b(?:named|called)\s+(?P<name>.+?)\s*\??\s*$", build_file_name),
    (r"(?i)\b(?P<name>[\w-]+\.[a-z0-9]{1,8})\b", build_file_name),
];

const WINDOW_STEPS: &[(&str, Builder)] = &[
    (r"(?i)\bsnap\b.*?\b(?P<side>left|right)\b", build_snap),
    (
        r"(?i)\b(?P<action>minimi[sz]e|maximi[sz]e|restore|fullscreen)\b",
        build_window_action,
    ),
    (r"(?i)\bclose\b.*\bwindow\b", build_window_close),
    (r"(?i)\b(?:next|switch)\b.*\bwindow\b", build_window_next),
];

const MEDIA_STEPS: &[(&str, Builder)] = &[
    (r"(?i)\b(?:skip|next)\b", build_media_next),
    (r"(?i)\b(?:previous|prev|go\s+back)\b", build_media_previous),
    (r"(?i)\b(?P<action>play|pause|resume|stop)\b", build_media_action),
];

// ---------------------------------------------------------------------------
// ParameterExtractor
// ---------------------------------------------------------------------------

/// Dispatches free text to the extraction cascade of a named intent.
pub struct ParameterExtractor {
    strategies: HashMap<&'static str, Strategy>,
}

impl ParameterExtractor {
    /// Compile the cascades for every built-in action intent.
    pub fn new() -> Result<Self> {
        let table: [(&'static str, &[(&str, Builder)], &[(&str, Builder)]); 11] = [
            (intents::SYSTEM_VOLUME, VOLUME_STEPS, &[]),
            (intents::SYSTEM_BRIGHTNESS, BRIGHTNESS_STEPS, &[]),
            (intents::SET_TIMER, TIMER_STEPS, TIMER_EXTRAS),
            (intents::OPEN_APPLICATION, OPEN_APP_STEPS, &[]),
            (intents::CLOSE_APPLICATION, CLOSE_APP_STEPS, &[]),
            (intents::OPEN_URL, OPEN_URL_STEPS, &[]),
            (intents::WEB_SEARCH, WEB_SEARCH_STEPS, &[]),
            (intents::CREATE_NOTE, NOTE_STEPS, &[]),
            (intents::FILE_SEARCH, FILE_SEARCH_STEPS, &[]),
            (intents::WINDOW_MANAGEMENT, WINDOW_STEPS, &[]),
            (intents::MEDIA_CONTROL, MEDIA_STEPS, &[]),
        ];

        let mut strategies = HashMap::with_capacity(table.len());
        for (intent, steps, extras) in table {
            strategies.insert(
                intent,
                Strategy {
                    steps: compile_steps(steps)?,
                    extras: compile_steps(extras)?,
                },
            );
        }

        Ok(Self { strategies })
    }

    /// Extract parameters for `intent` from `query`.
    ///
    /// Unknown intents and unrecognised phrasings both yield an empty map.
    pub fn extract(&self, query: &str, intent: &str) -> Params {
        let Some(strategy) = self.strategies.get(intent) else {
            return Params::new();
        };
        let text = query.trim();

        for step in &strategy.steps {
            let Some(caps) = step.regex.captures(text) else {
                continue;
            };
            let Some(mut params) = (step.build)(&caps) else {
                continue;
            };
            for extra in &strategy.extras {
                if let Some(more) = extra.regex.captures(text).and_then(|c| (extra.build)(&c)) {
                    params.extend(more);
                }
            }
            tracing::trace!(intent, params = ?params, "parameters extracted");
            return params;
        }

        tracing::trace!(intent, "no extraction cascade matched");
        Params::new()
    }

    /// Whether `intent` has an extraction cascade.
    pub fn supports(&self, intent: &str) -> bool {
        self.strategies.contains_key(intent)
    }
}

fn compile_steps(steps: &[(&str, Builder)]) -> Result<Vec<Step>> {
    steps
        .iter()
        .map(|(pattern, build)| {
            let regex = Regex::new(pattern).map_err(|e| KernelError::InvalidPattern {
                pattern: (*pattern).to_string(),
                reason: e.to_string(),
            })?;
            Ok(Step {
                regex,
                build: *build,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Shared numeric / text policies
// ---------------------------------------------------------------------------

/// Parse a level, round it to the nearest integer and clamp it to `[0, 100]`.
pub fn parse_level(raw: &str) -> Option<u64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 100.0) as u64)
}

/// Convert an amount and a unit word into whole minutes.
///
/// Hours and fractional minutes round up.  Seconds are divided down to
/// minutes with a floor of one minute, so `90 seconds` is one minute.
/// Non-positive amounts and unknown units are rejected.
pub fn duration_minutes(amount: &str, unit: &str) -> Option<u64> {
    let amount: f64 = amount.trim().parse().ok()?;
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }

    let minutes = match unit.trim().to_ascii_lowercase().chars().next()? {
        'h' => (amount * 60.0).ceil(),
        'm' => amount.ceil(),
        's' => (amount / 60.0).floor().max(1.0),
        _ => return None,
    };
    Some(minutes as u64)
}

/// Prefix bare domains with `https://` and drop trailing sentence punctuation.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches(['.', ',', ';', '!', '?', ')']);
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Build a parameter map from literal pairs.
pub fn params<const N: usize>(pairs: [(&str, Value); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn build_mute(caps: &Captures<'_>) -> Option<Params> {
    let action = caps.name("action")?.as_str().to_ascii_lowercase();
    Some(params([("action", action.into())]))
}

pub(crate) fn build_set_level(caps: &Captures<'_>) -> Option<Params> {
    let level = parse_level(caps.name("level")?.as_str())?;
    Some(params([("action", "set".into()), ("level", level.into())]))
}

pub(crate) fn build_level_up(_: &Captures<'_>) -> Option<Params> {
    Some(params([("action", "set".into()), ("level", DEFAULT_LEVEL_UP.into())]))
}

pub(crate) fn build_level_down(_: &Captures<'_>) -> Option<Params> {
    Some(params([("action", "set".into()), ("level", DEFAULT_LEVEL_DOWN.into())]))
}

pub(crate) fn build_duration(caps: &Captures<'_>) -> Option<Params> {
    let minutes = duration_minutes(caps.name("amount")?.as_str(), caps.name("unit")?.as_str())?;
    Some(params([("duration_minutes", minutes.into())]))
}

pub(crate) fn build_half_hour(_: &Captures<'_>) -> Option<Params> {
    Some(params([("duration_minutes", 30u64.into())]))
}

pub(crate) fn build_one_hour(_: &Captures<'_>) -> Option<Params> {
    Some(params([("duration_minutes", 60u64.into())]))
}

/// Words that can make up a spelled-out duration ("for half an hour").
const DURATION_WORDS: &[&str] = &[
    "a", "an", "one", "half", "quarter", "of", "hour", "hours", "minute", "minutes", "min",
    "mins", "second", "seconds", "sec", "secs",
];

pub(crate) fn build_label(caps: &Captures<'_>) -> Option<Params> {
    let label = non_empty(caps.name("label")?.as_str())?;
    // "for an hour" is the duration itself, not a label.
    if label
        .split_whitespace()
        .all(|word| DURATION_WORDS.contains(&word.to_ascii_lowercase().as_str()))
    {
        return None;
    }
    Some(params([("label", label.into())]))
}

pub(crate) fn build_app(caps: &Captures<'_>) -> Option<Params> {
    let app = non_empty(caps.name("app")?.as_str())?;
    Some(params([("app_name", app.into())]))
}

pub(crate) fn build_url(caps: &Captures<'_>) -> Option<Params> {
    let url = normalize_url(caps.name("url")?.as_str());
    Some(params([("url", url.into())]))
}

pub(crate) fn build_search_query(caps: &Captures<'_>) -> Option<Params> {
    let query = non_empty(caps.name("query")?.as_str())?;
    Some(params([("query", query.into())]))
}

pub(crate) fn build_note(caps: &Captures<'_>) -> Option<Params> {
    let content = non_empty(caps.name("content")?.as_str())?;
    Some(params([("content", content.into())]))
}

pub(crate) fn build_file_name(caps: &Captures<'_>) -> Option<Params> {
    let name = non_empty(caps.name("name")?.as_str())?;
    Some(params([("name", name.into())]))
}

pub(crate) fn build_snap(caps: &Captures<'_>) -> Option<Params> {
    let side = caps.name("side")?.as_str().to_ascii_lowercase();
    Some(params([("action", format!("snap_{side}").into())]))
}

pub(crate) fn build_window_action(caps: &Captures<'_>) -> Option<Params> {
    let action = match caps.name("action")?.as_str().to_ascii_lowercase().as_str() {
        "minimise" | "minimize" => "minimize",
        "maximise" | "maximize" => "maximize",
        "restore" => "restore",
        "close" => "close",
        _ => "fullscreen",
    };
    Some(params([("action", action.into())]))
}

pub(crate) fn build_window_close(_: &Captures<'_>) -> Option<Params> {
    Some(params([("action", "close".into())]))
}

pub(crate) fn build_window_next(_: &Captures<'_>) -> Option<Params> {
    Some(params([("action", "next".into())]))
}

pub(crate) fn build_media_next(_: &Captures<'_>) -> Option<Params> {
    Some(params([("action", "next".into())]))
}

pub(crate) fn build_media_previous(_: &Captures<'_>) -> Option<Params> {
    Some(params([("action", "previous".into())]))
}

pub(crate) fn build_media_action(caps: &Captures<'_>) -> Option<Params> {
    let action = match caps.name("action")?.as_str().to_ascii_lowercase().as_str() {
        "resume" => "play".to_string(),
        other => other.to_string(),
    };
    Some(params([("action", action.into())]))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extractor() -> ParameterExtractor {
        ParameterExtractor::new().expect("built-in cascades compile")
    }

    fn extract(query: &str, intent: &str) -> Value {
        Value::Object(extractor().extract(query, intent))
    }

    #[test]
    fn volume_mute_and_unmute() {
        assert_eq!(extract("mute", "system_volume"), json!({"action": "mute"}));
        assert_eq!(
            extract("unmute the speakers", "system_volume"),
            json!({"action": "unmute"})
        );
    }

    #[test]
    fn volume_defaults_without_number() {
        assert_eq!(
            extract("turn up the volume", "system_volume"),
            json!({"action": "set", "level": 75})
        );
        assert_eq!(
            extract("make it quieter", "system_volume"),
            json!({"action": "set", "level": 25})
        );
    }

    #[test]
    fn volume_explicit_level() {
        assert_eq!(
            extract("set volume to 42", "system_volume"),
            json!({"action": "set", "level": 42})
        );
        assert_eq!(
            extract("volume 30%", "system_volume"),
            json!({"action": "set", "level": 30})
        );
    }

    #[test]
    fn explicit_level_wins_over_direction_word() {
        assert_eq!(
            extract("turn the volume up to 60", "system_volume"),
            json!({"action": "set", "level": 60})
        );
    }

    #[test]
    fn levels_are_clamped_and_rounded() {
        assert_eq!(
            extract("set volume to 150", "system_volume"),
            json!({"action": "set", "level": 100})
        );
        assert_eq!(
            extract("brightness at 42.5%", "system_brightness"),
            json!({"action": "set", "level": 43})
        );
        assert_eq!(parse_level("-3"), Some(0));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn duration_units_normalise_to_minutes() {
        assert_eq!(duration_minutes("90", "seconds"), Some(1));
        assert_eq!(duration_minutes("30", "s"), Some(1));
        assert_eq!(duration_minutes("150", "secs"), Some(2));
        assert_eq!(duration_minutes("2", "hours"), Some(120));
        assert_eq!(duration_minutes("1.5", "h"), Some(90));
        assert_eq!(duration_minutes("2.5", "minutes"), Some(3));
        assert_eq!(duration_minutes("0", "minutes"), None);
        assert_eq!(duration_minutes("5", "weeks"), None);
    }

    #[test]
    fn timer_phrases() {
        assert_eq!(
            extract("set a timer for 90 seconds", "set_timer"),
            json!({"duration_minutes": 1})
        );
        assert_eq!(
            extract("timer 2 hours", "set_timer"),
            json!({"duration_minutes": 120})
        );
        assert_eq!(
            extract("remind me in half an hour", "set_timer"),
            json!({"duration_minutes": 30})
        );
        assert_eq!(
            extract("remind me in 10 minutes to check the oven", "set_timer"),
            json!({"duration_minutes": 10, "label": "check the oven"})
        );
        assert_eq!(extract("set a timer", "set_timer"), json!({}));
    }

    #[test]
    fn spelled_out_duration_is_not_a_label() {
        assert_eq!(
            extract("set a timer for an hour", "set_timer"),
            json!({"duration_minutes": 60})
        );
        assert_eq!(
            extract("set a timer for half an hour", "set_timer"),
            json!({"duration_minutes": 30})
        );
        assert_eq!(
            extract("timer for one hour", "set_timer"),
            json!({"duration_minutes": 60})
        );
        assert_eq!(
            extract("set a timer for 5 minutes to stretch", "set_timer"),
            json!({"duration_minutes": 5, "label": "stretch"})
        );
    }

    #[test]
    fn quoted_note_content() {
        assert_eq!(
            extract(r#"take a note "buy oat milk""#, "create_note"),
            json!({"content": "buy oat milk"})
        );
        assert_eq!(
            extract("note: call the dentist", "create_note"),
            json!({"content": "call the dentist"})
        );
    }

    #[test]
    fn url_and_domain_heuristics() {
        assert_eq!(
            extract("open https://docs.rs/regex", "open_url"),
            json!({"url": "https://docs.rs/regex"})
        );
        assert_eq!(
            extract("go to github.com.", "open_url"),
            json!({"url": "https://github.com"})
        );
        assert_eq!(extract("open the pod bay doors", "open_url"), json!({}));
    }

    #[test]
    fn search_query_falls_back_to_whole_text() {
        assert_eq!(
            extract("search for rust async traits", "web_search"),
            json!({"query": "rust async traits"})
        );
        assert_eq!(
            extract("weather in lisbon?", "web_search"),
            json!({"query": "weather in lisbon"})
        );
    }

    #[test]
    fn application_names() {
        assert_eq!(
            extract("open spotify", "open_application"),
            json!({"app_name": "spotify"})
        );
        assert_eq!(
            extract("could you launch spotify for me", "open_application"),
            json!({"app_name": "spotify"})
        );
        assert_eq!(
            extract("quit the slack app", "close_application"),
            json!({"app_name": "slack"})
        );
    }

    #[test]
    fn window_and_media_actions() {
        assert_eq!(
            extract("snap this window to the left", "window_management"),
            json!({"action": "snap_left"})
        );
        assert_eq!(
            extract("minimise everything", "window_management"),
            json!({"action": "minimize"})
        );
        assert_eq!(extract("resume the music", "media_control"), json!({"action": "play"}));
        assert_eq!(extract("skip this song", "media_control"), json!({"action": "next"}));
    }

    #[test]
    fn file_names() {
        assert_eq!(
            extract("find the file called budget 2024", "file_search"),
            json!({"name": "budget 2024"})
        );
        assert_eq!(
            extract("where is report.pdf", "file_search"),
            json!({"name": "report.pdf"})
        );
    }

    #[test]
    fn unknown_intent_yields_empty_map() {
        assert!(extractor().extract("what time is it", "get_time").is_empty());
        assert!(extractor().extract("anything", "not_an_intent").is_empty());
        assert!(!extractor().supports("get_time"));
        assert!(extractor().supports("system_volume"));
    }

    #[test]
    fn bare_domain_gets_https_scheme() {
        assert_eq!(normalize_url("example.org"), "https://example.org");
        assert_eq!(normalize_url("HTTP://Example.org/"), "HTTP://Example.org/");
    }
}
