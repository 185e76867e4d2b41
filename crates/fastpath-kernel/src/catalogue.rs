//! Built-in intent catalogue.
//!
//! Rule tables for the desktop-assistant intents fastpath ships with.  Each
//! intent name doubles as the name of the tool the host registers for it.
//! Patterns are anchored and case-insensitive; confidences below the default
//! deterministic threshold (0.95) mark phrasings that are deliberately left
//! to the statistical tier.

use regex::Captures;

use crate::error::{KernelError, Result};
use crate::extract;
use crate::patterns::PatternMatcher;
use crate::types::Params;

/// Intent (and tool) names.
pub mod intents {
    pub const SYSTEM_VOLUME: &str = "system_volume";
    pub const SYSTEM_BRIGHTNESS: &str = "system_brightness";
    pub const SET_TIMER: &str = "set_timer";
    pub const MEDIA_CONTROL: &str = "media_control";
    pub const WINDOW_MANAGEMENT: &str = "window_management";
    pub const OPEN_URL: &str = "open_url";
    pub const FILE_SEARCH: &str = "file_search";
    pub const WEB_SEARCH: &str = "web_search";
    pub const CREATE_NOTE: &str = "create_note";
    pub const CLOSE_APPLICATION: &str = "close_application";
    pub const OPEN_APPLICATION: &str = "open_application";

    pub const GET_TIME: &str = "get_time";
    pub const GET_DATE: &str = "get_date";
    pub const BATTERY_STATUS: &str = "battery_status";
    pub const SYSTEM_INFO: &str = "system_info";
    pub const LIST_WINDOWS: &str = "list_windows";
    pub const CLIPBOARD_READ: &str = "clipboard_read";
    pub const HELP: &str = "help";
}

use intents::*;

/// Intents that take parameters, in table order.
pub const ACTION_INTENTS: &[&str] = &[
    SYSTEM_VOLUME,
    SYSTEM_BRIGHTNESS,
    SET_TIMER,
    MEDIA_CONTROL,
    WINDOW_MANAGEMENT,
    OPEN_URL,
    FILE_SEARCH,
    WEB_SEARCH,
    CREATE_NOTE,
    CLOSE_APPLICATION,
    OPEN_APPLICATION,
];

/// Intents that never take parameters, in table order.
pub const QUERY_INTENTS: &[&str] = &[
    GET_TIME,
    GET_DATE,
    BATTERY_STATUS,
    SYSTEM_INFO,
    LIST_WINDOWS,
    CLIPBOARD_READ,
    HELP,
];

type RuleExtractor = fn(&Captures<'_>) -> Result<Params>;

type ActionRule = (&'static str, String, f64, RuleExtractor);

fn rule(
    intent: &'static str,
    pattern: impl Into<String>,
    confidence: f64,
    extractor: RuleExtractor,
) -> ActionRule {
    (intent, pattern.into(), confidence, extractor)
}

const UNIT: &str = r"hours?|hrs?|h|minutes?|mins?|m|seconds?|secs?|s";

// ---------------------------------------------------------------------------
// Action table
// ---------------------------------------------------------------------------

fn action_rules() -> Vec<ActionRule> {
    let level = r"(?P<level>\d+(?:\.\d+)?)\s*(?:%|percent)?";
    let domain = r"(?:www\.)?[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.[a-z]{2,24}(?:/\S*)?";
    let go = r"(?:open|go\s+to|visit|browse\s+to|navigate\s+to)";

    vec![
        // -- Volume -----------------------------------------------------------
        rule(
            SYSTEM_VOLUME,
            r"(?i)^(?:please\s+)?(?P<action>mute|unmute)(?:\s+(?:the\s+)?(?:volume|sound|audio|speakers?))?[.!]?$",
            1.0,
            volume_toggle,
        ),
        rule(
            SYSTEM_VOLUME,
            format!(r"(?i)^(?:please\s+)?(?:set|change|put|turn)\s+(?:the\s+)?(?:volume|sound)\s+(?:up\s+|down\s+)?(?:to|at)\s+{level}$"),
            0.98,
            volume_level,
        ),
        rule(SYSTEM_VOLUME, format!(r"(?i)^volume\s+{level}$"), 0.96, volume_level),
        rule(
            SYSTEM_VOLUME,
            r"(?i)^(?:turn|crank)\s+(?P<dir>up|down)\s+(?:the\s+)?(?:volume|sound)$",
            0.97,
            volume_direction,
        ),
        rule(
            SYSTEM_VOLUME,
            r"(?i)^(?:turn|crank)\s+(?:the\s+)?(?:volume|sound)\s+(?P<dir>up|down)$",
            0.97,
            volume_direction,
        ),
        rule(
            SYSTEM_VOLUME,
            r"(?i)^(?:volume|sound)\s+(?P<dir>up|down)$",
            0.96,
            volume_direction,
        ),
        rule(
            SYSTEM_VOLUME,
            r"(?i)^(?:make\s+it\s+)?(?P<dir>louder|quieter)$",
            0.9,
            volume_direction,
        ),
        // -- Brightness -------------------------------------------------------
        rule(
            SYSTEM_BRIGHTNESS,
            format!(r"(?i)^(?:please\s+)?(?:set|change|put|turn)\s+(?:the\s+)?(?:screen\s+)?brightness\s+(?:up\s+|down\s+)?(?:to|at)\s+{level}$"),
            0.98,
            brightness_level,
        ),
        rule(
            SYSTEM_BRIGHTNESS,
            format!(r"(?i)^(?:screen\s+)?brightness\s+{level}$"),
            0.96,
            brightness_level,
        ),
        rule(
            SYSTEM_BRIGHTNESS,
            r"(?i)^(?:screen\s+)?brightness\s+(?P<dir>up|down)$",
            0.96,
            brightness_direction,
        ),
        rule(
            SYSTEM_BRIGHTNESS,
            r"(?i)^(?P<dir>increase|decrease|raise|lower)\s+(?:the\s+)?(?:screen\s+)?brightness$",
            0.96,
            brightness_direction,
        ),
        rule(
            SYSTEM_BRIGHTNESS,
            r"(?i)^(?P<dir>dim|brighten)\s+(?:the\s+)?screen$",
            0.95,
            brightness_direction,
        ),
        // -- Timers -----------------------------------------------------------
        rule(
            SET_TIMER,
            format!(r"(?i)^(?:please\s+)?(?:set\s+(?:a\s+|an\s+)?)?timer\s+(?:for\s+)?(?P<amount>\d+(?:\.\d+)?)\s*(?P<unit>{UNIT})$"),
            0.97,
            timer,
        ),
        rule(
            SET_TIMER,
            format!(r"(?i)^(?:please\s+)?(?:set\s+(?:a\s+|an\s+)?)?(?P<amount>\d+(?:\.\d+)?)\s*-?\s*(?P<unit>{UNIT})\s+timer$"),
            0.97,
            timer,
        ),
        rule(
            SET_TIMER,
            format!(r"(?i)^remind\s+me\s+in\s+(?P<amount>\d+(?:\.\d+)?)\s*(?P<unit>{UNIT})(?:\s+to\s+(?P<label>.+?))?[.!]?$"),
            0.95,
            timer,
        ),
        // -- Media ------------------------------------------------------------
        rule(
            MEDIA_CONTROL,
            r"(?i)^(?P<action>play|pause|resume|stop)(?:\s+(?:the\s+)?(?:music|song|track|playback|media|video))?[.!]?$",
            0.97,
            media_action,
        ),
        rule(
            MEDIA_CONTROL,
            r"(?i)^(?:skip|next)(?:\s+(?:this\s+|the\s+)?(?:song|track))?$",
            0.97,
            media_next,
        ),
        rule(
            MEDIA_CONTROL,
            r"(?i)^(?:previous|prev|last)\s+(?:song|track)$",
            0.97,
            media_previous,
        ),
        // -- Windows ----------------------------------------------------------
        rule(
            WINDOW_MANAGEMENT,
            r"(?i)^(?P<action>minimi[sz]e|maximi[sz]e|restore|fullscreen|close)\s+(?:the\s+|this\s+)?(?:current\s+|active\s+)?window$",
            0.98,
            window_action,
        ),
        rule(
            WINDOW_MANAGEMENT,
            r"(?i)^snap\s+(?:the\s+|this\s+)?(?:window\s+)?(?:to\s+(?:the\s+)?)?(?P<side>left|right)$",
            0.97,
            window_snap,
        ),
        rule(
            WINDOW_MANAGEMENT,
            r"(?i)^(?:switch\s+(?:to\s+)?(?:the\s+)?next\s+window|next\s+window)$",
            0.96,
            window_next,
        ),
        // -- Web --------------------------------------------------------------
        rule(OPEN_URL, format!(r"(?i)^{go}\s+(?P<url>https?://\S+)$"), 1.0, open_url),
        rule(OPEN_URL, format!(r"(?i)^{go}\s+(?P<url>{domain})$"), 0.97, open_url),
        rule(
            FILE_SEARCH,
            r"(?i)^(?:find|locate|search\s+for)\s+(?:a\s+|the\s+|my\s+)?files?\s+(?:named|called)\s+(?P<name>.+?)\??$",
            0.97,
            file_search,
        ),
        rule(
            WEB_SEARCH,
            r"(?i)^(?:search|google|look\s+up)\s+(?:the\s+web\s+|online\s+)?(?:for\s+)?(?P<query>.+?)\??$",
            0.96,
            web_search,
        ),
        // -- Notes ------------------------------------------------------------
        rule(
            CREATE_NOTE,
            r#"(?i)^(?:take|make|create|write)\s+(?:a\s+)?note\s*:?\s*["“](?P<content>[^"”]+)["”]$"#,
            1.0,
            note,
        ),
        rule(
            CREATE_NOTE,
            r"(?i)^(?:take|make|create|write)\s+(?:a\s+)?note\s*(?::|saying|that)\s*(?P<content>.+)$",
            0.96,
            note,
        ),
        rule(CREATE_NOTE, r"(?i)^note\s*:\s*(?P<content>.+)$", 0.96, note),
        // -- Applications -----------------------------------------------------
        rule(
            CLOSE_APPLICATION,
            r"(?i)^(?:please\s+)?(?:close|quit|exit)\s+(?:the\s+)?(?P<app>[a-z0-9][\w .+-]{0,40}?)(?:\s+app(?:lication)?)?$",
            0.95,
            close_application,
        ),
        rule(
            OPEN_APPLICATION,
            r"(?i)^(?:please\s+)?(?:open|launch|start)\s+(?:up\s+)?(?:the\s+)?(?P<app>[a-z0-9][\w .+-]{0,40}?)(?:\s+app(?:lication)?)?$",
            0.95,
            open_application,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Query table
// ---------------------------------------------------------------------------

const QUERY_RULES: &[(&str, &str, f64)] = &[
    (
        GET_TIME,
        r"(?i)^(?:what(?:'s|\s+is)\s+the\s+(?:current\s+)?time|what\s+time\s+is\s+it|(?:current\s+)?time)(?:\s+(?:now|right\s+now))?\??$",
        1.0,
    ),
    (
        GET_DATE,
        r"(?i)^(?:what(?:'s|\s+is)\s+(?:the\s+|today's\s+)?date(?:\s+today)?|what\s+day\s+is\s+(?:it|today)|(?:today's\s+)?date)\??$",
        1.0,
    ),
    (
        BATTERY_STATUS,
        r"(?i)^(?:what(?:'s|\s+is)\s+(?:my\s+|the\s+)?battery(?:\s+(?:level|status|percentage))?|battery(?:\s+(?:level|status))?|how\s+much\s+battery(?:\s+do\s+i\s+have)?(?:\s+left)?)\??$",
        0.98,
    ),
    (
        SYSTEM_INFO,
        r"(?i)^(?:system\s+(?:info|information|status)|(?:show|get)\s+(?:me\s+)?(?:the\s+)?system\s+(?:info|information|status))\??$",
        0.98,
    ),
    (SYSTEM_INFO, r"(?i)\b(?:cpu|memory|ram|disk)\s+usage\b", 0.85),
    (
        LIST_WINDOWS,
        r"(?i)^(?:list|show)\s+(?:me\s+)?(?:all\s+|my\s+)?(?:the\s+)?(?:open\s+)?windows\??$",
        0.98,
    ),
    (
        CLIPBOARD_READ,
        r"(?i)^(?:what(?:'s|\s+is)\s+(?:in|on)\s+(?:my\s+|the\s+)?clipboard|(?:show|read)\s+(?:me\s+)?(?:my\s+|the\s+)?clipboard)\??$",
        0.97,
    ),
    (HELP, r"(?i)^(?:help|what\s+can\s+you\s+do)\??$", 1.0),
];

/// Install the built-in tables into `matcher`.
pub fn install(matcher: &mut PatternMatcher) -> Result<()> {
    for (intent, pattern, confidence, extractor) in action_rules() {
        matcher.add_action_rule(intent, &pattern, confidence, extractor)?;
    }
    for (intent, pattern, confidence) in QUERY_RULES {
        matcher.add_query_rule(*intent, pattern, *confidence)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rule extractors
// ---------------------------------------------------------------------------

fn required(intent: &str, built: Option<Params>, what: &str) -> Result<Params> {
    built.ok_or_else(|| KernelError::ExtractionFailed {
        intent: intent.to_string(),
        reason: format!("unusable {what}"),
    })
}

fn volume_toggle(caps: &Captures<'_>) -> Result<Params> {
    required(SYSTEM_VOLUME, extract::build_mute(caps), "mute action")
}

fn volume_level(caps: &Captures<'_>) -> Result<Params> {
    required(SYSTEM_VOLUME, extract::build_set_level(caps), "volume level")
}

fn volume_direction(caps: &Captures<'_>) -> Result<Params> {
    required(SYSTEM_VOLUME, direction(caps), "volume direction")
}

fn brightness_level(caps: &Captures<'_>) -> Result<Params> {
    required(SYSTEM_BRIGHTNESS, extract::build_set_level(caps), "brightness level")
}

fn brightness_direction(caps: &Captures<'_>) -> Result<Params> {
    required(SYSTEM_BRIGHTNESS, direction(caps), "brightness direction")
}

fn direction(caps: &Captures<'_>) -> Option<Params> {
    match caps.name("dir")?.as_str().to_ascii_lowercase().as_str() {
        "up" | "louder" | "increase" | "raise" | "brighten" => extract::build_level_up(caps),
        "down" | "quieter" | "decrease" | "lower" | "dim" => extract::build_level_down(caps),
        _ => None,
    }
}

fn timer(caps: &Captures<'_>) -> Result<Params> {
    let mut params = required(SET_TIMER, extract::build_duration(caps), "timer duration")?;
    if let Some(label) = extract::build_label(caps) {
        params.extend(label);
    }
    Ok(params)
}

fn media_action(caps: &Captures<'_>) -> Result<Params> {
    required(MEDIA_CONTROL, extract::build_media_action(caps), "media action")
}

fn media_next(caps: &Captures<'_>) -> Result<Params> {
    required(MEDIA_CONTROL, extract::build_media_next(caps), "media action")
}

fn media_previous(caps: &Captures<'_>) -> Result<Params> {
    required(MEDIA_CONTROL, extract::build_media_previous(caps), "media action")
}

fn window_action(caps: &Captures<'_>) -> Result<Params> {
    required(WINDOW_MANAGEMENT, extract::build_window_action(caps), "window action")
}

fn window_snap(caps: &Captures<'_>) -> Result<Params> {
    required(WINDOW_MANAGEMENT, extract::build_snap(caps), "snap side")
}

fn window_next(caps: &Captures<'_>) -> Result<Params> {
    required(WINDOW_MANAGEMENT, extract::build_window_next(caps), "window action")
}

fn open_url(caps: &Captures<'_>) -> Result<Params> {
    required(OPEN_URL, extract::build_url(caps), "url")
}

fn file_search(caps: &Captures<'_>) -> Result<Params> {
    required(FILE_SEARCH, extract::build_file_name(caps), "file name")
}

fn web_search(caps: &Captures<'_>) -> Result<Params> {
    required(WEB_SEARCH, extract::build_search_query(caps), "search query")
}

fn note(caps: &Captures<'_>) -> Result<Params> {
    required(CREATE_NOTE, extract::build_note(caps), "note content")
}

fn open_application(caps: &Captures<'_>) -> Result<Params> {
    required(OPEN_APPLICATION, extract::build_app(caps), "application name")
}

fn close_application(caps: &Captures<'_>) -> Result<Params> {
    required(CLOSE_APPLICATION, extract::build_app(caps), "application name")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
