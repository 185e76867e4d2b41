//! Dry-run tool handlers.
//!
//! The CLI performs no OS automation.  Every catalogue intent is registered
//! with a handler that describes what it would have done, except for the
//! clock queries which can be answered for real.

use chrono::Local;
use serde_json::{Value, json};

use fastpath_intent::{Params, ToolRegistry, handler_fn};
use fastpath_kernel::catalogue::{ACTION_INTENTS, QUERY_INTENTS, intents};

/// One-line description of each built-in intent.
pub fn describe(intent: &str) -> &'static str {
    match intent {
        intents::SYSTEM_VOLUME => "Set, raise, lower or mute the output volume",
        intents::SYSTEM_BRIGHTNESS => "Set, raise or lower the screen brightness",
        intents::SET_TIMER => "Start a countdown timer",
        intents::MEDIA_CONTROL => "Play, pause or skip media",
        intents::WINDOW_MANAGEMENT => "Minimise, maximise, snap or close windows",
        intents::OPEN_URL => "Open a web address in the browser",
        intents::FILE_SEARCH => "Find files by name",
        intents::WEB_SEARCH => "Search the web",
        intents::CREATE_NOTE => "Write a quick note",
        intents::CLOSE_APPLICATION => "Quit an application",
        intents::OPEN_APPLICATION => "Launch an application",
        intents::GET_TIME => "Report the current time",
        intents::GET_DATE => "Report today's date",
        intents::BATTERY_STATUS => "Report the battery level",
        intents::SYSTEM_INFO => "Report CPU, memory and disk usage",
        intents::LIST_WINDOWS => "List open windows",
        intents::CLIPBOARD_READ => "Read the clipboard",
        intents::HELP => "Describe what fastpath can do",
        _ => "Custom intent",
    }
}

/// A registry with a handler for every catalogue intent.
pub fn dry_run_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();

    registry.register(
        intents::GET_TIME,
        describe(intents::GET_TIME),
        handler_fn(|_| async { Ok(json!(format!("It is {}.", Local::now().format("%H:%M")))) }),
    );
    registry.register(
        intents::GET_DATE,
        describe(intents::GET_DATE),
        handler_fn(|_| async {
            Ok(json!(format!("Today is {}.", Local::now().format("%A, %B %-d, %Y"))))
        }),
    );
    registry.register(
        intents::HELP,
        describe(intents::HELP),
        handler_fn(|_| async { Ok(Value::String(help_text())) }),
    );

    for &intent in ACTION_INTENTS.iter().chain(QUERY_INTENTS) {
        if registry.contains(intent) {
            continue;
        }
        registry.register(
            intent,
            describe(intent),
            handler_fn(move |params| async move { Ok(dry_run(intent, &params)) }),
        );
    }
    registry
}

fn dry_run(intent: &str, params: &Params) -> Value {
    json!({
        "dry_run": true,
        "tool": intent,
        "params": params,
    })
}

fn help_text() -> String {
    let mut text = String::from("I can handle these without a round trip to the assistant:");
    for &intent in ACTION_INTENTS.iter().chain(QUERY_INTENTS) {
        text.push_str(&format!("\n  {intent:<20} {}", describe(intent)));
    }
    text
}
