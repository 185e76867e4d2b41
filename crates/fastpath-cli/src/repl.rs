//! Subcommand: `fastpath repl` -- interactive routing loop.
//!
//! Each input line is routed and summarised.  Lines starting with `:` are
//! commands: `:stats`, `:export`, `:tools`, `:clear`, `:quit`.

use std::io::{self, BufRead, Write as _};

use anyhow::{Context, Result};
use tracing::info;

use fastpath_intent::{IntentRouter, RouteResult};

pub async fn cmd_repl(router: IntentRouter) -> Result<()> {
    println!();
    println!("  fastpath v{}", env!("CARGO_PKG_VERSION"));
    match router.classifier().get_error() {
        Some(reason) => println!("  statistical tier: unavailable ({reason})"),
        None => println!("  statistical tier: ready"),
    }
    println!("  Type a command, or :quit to exit.  :stats / :export / :tools / :clear");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read input")?;
        let trimmed = line.trim();

        match trimmed {
            "" => continue,
            ":quit" | ":q" | ":exit" => {
                info!("user requested exit");
                break;
            }
            ":stats" => {
                let stats = router.telemetry().get_stats();
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            ":export" => {
                println!("{}", router.telemetry().export_json()?);
            }
            ":tools" => {
                for name in router.executor().get_available_tools() {
                    match router.executor().tool_latency(&name) {
                        Some(l) => println!(
                            "  {name:<20} {} calls, avg {:.1} ms, max {} ms",
                            l.count, l.avg_latency_ms, l.max_latency_ms
                        ),
                        None => println!("  {name}"),
                    }
                }
            }
            ":clear" => {
                router.telemetry().clear();
                println!("  telemetry cleared");
            }
            cmd if cmd.starts_with(':') => {
                println!("  unknown command {cmd}");
            }
            query => {
                let result = router.route(query).await;
                print_summary(&result);
            }
        }
    }

    Ok(())
}

fn print_summary(result: &RouteResult) {
    let tier = result
        .tier
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());

    if result.handled {
        println!(
            "  [{tier}] {} ({:.2})",
            result.tool_name.as_deref().unwrap_or_default(),
            result.confidence.unwrap_or_default()
        );
        println!("  {}", result.response.as_deref().unwrap_or_default());
        return;
    }

    println!(
        "  [{tier}] needs fallback: {}",
        result.reason.as_deref().unwrap_or_default()
    );
    if let (Some(tool), Some(error)) = (&result.failed_tool_name, &result.failed_error) {
        println!("  last failure: {tool}: {error}");
    }
}
