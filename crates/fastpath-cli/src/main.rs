//! CLI entry point for fastpath.
//!
//! This binary hosts the intent router with a dry-run tool registry.  Use it
//! to check how queries are routed, inspect telemetry, and try model
//! artifacts before shipping them.

mod cli;
mod helpers;
mod repl;
mod tools;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use fastpath_intent::{FileBackend, StatisticalClassifier};
use fastpath_kernel::PatternMatcher;

use crate::cli::{Cli, Commands};
use crate::helpers::{build_router, init_tracing, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    // Populate the environment before any FASTPATH_* override is read.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Route { query } => cmd_route(cli.config.as_deref(), &query).await,
        Commands::Repl => {
            let config = load_config(cli.config.as_deref())?;
            repl::cmd_repl(build_router(config).await?).await
        }
        Commands::Intents => cmd_intents(),
        Commands::Model { path, query } => cmd_model(&path, query.as_deref()).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: route
// ---------------------------------------------------------------------------

async fn cmd_route(config_path: Option<&Path>, query: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let router = build_router(config).await?;
    let result = router.route(query).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: intents
// ---------------------------------------------------------------------------

fn cmd_intents() -> Result<()> {
    let matcher = PatternMatcher::builtin().context("failed to compile built-in patterns")?;

    println!("Action intents ({} rules):", matcher.action_rule_count());
    for intent in matcher.action_intents() {
        println!("  {intent:<20} {}", tools::describe(intent));
    }
    println!();
    println!("Query intents ({} rules):", matcher.query_rule_count());
    for intent in matcher.query_intents() {
        println!("  {intent:<20} {}", tools::describe(intent));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: model
// ---------------------------------------------------------------------------

async fn cmd_model(path: &Path, query: Option<&str>) -> Result<()> {
    let classifier = StatisticalClassifier::new(Arc::new(FileBackend::new(path)));
    classifier.initialize().await;

    if let Some(reason) = classifier.get_error() {
        println!("unavailable: {reason}");
        return Ok(());
    }

    let labels = classifier.labels();
    println!("{} labels:", labels.len());
    for label in &labels {
        println!("  {label}");
    }

    if let Some(query) = query {
        let result = classifier.classify(query);
        println!();
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}
