//! Shared helpers for the CLI subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use fastpath_intent::{IntentRouter, RouterConfig};

use crate::tools::dry_run_registry;

/// Configuration file picked up when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "config/fastpath.toml";

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialise the tracing subscriber.  `RUST_LOG` takes precedence over
/// `default_level`.  Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Resolve the router configuration: explicit file, then the default file,
/// then built-in defaults.  `FASTPATH_*` environment overrides apply last.
pub fn load_config(explicit: Option<&Path>) -> Result<RouterConfig> {
    let path: Option<PathBuf> = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    };

    let config = match &path {
        Some(path) => RouterConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RouterConfig::default(),
    };

    let config = config
        .apply_env_overrides()
        .context("invalid FASTPATH_* environment override")?;
    tracing::debug!(
        source = %path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".into()),
        deterministic = config.deterministic_threshold,
        statistical_high = config.statistical_high_threshold,
        statistical_attempt = config.statistical_attempt_threshold,
        "configuration resolved"
    );
    Ok(config)
}

/// Build a router wired to the dry-run tool registry and load its model.
pub async fn build_router(config: RouterConfig) -> Result<IntentRouter> {
    let router = IntentRouter::from_config(config, dry_run_registry())
        .context("failed to build intent router")?;
    let state = router.warm_up().await;
    tracing::info!(classifier = ?state, "router ready");
    Ok(router)
}
