//! DesktopBlocks viewer
//!
//! Draws every monitor and top-level window of the desktop as a scaled
//! wireframe, with a selectable list of windows beside it. With
//! `mode = "overlay"` it instead shows a screenshot of the primary monitor
//! with the window outlines drawn on top.

#[cfg(windows)]
mod app;
#[cfg_attr(not(windows), allow(dead_code))]
mod config;
#[cfg_attr(not(windows), allow(dead_code))]
mod input;
#[cfg_attr(not(windows), allow(dead_code))]
mod paint;

use anyhow::Result;
use config::Config;
use tracing::{info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Map the configured level name; unknown names fall back to INFO.
fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_logging(level: Level) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(windows)]
fn run(config: &Config) -> Result<()> {
    // Must precede any window or GDI call.
    desktopblocks_platform_win32::set_dpi_awareness();
    app::run(config)
}

#[cfg(not(windows))]
fn run(_config: &Config) -> Result<()> {
    anyhow::bail!("DesktopBlocks needs a Windows desktop to inspect")
}

fn main() -> Result<()> {
    // Load configuration first (needed for log level)
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}. Using defaults.", e);
        Config::default()
    });

    init_logging(parse_level(&config.behavior.log_level))?;

    for w in config.validate() {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("DesktopBlocks starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: mode={:?}, zoom_step={}, zoom={}..{}, log_level={}",
        config.behavior.mode,
        config.view.zoom_step,
        config.view.min_zoom,
        config.view.max_zoom,
        config.behavior.log_level
    );

    run(&config)
}
