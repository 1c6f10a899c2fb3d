//! CLI subcommand implementations for the rentsched binary.

pub mod doctor;
pub mod fetch_cmd;
pub mod parse_cmd;
pub mod serve_cmd;

use crate::acquire::Acquisition;
use crate::config::AcquisitionConfig;
use crate::diagnostics::ScreenshotSink;
use crate::renderer::chromium::ChromiumLauncher;
use crate::scratch::sweep_stale;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Clear leftovers of earlier processes and wire up a Chromium-backed
/// acquisition. Call once per process, before any run starts.
pub fn prepare_acquisition(config: AcquisitionConfig) -> Result<Acquisition> {
    sweep_stale(&config.runs_dir(), &config.screenshots_dir())
        .with_context(|| format!("cannot prepare work dir {}", config.work_dir.display()))?;

    let launcher = ChromiumLauncher::new(
        config.chromium_path.clone(),
        config.headless,
        config.timeouts.script,
    );
    let diagnostics = ScreenshotSink::new(config.screenshots_dir());
    Ok(Acquisition::new(
        config,
        Arc::new(launcher),
        Arc::new(diagnostics),
    ))
}

/// Print a value as JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
