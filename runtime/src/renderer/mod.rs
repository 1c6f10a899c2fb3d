//! Browser abstraction used by the schedule orchestrator.
//!
//! Defines the `BrowserLauncher` and `RenderContext` traits that abstract
//! over the browser engine (currently Chromium via chromiumoxide). All UI
//! interaction goes through [`RenderContext::execute_js`], so a scripted
//! implementation can stand in for a real browser.

pub mod chromium;

use crate::scratch::RunDirs;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Starts one browser instance per acquisition run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a browser whose downloads land in `dirs.downloads` and whose
    /// profile lives under `dirs`, returning its single page.
    async fn launch(&self, dirs: &RunDirs) -> Result<Box<dyn RenderContext>>;
}

/// The page of a launched browser.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the top-level document and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Capture the viewport as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>>;
    /// Wait up to `wait` for a native dialog; accept it and return its text.
    async fn accept_dialog(&self, wait: Duration) -> Result<Option<String>>;
    /// Accept every dialog that opened since the last wait, without waiting.
    async fn dismiss_pending_dialogs(&self) -> Result<Vec<String>>;
    /// Close the page and the browser behind it.
    async fn close(self: Box<Self>) -> Result<()>;
}
