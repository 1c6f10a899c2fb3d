//! Chromium-based browser using chromiumoxide.

use super::{BrowserLauncher, NavigationResult, RenderContext};
use crate::scratch::RunDirs;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. RENTSCHED_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("RENTSCHED_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.rentsched/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".rentsched/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".rentsched/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".rentsched/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".rentsched/chromium/chrome-linux64/chrome"),
                home.join(".rentsched/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches a dedicated Chromium process per run.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    headless: bool,
    script_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(executable: Option<PathBuf>, headless: bool, script_timeout: Duration) -> Self {
        Self {
            executable,
            headless,
            script_timeout,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, dirs: &RunDirs) -> Result<Box<dyn RenderContext>> {
        let chrome_path = match &self.executable {
            Some(path) => path.clone(),
            None => find_chromium()
                .context("Chromium not found. Set RENTSCHED_CHROMIUM_PATH.")?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&dirs.profile)
            .window_size(1920, 1080)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled");
        builder = if self.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Drive the CDP connection for the lifetime of the browser.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let downloads = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dirs.downloads.display().to_string())
            .build()
            .map_err(|e| anyhow!("invalid download behavior: {e}"))?;
        browser
            .execute(downloads)
            .await
            .context("failed to set download directory")?;

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        let mut dialog_events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .context("failed to subscribe to dialogs")?;
        let (dialog_tx, dialog_rx) = mpsc::unbounded_channel();
        let dialog_task = tokio::spawn(async move {
            while let Some(event) = dialog_events.next().await {
                if dialog_tx.send(event.message.clone()).is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumContext {
            browser,
            page,
            dialogs: Mutex::new(dialog_rx),
            script_timeout: self.script_timeout,
            tasks: vec![handler_task, dialog_task],
        }))
    }
}

/// The single page of a launched Chromium, owning the browser.
pub struct ChromiumContext {
    browser: Browser,
    page: Page,
    dialogs: Mutex<mpsc::UnboundedReceiver<String>>,
    script_timeout: Duration,
    tasks: Vec<JoinHandle<()>>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = tokio::time::timeout(self.script_timeout, self.page.evaluate(script))
            .await
            .map_err(|_| anyhow!("JS execution timed out after {:?}", self.script_timeout))?
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .context("failed to capture screenshot")
    }

    async fn accept_dialog(&self, wait: Duration) -> Result<Option<String>> {
        let mut dialogs = self.dialogs.lock().await;
        match tokio::time::timeout(wait, dialogs.recv()).await {
            Ok(Some(message)) => {
                self.page
                    .execute(HandleJavaScriptDialogParams::new(true))
                    .await
                    .context("failed to accept dialog")?;
                Ok(Some(message))
            }
            Ok(None) | Err(_) => Ok(None),
        }
    }

    async fn dismiss_pending_dialogs(&self) -> Result<Vec<String>> {
        let mut dialogs = self.dialogs.lock().await;
        let mut dismissed = Vec::new();
        while let Ok(message) = dialogs.try_recv() {
            self.page
                .execute(HandleJavaScriptDialogParams::new(true))
                .await
                .context("failed to accept stale dialog")?;
            dismissed.push(message);
        }
        Ok(dismissed)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        let _ = this.page.close().await;
        let closed = this.browser.close().await;
        let _ = this.browser.wait().await;
        for task in &this.tasks {
            task.abort();
        }
        closed.map(|_| ()).context("failed to close browser")
    }
}
