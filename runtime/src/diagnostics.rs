//! Post-mortem captures of browser state. Always best-effort.

use crate::renderer::RenderContext;
use async_trait::async_trait;
use chrono::Local;
use std::path::PathBuf;

/// Receives a snapshot request whenever an orchestrator step fails.
///
/// Implementations must swallow their own failures.
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    async fn capture(&self, context: &dyn RenderContext, tag: &str);
}

/// Discards every capture request.
pub struct NoopSink;

#[async_trait]
impl DiagnosticsSink for NoopSink {
    async fn capture(&self, _context: &dyn RenderContext, _tag: &str) {}
}

/// Writes `<tag>_<YYYYmmdd_HHMMSS>.png` screenshots into a directory.
pub struct ScreenshotSink {
    dir: PathBuf,
}

impl ScreenshotSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn file_for(&self, tag: &str) -> PathBuf {
        let tag: String = tag
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.dir.join(format!("{tag}_{stamp}.png"))
    }
}

#[async_trait]
impl DiagnosticsSink for ScreenshotSink {
    async fn capture(&self, context: &dyn RenderContext, tag: &str) {
        let png = match context.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                tracing::debug!("screenshot '{tag}' failed: {e:#}");
                return;
            }
        };
        let path = self.file_for(tag);
        let written = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, png).await
        }
        .await;
        match written {
            Ok(()) => tracing::info!("saved diagnostics screenshot {}", path.display()),
            Err(e) => tracing::debug!("cannot write {}: {e}", path.display()),
        }
    }
}
