//! The acquisition loop: one browser, one login, many dates.

use crate::config::AcquisitionConfig;
use crate::dates::format_date;
use crate::diagnostics::DiagnosticsSink;
use crate::error::AcquireResult;
use crate::export::{ExportParser, ParsedRecord};
use crate::renderer::BrowserLauncher;
use crate::schedule::{ExportOutcome, NoData, ScheduleSession};
use crate::scratch::RunDirs;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Why a date contributed no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoData,
    DownloadTimeout,
    ExportMissing,
    ParseFailed,
    BrowserError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDate {
    pub date: String,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of a run that was not aborted.
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionReport {
    pub success: bool,
    pub total_count: usize,
    pub data: Vec<ParsedRecord>,
    pub skipped: Vec<SkippedDate>,
}

impl Default for AcquisitionReport {
    fn default() -> Self {
        Self {
            success: true,
            total_count: 0,
            data: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl AcquisitionReport {
    fn add(&mut self, records: Vec<ParsedRecord>) {
        self.data.extend(records);
        self.total_count = self.data.len();
    }

    fn skip(&mut self, date: NaiveDate, reason: SkipReason, detail: Option<String>) {
        warn!(
            "skipping {} ({reason:?}){}",
            format_date(date),
            detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
        );
        self.skipped.push(SkippedDate {
            date: format_date(date),
            reason,
            detail,
        });
    }
}

/// Runs acquisitions. Each [`Acquisition::run`] is independent: its own
/// browser, profile and download directory.
pub struct Acquisition {
    config: AcquisitionConfig,
    launcher: Arc<dyn BrowserLauncher>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    parser: ExportParser,
}

impl Acquisition {
    pub fn new(
        config: AcquisitionConfig,
        launcher: Arc<dyn BrowserLauncher>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            config,
            launcher,
            diagnostics,
            parser: ExportParser::default(),
        }
    }

    /// Acquire records for `dates`, which must be sorted and deduplicated.
    ///
    /// Per-date problems become entries in [`AcquisitionReport::skipped`];
    /// a fatal error aborts the run. The browser is closed and the run
    /// directory removed on every path.
    pub async fn run(&self, dates: &[NaiveDate]) -> AcquireResult<AcquisitionReport> {
        if dates.is_empty() {
            return Ok(AcquisitionReport::default());
        }

        let dirs = RunDirs::create(&self.config.runs_dir())?;
        info!("run {} started for {} dates", dirs.root.display(), dates.len());
        let result = self.run_in(&dirs, dates).await;
        if let Err(e) = dirs.remove() {
            warn!("cannot remove run directory {}: {e}", dirs.root.display());
        }

        match &result {
            Ok(report) => info!(
                "run finished: {} records, {} dates skipped",
                report.total_count,
                report.skipped.len()
            ),
            Err(e) => warn!("run aborted: {e}"),
        }
        result
    }

    async fn run_in(&self, dirs: &RunDirs, dates: &[NaiveDate]) -> AcquireResult<AcquisitionReport> {
        let context = self.launcher.launch(dirs).await?;
        let mut session = ScheduleSession::new(
            context,
            &self.config,
            dirs.downloads.clone(),
            self.diagnostics.clone(),
        );

        let result = self.drive(&mut session, dates).await;
        if let Err(e) = session.close().await {
            warn!("closing browser: {e:#}");
        }
        result
    }

    async fn drive(
        &self,
        session: &mut ScheduleSession,
        dates: &[NaiveDate],
    ) -> AcquireResult<AcquisitionReport> {
        session.authenticate().await?;
        session.open_daily_schedule().await?;

        let mut report = AcquisitionReport::default();
        for &date in dates {
            self.process_date(session, date, &mut report).await?;
        }
        Ok(report)
    }

    async fn process_date(
        &self,
        session: &mut ScheduleSession,
        date: NaiveDate,
        report: &mut AcquisitionReport,
    ) -> AcquireResult<()> {
        let mut attempt = 1;
        let outcome = loop {
            match session.fetch_date(date).await {
                Ok(outcome) => break outcome,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if attempt < self.config.date_attempts => {
                    warn!("attempt {attempt} for {} failed: {e}", format_date(date));
                    attempt += 1;
                }
                Err(e) => {
                    report.skip(date, SkipReason::BrowserError, Some(e.to_string()));
                    return Ok(());
                }
            }
        };

        let path = match outcome {
            ExportOutcome::FileReady(path) => path,
            ExportOutcome::NoData(NoData::Dialog(message)) => {
                report.skip(date, SkipReason::NoData, Some(message));
                return Ok(());
            }
            ExportOutcome::NoData(NoData::ExportMissing) => {
                report.skip(date, SkipReason::ExportMissing, None);
                return Ok(());
            }
            ExportOutcome::DownloadTimeout => {
                report.skip(date, SkipReason::DownloadTimeout, None);
                return Ok(());
            }
        };

        let parser = self.parser.clone();
        let parsed = tokio::task::spawn_blocking(move || parser.parse_file(&path, date)).await;
        match parsed {
            Ok(Ok(records)) => {
                info!("{}: {} records", format_date(date), records.len());
                report.add(records);
            }
            Ok(Err(e)) => report.skip(date, SkipReason::ParseFailed, Some(e.to_string())),
            Err(e) => report.skip(date, SkipReason::ParseFailed, Some(format!("parser task: {e}"))),
        }
        Ok(())
    }
}
