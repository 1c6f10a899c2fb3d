//! The schedule application state machine.
//!
//! ```text
//! LoggedOut -> LoggedIn -> OnScheduleMenu -> CalendarAt -> DateSelected -> ExportTriggered
//!                             ^                                                   |
//!                             +---------------------------------------------------+
//! ```
//!
//! Each step checks its precondition and fails with
//! [`AcquireError::InvalidState`] when called out of order. A failing step
//! hands the page to the diagnostics sink before returning.

use super::calendar::{advance_to, AdvanceOutcome, CalendarCursor, CalendarView, StepDirection};
use super::downloads::DownloadWatch;
use super::{scripts, targets};
use crate::config::{AcquisitionConfig, Credentials, Timeouts};
use crate::dates::format_date;
use crate::diagnostics::DiagnosticsSink;
use crate::error::{AcquireError, AcquireResult};
use crate::renderer::RenderContext;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
    OnScheduleMenu,
    CalendarAt(CalendarCursor),
    DateSelected(NaiveDate),
    ExportTriggered(NaiveDate),
}

impl SessionState {
    fn schedule_open(&self) -> bool {
        !matches!(self, SessionState::LoggedOut | SessionState::LoggedIn)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::LoggedOut => write!(f, "LoggedOut"),
            SessionState::LoggedIn => write!(f, "LoggedIn"),
            SessionState::OnScheduleMenu => write!(f, "OnScheduleMenu"),
            SessionState::CalendarAt(c) => write!(f, "CalendarAt({c})"),
            SessionState::DateSelected(d) => write!(f, "DateSelected({d})"),
            SessionState::ExportTriggered(d) => write!(f, "ExportTriggered({d})"),
        }
    }
}

/// Why an export produced no file, without that being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoData {
    /// The application answered the export with a dialog.
    Dialog(String),
    /// No export control was on the page.
    ExportMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    FileReady(PathBuf),
    NoData(NoData),
    DownloadTimeout,
}

/// One logged-in page of the schedule application.
pub struct ScheduleSession {
    context: Box<dyn RenderContext>,
    login_url: String,
    credentials: Credentials,
    timeouts: Timeouts,
    downloads: PathBuf,
    diagnostics: Arc<dyn DiagnosticsSink>,
    state: SessionState,
}

impl ScheduleSession {
    pub fn new(
        context: Box<dyn RenderContext>,
        config: &AcquisitionConfig,
        downloads: PathBuf,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            context,
            login_url: config.login_url.clone(),
            credentials: config.credentials.clone(),
            timeouts: config.timeouts.clone(),
            downloads,
            diagnostics,
            state: SessionState::LoggedOut,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Log in through the login form.
    pub async fn authenticate(&mut self) -> AcquireResult<()> {
        let result = self.authenticate_inner().await;
        self.capture_on_error(&result, "error_login").await;
        result
    }

    /// Open the schedule menu and switch to the daily view.
    pub async fn open_daily_schedule(&mut self) -> AcquireResult<()> {
        let result = self.open_daily_schedule_inner().await;
        self.capture_on_error(&result, "error_nav").await;
        result
    }

    /// Step the calendar toward the month of `date`.
    ///
    /// Never fails on the calendar itself; only a call out of order or a
    /// broken browser errors.
    pub async fn advance_calendar_to(&mut self, date: NaiveDate) -> AcquireResult<AdvanceOutcome> {
        self.require("advance_calendar_to", "OnScheduleMenu or later", |s| s.schedule_open())?;
        self.dismiss_stale_dialogs().await?;

        let target = CalendarCursor::of(date);
        let outcome = advance_to(&mut *self, target).await;
        match &outcome {
            AdvanceOutcome::Reached { steps } => {
                debug!("calendar at {target} after {steps} steps");
                self.state = SessionState::CalendarAt(target);
            }
            AdvanceOutcome::StepBudgetExhausted { last } => {
                warn!("calendar stopped at {last} while seeking {target}");
            }
            AdvanceOutcome::Interrupted { steps, reason } => {
                warn!("calendar navigation toward {target} stopped after {steps} steps: {reason}");
            }
        }
        Ok(outcome)
    }

    /// Select `date` in the calendar, falling back to the page's own entry point.
    pub async fn select_date(&mut self, date: NaiveDate) -> AcquireResult<()> {
        let result = self.select_date_inner(date).await;
        self.capture_on_error(&result, &format!("err_date_{}", format_date(date)))
            .await;
        result
    }

    /// Click the export control and wait for a file or a "no data" dialog.
    pub async fn trigger_export_and_await(&mut self, date: NaiveDate) -> AcquireResult<ExportOutcome> {
        let result = self.trigger_export_inner(date).await;
        self.capture_on_error(&result, &format!("err_export_{}", format_date(date)))
            .await;
        result
    }

    /// Calendar, date and export for one date.
    pub async fn fetch_date(&mut self, date: NaiveDate) -> AcquireResult<ExportOutcome> {
        self.advance_calendar_to(date).await?;
        self.select_date(date).await?;
        self.trigger_export_and_await(date).await
    }

    /// Close the page and its browser.
    pub async fn close(self) -> anyhow::Result<()> {
        self.context.close().await
    }

    async fn authenticate_inner(&mut self) -> AcquireResult<()> {
        self.require("authenticate", "LoggedOut", |s| *s == SessionState::LoggedOut)?;

        let timeout_ms = self.timeouts.navigation.as_millis() as u64;
        self.context
            .navigate(&self.login_url, timeout_ms)
            .await
            .map_err(|e| AcquireError::Auth(format!("cannot load login page: {e:#}")))?;

        let filled = self
            .context
            .execute_js(&scripts::fill_login(
                &self.credentials.username,
                &self.credentials.password,
            ))
            .await
            .map_err(|e| AcquireError::Auth(format!("cannot fill login form: {e:#}")))?;
        if !script_ok(&filled) {
            return Err(AcquireError::Auth(script_reason(&filled, "login form not found")));
        }

        tokio::time::sleep(self.timeouts.after_login).await;
        let url = self
            .context
            .get_url()
            .await
            .map_err(|e| AcquireError::Auth(format!("cannot read page URL: {e:#}")))?;
        if url.to_lowercase().contains("login") {
            return Err(AcquireError::Auth(format!("still on login page: {url}")));
        }

        info!("logged in as {}", self.credentials.username);
        self.state = SessionState::LoggedIn;
        Ok(())
    }

    async fn open_daily_schedule_inner(&mut self) -> AcquireResult<()> {
        self.require("open_daily_schedule", "LoggedIn", |s| *s == SessionState::LoggedIn)?;
        let poll = self.timeouts.locator_poll;

        let hit = targets::schedule_menu(&self.timeouts)
            .click(self.context.as_ref(), poll)
            .await
            .map_err(|e| AcquireError::Navigation(e.to_string()))?;
        if hit > 0 {
            info!("schedule menu reached through structural fallback");
        }
        tokio::time::sleep(self.timeouts.after_menu).await;

        targets::daily_view(&self.timeouts)
            .click(self.context.as_ref(), poll)
            .await
            .map_err(|e| AcquireError::Navigation(e.to_string()))?;
        tokio::time::sleep(self.timeouts.after_menu).await;

        info!("daily schedule open");
        self.state = SessionState::OnScheduleMenu;
        Ok(())
    }

    async fn select_date_inner(&mut self, date: NaiveDate) -> AcquireResult<()> {
        self.require("select_date", "OnScheduleMenu or later", |s| s.schedule_open())?;
        let day = date.day();
        let iso = format_date(date);

        let clicked = targets::day_cell(day, &self.timeouts)
            .click(self.context.as_ref(), self.timeouts.locator_poll)
            .await;
        if let Err(miss) = clicked {
            debug!("{miss}; using goPlanToday for {iso}");
            let script =
                scripts::go_plan_today(&targets::main_scope(), &iso, date.year(), date.month());
            let reason = match self.context.execute_js(&script).await {
                Ok(v) if script_ok(&v) => None,
                Ok(v) => Some(script_reason(&v, "entry point failed")),
                Err(e) => Some(format!("{e:#}")),
            };
            if let Some(reason) = reason {
                return Err(AcquireError::DateSelection {
                    date: iso,
                    reason: format!("{miss}; goPlanToday: {reason}"),
                });
            }
        }

        tokio::time::sleep(self.timeouts.after_date_select).await;
        info!("selected {iso}");
        self.state = SessionState::DateSelected(date);
        Ok(())
    }

    async fn trigger_export_inner(&mut self, date: NaiveDate) -> AcquireResult<ExportOutcome> {
        self.require("trigger_export_and_await", "DateSelected for this date", |s| {
            *s == SessionState::DateSelected(date)
        })?;
        self.dismiss_stale_dialogs().await?;
        let t = &self.timeouts;

        let watch = DownloadWatch::arm(&self.downloads)?;
        self.state = SessionState::ExportTriggered(date);

        if let Err(miss) = targets::export_button(t)
            .click(self.context.as_ref(), t.locator_poll)
            .await
        {
            warn!("{miss}");
            return Ok(ExportOutcome::NoData(NoData::ExportMissing));
        }

        if let Some(message) = self.context.accept_dialog(t.dialog_wait).await? {
            info!("no data for {date}: {message}");
            return Ok(ExportOutcome::NoData(NoData::Dialog(message)));
        }

        match watch
            .await_export(t.download_polls, t.download_poll_interval)
            .await?
        {
            Some(path) => {
                info!("export for {date} saved as {}", path.display());
                Ok(ExportOutcome::FileReady(path))
            }
            None => {
                warn!("no export file for {date} after {} polls", t.download_polls);
                Ok(ExportOutcome::DownloadTimeout)
            }
        }
    }

    /// A dialog that opened after its wait blocks every later script.
    async fn dismiss_stale_dialogs(&self) -> AcquireResult<()> {
        for message in self.context.dismiss_pending_dialogs().await? {
            warn!("dismissed late dialog: {message}");
        }
        Ok(())
    }

    fn require(
        &self,
        step: &'static str,
        expected: &'static str,
        allowed: impl Fn(&SessionState) -> bool,
    ) -> AcquireResult<()> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(AcquireError::InvalidState {
                step,
                expected,
                actual: self.state.to_string(),
            })
        }
    }

    async fn capture_on_error<T>(&self, result: &AcquireResult<T>, tag: &str) {
        if let Err(e) = result {
            if !matches!(e, AcquireError::InvalidState { .. }) {
                self.diagnostics.capture(self.context.as_ref(), tag).await;
            }
        }
    }
}

#[async_trait]
impl CalendarView for ScheduleSession {
    async fn read_cursor(&mut self) -> anyhow::Result<CalendarCursor> {
        let probe = self
            .context
            .execute_js(&scripts::calendar_probe(&targets::main_scope()))
            .await?;

        if let Some([year, month]) = probe
            .get("selects")
            .and_then(|s| s.as_array())
            .map(|a| [a.first(), a.get(1)])
        {
            let text = |v: Option<&serde_json::Value>| v.and_then(|v| v.as_str()).unwrap_or("").to_string();
            if let Some(cursor) = CalendarCursor::from_selects(&text(year), &text(month)) {
                return Ok(cursor);
            }
        }
        if let Some(header) = probe.get("header").and_then(|h| h.as_str()) {
            if let Some(cursor) = CalendarCursor::from_header(header) {
                return Ok(cursor);
            }
        }
        anyhow::bail!(
            "calendar month not readable ({})",
            script_reason(&probe, "no month controls")
        )
    }

    async fn step(&mut self, direction: StepDirection) -> anyhow::Result<()> {
        let locator = match direction {
            StepDirection::Next => targets::calendar_next(),
            StepDirection::Previous => targets::calendar_prev(),
        };
        locator
            .click(self.context.as_ref(), self.timeouts.locator_poll)
            .await?;
        tokio::time::sleep(self.timeouts.after_calendar_step).await;
        Ok(())
    }
}

fn script_ok(value: &serde_json::Value) -> bool {
    value.get("ok").and_then(|v| v.as_bool()) == Some(true)
}

fn script_reason(value: &serde_json::Value, default: &str) -> String {
    value
        .get("reason")
        .and_then(|r| r.as_str())
        .unwrap_or(default)
        .to_string()
}
