//! Run configuration, resolved once from the environment and then passed by
//! value into the orchestrator. Nothing here is read again mid-run.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Credentials for the schedule application.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bounded waits and settle delays used by the orchestrator.
///
/// Every wait in a run comes from here; there is no unbounded wait.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Page load bound for the login navigation.
    pub navigation: Duration,
    /// Bound on a single script evaluation in the browser.
    pub script: Duration,
    /// Wait for the labelled menu entry before the structural fallback.
    pub menu_wait: Duration,
    /// Wait for the daily-view link inside the main frame.
    pub daily_link_wait: Duration,
    /// Wait for the day cell before invoking the page's own date entry point.
    pub date_link_wait: Duration,
    /// Wait for the export control.
    pub export_button_wait: Duration,
    /// Wait for a confirmation dialog after the export click.
    pub dialog_wait: Duration,
    /// Download directory polls after the export click.
    pub download_polls: u32,
    pub download_poll_interval: Duration,
    /// Interval between locator probes while waiting.
    pub locator_poll: Duration,
    pub after_login: Duration,
    pub after_menu: Duration,
    pub after_calendar_step: Duration,
    pub after_date_select: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            script: Duration::from_secs(10),
            menu_wait: Duration::from_secs(3),
            daily_link_wait: Duration::from_secs(5),
            date_link_wait: Duration::from_secs(3),
            export_button_wait: Duration::from_secs(5),
            dialog_wait: Duration::from_secs(3),
            download_polls: 15,
            download_poll_interval: Duration::from_secs(1),
            locator_poll: Duration::from_millis(250),
            after_login: Duration::from_secs(2),
            after_menu: Duration::from_secs(2),
            after_calendar_step: Duration::from_millis(500),
            after_date_select: Duration::from_secs(3),
        }
    }
}

impl Timeouts {
    /// No settle delays and single-probe waits. Used against scripted pages.
    pub fn immediate() -> Self {
        Self {
            navigation: Duration::from_secs(5),
            script: Duration::from_secs(5),
            menu_wait: Duration::ZERO,
            daily_link_wait: Duration::ZERO,
            date_link_wait: Duration::ZERO,
            export_button_wait: Duration::ZERO,
            dialog_wait: Duration::ZERO,
            download_polls: 2,
            download_poll_interval: Duration::from_millis(5),
            locator_poll: Duration::from_millis(1),
            after_login: Duration::ZERO,
            after_menu: Duration::ZERO,
            after_calendar_step: Duration::ZERO,
            after_date_select: Duration::ZERO,
        }
    }
}

/// Everything a run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub login_url: String,
    pub credentials: Credentials,
    /// Root of the scratch directories (`runs/`, `screenshots/`).
    pub work_dir: PathBuf,
    pub headless: bool,
    pub chromium_path: Option<PathBuf>,
    /// Whole-date attempts for transient browser failures (at least 1).
    pub date_attempts: u32,
    pub timeouts: Timeouts,
}

impl AcquisitionConfig {
    /// Resolve configuration from process environment variables, with a
    /// `.env` file in the working directory filling in unset names.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_and_file(Path::new(ENV_FILE))
    }

    /// Like [`from_env`](Self::from_env) with an explicit env file. A
    /// missing file is the same as an empty one.
    pub fn from_env_and_file(env_file: &Path) -> Result<Self, ConfigError> {
        let file = read_env_file(env_file)?;
        Self::from_lookup(|name| std::env::var(name).ok().or_else(|| file.get(name).cloned()))
    }

    /// Resolve configuration through an arbitrary variable lookup.
    ///
    /// Prefixed `RENTSCHED_*` names win over the bare legacy names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let login_url = read("RENTSCHED_LOGIN_URL")
            .or_else(|| read("LOGIN_URL"))
            .ok_or(ConfigError::Missing("RENTSCHED_LOGIN_URL"))?;
        if let Err(e) = url::Url::parse(&login_url) {
            return Err(ConfigError::InvalidUrl {
                url: login_url,
                reason: e.to_string(),
            });
        }

        let username = read("RENTSCHED_USERNAME")
            .or_else(|| read("USERNAME"))
            .ok_or(ConfigError::Missing("RENTSCHED_USERNAME"))?;
        let password = read("RENTSCHED_PASSWORD")
            .or_else(|| read("PASSWORD"))
            .ok_or(ConfigError::Missing("RENTSCHED_PASSWORD"))?;

        let work_dir = read("RENTSCHED_WORK_DIR")
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let headless = match read("RENTSCHED_HEADLESS") {
            None => true,
            Some(v) => parse_bool("RENTSCHED_HEADLESS", &v)?,
        };

        let date_attempts = match read("RENTSCHED_DATE_ATTEMPTS") {
            None => 1,
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or(ConfigError::InvalidValue {
                    name: "RENTSCHED_DATE_ATTEMPTS",
                    value: v,
                })?,
        };

        Ok(Self {
            login_url,
            credentials: Credentials { username, password },
            work_dir,
            headless,
            chromium_path: read("RENTSCHED_CHROMIUM_PATH").map(PathBuf::from),
            date_attempts,
            timeouts: Timeouts::default(),
        })
    }

    /// Directory holding per-run scratch directories.
    pub fn runs_dir(&self) -> PathBuf {
        self.work_dir.join("runs")
    }

    /// Directory receiving diagnostic screenshots.
    pub fn screenshots_dir(&self) -> PathBuf {
        self.work_dir.join("screenshots")
    }
}

/// Env file consulted by [`AcquisitionConfig::from_env`].
pub const ENV_FILE: &str = ".env";

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let invalid = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    match dotenvy::from_path_iter(path) {
        Ok(entries) => entries.collect::<Result<_, _>>().map_err(invalid),
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(invalid(e)),
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}
