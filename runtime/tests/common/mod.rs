//! A scripted stand-in for the schedule application.
//!
//! Scripts are dispatched on their `/* rentsched:<tag> */` marker. The fake
//! keeps a calendar month, the selected date and what each date's export
//! does, and writes export files into the run's download directory.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use rentsched::config::{AcquisitionConfig, Credentials, Timeouts};
use rentsched::diagnostics::DiagnosticsSink;
use rentsched::renderer::{BrowserLauncher, NavigationResult, RenderContext};
use rentsched::scratch::RunDirs;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const LOGIN_URL: &str = "https://erp.example.com/login.php";

pub enum FakeExport {
    Dialog(&'static str),
    /// A dialog that only opens once the dialog wait is over.
    LateDialog(&'static str),
    File(Vec<u8>),
    Nothing,
}

pub struct SiteState {
    pub url: String,
    pub login_accepted: bool,
    pub menu_labelled: bool,
    pub menu_structural: bool,
    pub daily_link: bool,
    pub day_links: bool,
    pub go_plan_today: bool,
    pub export_control: bool,
    pub cursor: (i32, u32),
    pub selected: Option<NaiveDate>,
    pub exports: HashMap<NaiveDate, FakeExport>,
    pub pending_dialog: Option<String>,
    pub late_dialog: Option<String>,
    /// An unhandled dialog; scripts hang while it is open.
    pub open_dialog: Option<String>,
    pub dismissed: Vec<String>,
    pub downloads: Option<PathBuf>,
    /// Holds `launch` until notified.
    pub launch_gate: Option<Arc<tokio::sync::Notify>>,
    /// Tag -> number of evaluations that fail before it works.
    pub flaky: HashMap<String, usize>,
    /// Dialog waits that fail before they work.
    pub dialog_failures: usize,
    pub export_clicks: usize,
    pub tags: Vec<String>,
    pub launches: usize,
    pub closed: usize,
    pub screenshots: usize,
}

#[derive(Clone)]
pub struct FakeSite(Arc<Mutex<SiteState>>);

impl FakeSite {
    /// A site where every path works, with the calendar showing `year`-`month`.
    pub fn healthy(year: i32, month: u32) -> Self {
        Self(Arc::new(Mutex::new(SiteState {
            url: "about:blank".into(),
            login_accepted: true,
            menu_labelled: true,
            menu_structural: true,
            daily_link: true,
            day_links: true,
            go_plan_today: true,
            export_control: true,
            cursor: (year, month),
            selected: None,
            exports: HashMap::new(),
            pending_dialog: None,
            late_dialog: None,
            open_dialog: None,
            dismissed: Vec::new(),
            downloads: None,
            launch_gate: None,
            flaky: HashMap::new(),
            dialog_failures: 0,
            export_clicks: 0,
            tags: Vec::new(),
            launches: 0,
            closed: 0,
            screenshots: 0,
        })))
    }

    pub fn state(&self) -> MutexGuard<'_, SiteState> {
        self.0.lock().unwrap()
    }

    pub fn export(&self, date: NaiveDate, export: FakeExport) {
        self.state().exports.insert(date, export);
    }

    fn answer(&self, script: &str) -> Result<Value> {
        let tag = script
            .strip_prefix("/* rentsched:")
            .and_then(|rest| rest.split_once(" */"))
            .map(|(tag, _)| tag.to_string())
            .unwrap_or_default();

        let mut s = self.state();
        s.tags.push(tag.clone());
        if s.open_dialog.is_some() {
            anyhow::bail!("JS execution timed out after 10s");
        }
        if let Some(left) = s.flaky.get_mut(&tag) {
            if *left > 0 {
                *left -= 1;
                anyhow::bail!("Execution context was destroyed");
            }
        }

        let found = |hit: bool| {
            if hit {
                json!({ "found": true })
            } else {
                json!({ "found": false, "reason": "no match" })
            }
        };

        let value = match tag.as_str() {
            "login" => {
                if s.login_accepted {
                    s.url = "https://erp.example.com/main.php".into();
                }
                json!({ "ok": true })
            }
            "locate:schedule_menu:0" => found(s.menu_labelled),
            "locate:schedule_menu:1" => found(s.menu_structural),
            "locate:daily_view:0" => found(s.daily_link),
            "calendar_probe" => {
                let (y, m) = s.cursor;
                json!({ "selects": [format!("{y}년"), format!("{m}월")], "header": null })
            }
            "locate:calendar_next:0" => {
                let (y, m) = s.cursor;
                s.cursor = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
                found(true)
            }
            "locate:calendar_prev:0" => {
                let (y, m) = s.cursor;
                s.cursor = if m == 1 { (y - 1, 12) } else { (y, m - 1) };
                found(true)
            }
            "locate:day_cell:0" if s.day_links => {
                let re = Regex::new(r"normalize-space\(text\(\)\)='(\d+)'").unwrap();
                let day: u32 = re.captures(script).unwrap()[1].parse().unwrap();
                let (y, m) = s.cursor;
                s.selected = NaiveDate::from_ymd_opt(y, m, day);
                found(true)
            }
            t if t.starts_with("go_plan_today:") => {
                if s.go_plan_today {
                    s.selected = NaiveDate::parse_from_str(&t["go_plan_today:".len()..], "%Y-%m-%d").ok();
                    json!({ "ok": true })
                } else {
                    json!({ "ok": false, "reason": "goPlanToday is not defined" })
                }
            }
            "locate:export_button:0" if s.export_control => {
                s.export_clicks += 1;
                let date = s.selected;
                let (dialog, file) = match date.and_then(|d| s.exports.get(&d)) {
                    Some(FakeExport::Dialog(message)) => (Some(message.to_string()), None),
                    Some(FakeExport::LateDialog(message)) => {
                        s.late_dialog = Some(message.to_string());
                        (None, None)
                    }
                    Some(FakeExport::File(bytes)) => (None, Some(bytes.clone())),
                    Some(FakeExport::Nothing) | None => (None, None),
                };
                if dialog.is_some() {
                    s.pending_dialog = dialog;
                }
                if let (Some(bytes), Some(dir)) = (file, s.downloads.clone()) {
                    let name = format!("rent_day_{}_{}.xls", date.unwrap_or_default(), s.export_clicks);
                    std::fs::write(dir.join(name), bytes).unwrap();
                }
                found(true)
            }
            _ => found(false),
        };
        Ok(value)
    }
}

#[async_trait]
impl BrowserLauncher for FakeSite {
    async fn launch(&self, dirs: &RunDirs) -> Result<Box<dyn RenderContext>> {
        let gate = self.state().launch_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut s = self.state();
        s.launches += 1;
        s.downloads = Some(dirs.downloads.clone());
        Ok(Box::new(FakePage { site: self.clone() }))
    }
}

pub struct FakePage {
    site: FakeSite,
}

#[async_trait]
impl RenderContext for FakePage {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.site.state().url = url.to_string();
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        self.site.answer(script)
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.site.state().url.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.site.state().screenshots += 1;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn accept_dialog(&self, _wait: Duration) -> Result<Option<String>> {
        let mut s = self.site.state();
        if s.dialog_failures > 0 {
            s.dialog_failures -= 1;
            anyhow::bail!("dialog wait failed: websocket closed");
        }
        let message = s.pending_dialog.take();
        if let Some(late) = s.late_dialog.take() {
            s.open_dialog = Some(late);
        }
        Ok(message)
    }

    async fn dismiss_pending_dialogs(&self) -> Result<Vec<String>> {
        let mut s = self.site.state();
        let stale: Vec<String> = s.open_dialog.take().into_iter().collect();
        s.dismissed.extend(stale.iter().cloned());
        Ok(stale)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.site.state().closed += 1;
        Ok(())
    }
}

/// Records the tags it is asked to capture.
#[derive(Default)]
pub struct RecordingSink {
    pub tags: Mutex<Vec<String>>,
}

#[async_trait]
impl DiagnosticsSink for RecordingSink {
    async fn capture(&self, context: &dyn RenderContext, tag: &str) {
        let _ = context.screenshot().await;
        self.tags.lock().unwrap().push(tag.to_string());
    }
}

pub fn config(work_dir: &Path) -> AcquisitionConfig {
    AcquisitionConfig {
        login_url: LOGIN_URL.into(),
        credentials: Credentials {
            username: "clerk".into(),
            password: "hunter2".into(),
        },
        work_dir: work_dir.to_path_buf(),
        headless: true,
        chromium_path: None,
        date_attempts: 1,
        timeouts: Timeouts::immediate(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// An EUC-KR "Excel" export as the schedule application produces it.
pub fn export_bytes(rows: &[[&str; 3]]) -> Vec<u8> {
    let mut html = String::from(
        "<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=euc-kr\"></head><body>\n<table border=1>\n<tr><td>지점</td><td>고객명</td><td>대여상품</td></tr>\n",
    );
    for [branch, customer, items] in rows {
        html.push_str(&format!(
            "<tr><td>{branch}</td><td>{customer}</td><td>{items}</td></tr>\n"
        ));
    }
    html.push_str("</table></body></html>");
    let (bytes, _, _) = encoding_rs::EUC_KR.encode(&html);
    bytes.into_owned()
}
