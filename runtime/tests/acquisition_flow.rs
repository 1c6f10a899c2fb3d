//! End-to-end acquisition runs against a scripted schedule application.

mod common;

use assert_json_diff::assert_json_eq;
use common::{config, date, export_bytes, FakeExport, FakeSite, RecordingSink};
use rentsched::acquire::{Acquisition, SkipReason};
use rentsched::config::AcquisitionConfig;
use rentsched::error::AcquireError;
use rentsched::renderer::BrowserLauncher;
use rentsched::schedule::{ScheduleSession, SessionState};
use rentsched::scratch::RunDirs;
use serde_json::json;
use std::sync::Arc;

const UMBRELLA_ROW: [&str; 3] = [
    "강남",
    "홍길동",
    "<span style='color:red'>우산</span><br>장화",
];

fn acquisition(site: &FakeSite, cfg: AcquisitionConfig) -> (Acquisition, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let acq = Acquisition::new(cfg, Arc::new(site.clone()), sink.clone());
    (acq, sink)
}

fn leftover_runs(cfg: &AcquisitionConfig) -> usize {
    std::fs::read_dir(cfg.runs_dir())
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_dialog_date_skipped_and_next_date_parsed() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let site = FakeSite::healthy(2025, 10);
    site.export(date(2025, 12, 10), FakeExport::Dialog("조회된 데이터가 없습니다."));
    site.export(date(2025, 12, 15), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));

    let (acq, sink) = acquisition(&site, cfg.clone());
    let report = acq
        .run(&[date(2025, 12, 10), date(2025, 12, 15)])
        .await
        .unwrap();

    assert_json_eq!(
        serde_json::to_value(&report).unwrap(),
        json!({
            "success": true,
            "total_count": 1,
            "data": [{
                "지점": "강남",
                "고객명": "홍길동",
                "baseProducts": "장화",
                "addonProducts": "우산",
                "rentalDate": "2025-12-15"
            }],
            "skipped": [{
                "date": "2025-12-10",
                "reason": "no_data",
                "detail": "조회된 데이터가 없습니다."
            }]
        })
    );

    let state = site.state();
    assert_eq!(state.launches, 1);
    assert_eq!(state.closed, 1);
    assert_eq!(
        state.tags.iter().filter(|t| *t == "locate:calendar_next:0").count(),
        2,
        "October to December is two steps, the second date needs none"
    );
    assert!(sink.tags.lock().unwrap().is_empty());
    assert_eq!(leftover_runs(&cfg), 0);
}

#[tokio::test]
async fn test_calendar_steps_backwards() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2026, 2);
    site.export(date(2025, 11, 3), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));

    let (acq, _) = acquisition(&site, config(tmp.path()));
    let report = acq.run(&[date(2025, 11, 3)]).await.unwrap();

    assert_eq!(report.total_count, 1);
    let state = site.state();
    assert_eq!(state.cursor, (2025, 11));
    assert_eq!(
        state.tags.iter().filter(|t| *t == "locate:calendar_prev:0").count(),
        3
    );
}

#[tokio::test]
async fn test_auth_failure_is_fatal_and_closes_browser() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let site = FakeSite::healthy(2025, 12);
    site.state().login_accepted = false;

    let (acq, sink) = acquisition(&site, cfg.clone());
    let err = acq.run(&[date(2025, 12, 10)]).await.unwrap_err();

    assert!(matches!(err, AcquireError::Auth(_)), "{err}");
    assert!(err.to_string().contains("login.php"));
    assert_eq!(site.state().closed, 1);
    assert_eq!(*sink.tags.lock().unwrap(), vec!["error_login".to_string()]);
    assert_eq!(site.state().screenshots, 1);
    assert_eq!(leftover_runs(&cfg), 0);
}

#[tokio::test]
async fn test_menu_structural_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    site.state().menu_labelled = false;
    site.export(date(2025, 12, 10), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));

    let (acq, _) = acquisition(&site, config(tmp.path()));
    let report = acq.run(&[date(2025, 12, 10)]).await.unwrap();
    assert_eq!(report.total_count, 1);
    assert!(site
        .state()
        .tags
        .contains(&"locate:schedule_menu:1".to_string()));
}

#[tokio::test]
async fn test_missing_menu_is_navigation_error() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    {
        let mut s = site.state();
        s.menu_labelled = false;
        s.menu_structural = false;
    }

    let (acq, sink) = acquisition(&site, config(tmp.path()));
    let err = acq.run(&[date(2025, 12, 10)]).await.unwrap_err();

    assert!(matches!(err, AcquireError::Navigation(_)), "{err}");
    assert!(err.to_string().contains("schedule_menu"));
    assert_eq!(*sink.tags.lock().unwrap(), vec!["error_nav".to_string()]);
    assert_eq!(site.state().closed, 1);
}

#[tokio::test]
async fn test_date_selection_uses_page_entry_point() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    site.state().day_links = false;
    site.export(date(2025, 12, 10), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));

    let (acq, _) = acquisition(&site, config(tmp.path()));
    let report = acq.run(&[date(2025, 12, 10)]).await.unwrap();

    assert_eq!(report.total_count, 1);
    assert!(site
        .state()
        .tags
        .contains(&"go_plan_today:2025-12-10".to_string()));
}

#[tokio::test]
async fn test_date_selection_failure_aborts_run() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    {
        let mut s = site.state();
        s.day_links = false;
        s.go_plan_today = false;
    }

    let (acq, sink) = acquisition(&site, config(tmp.path()));
    let err = acq
        .run(&[date(2025, 12, 10), date(2025, 12, 11)])
        .await
        .unwrap_err();

    match &err {
        AcquireError::DateSelection { date, reason } => {
            assert_eq!(date, "2025-12-10");
            assert!(reason.contains("goPlanToday is not defined"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        *sink.tags.lock().unwrap(),
        vec!["err_date_2025-12-10".to_string()]
    );
    assert_eq!(site.state().closed, 1);
}

#[tokio::test]
async fn test_timeout_and_missing_export_are_skips() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    site.export(date(2025, 12, 10), FakeExport::Nothing);

    let (acq, _) = acquisition(&site, config(tmp.path()));
    let report = acq.run(&[date(2025, 12, 10)]).await.unwrap();
    assert_eq!(report.total_count, 0);
    assert_eq!(report.skipped[0].reason, SkipReason::DownloadTimeout);

    let site = FakeSite::healthy(2025, 12);
    site.state().export_control = false;
    let (acq, _) = acquisition(&site, config(tmp.path()));
    let report = acq.run(&[date(2025, 12, 10)]).await.unwrap();
    assert!(report.success);
    assert_eq!(report.skipped[0].reason, SkipReason::ExportMissing);
}

#[tokio::test]
async fn test_late_dialog_does_not_block_next_date() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    site.export(date(2025, 12, 10), FakeExport::LateDialog("조회된 데이터가 없습니다."));
    site.export(date(2025, 12, 11), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));

    let (acq, sink) = acquisition(&site, config(tmp.path()));
    let report = acq
        .run(&[date(2025, 12, 10), date(2025, 12, 11)])
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.total_count, 1);
    assert_eq!(report.data[0].rental_date, "2025-12-11");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].date, "2025-12-10");
    assert_eq!(report.skipped[0].reason, SkipReason::DownloadTimeout);
    assert!(sink.tags.lock().unwrap().is_empty());

    let state = site.state();
    assert_eq!(state.dismissed, vec!["조회된 데이터가 없습니다.".to_string()]);
    assert!(state.open_dialog.is_none());
}

#[tokio::test]
async fn test_unparseable_export_is_a_skip() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    site.export(date(2025, 12, 10), FakeExport::File(b"<html>nothing here</html>".to_vec()));
    site.export(date(2025, 12, 11), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));

    let (acq, _) = acquisition(&site, config(tmp.path()));
    let report = acq
        .run(&[date(2025, 12, 10), date(2025, 12, 11)])
        .await
        .unwrap();

    assert_eq!(report.total_count, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::ParseFailed);
    assert_eq!(report.data[0].rental_date, "2025-12-11");
}

#[tokio::test]
async fn test_transient_browser_error_skips_date() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    site.state().dialog_failures = 1;
    site.export(date(2025, 12, 10), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));
    site.export(date(2025, 12, 11), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));

    let (acq, sink) = acquisition(&site, config(tmp.path()));
    let report = acq
        .run(&[date(2025, 12, 10), date(2025, 12, 11)])
        .await
        .unwrap();

    assert_eq!(report.total_count, 1);
    assert_eq!(report.skipped[0].date, "2025-12-10");
    assert_eq!(report.skipped[0].reason, SkipReason::BrowserError);
    assert_eq!(
        *sink.tags.lock().unwrap(),
        vec!["err_export_2025-12-10".to_string()]
    );
}

#[tokio::test]
async fn test_transient_browser_error_retried() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = config(tmp.path());
    cfg.date_attempts = 2;
    let site = FakeSite::healthy(2025, 12);
    site.state().dialog_failures = 1;
    site.export(date(2025, 12, 10), FakeExport::File(export_bytes(&[UMBRELLA_ROW])));

    let (acq, _) = acquisition(&site, cfg);
    let report = acq.run(&[date(2025, 12, 10)]).await.unwrap();

    assert_eq!(report.total_count, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(site.state().export_clicks, 2);
}

#[tokio::test]
async fn test_no_dates_launches_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let site = FakeSite::healthy(2025, 12);
    let (acq, _) = acquisition(&site, config(tmp.path()));

    let report = acq.run(&[]).await.unwrap();
    assert_eq!(report.total_count, 0);
    assert_eq!(site.state().launches, 0);
}

#[tokio::test]
async fn test_steps_out_of_order_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let dirs = RunDirs::create(&cfg.runs_dir()).unwrap();
    let site = FakeSite::healthy(2025, 12);
    let sink = Arc::new(RecordingSink::default());
    let context = site.launch(&dirs).await.unwrap();
    let mut session = ScheduleSession::new(context, &cfg, dirs.downloads.clone(), sink.clone());

    let err = session.select_date(date(2025, 12, 10)).await.unwrap_err();
    assert!(matches!(err, AcquireError::InvalidState { step: "select_date", .. }));
    assert_eq!(*session.state(), SessionState::LoggedOut);

    session.authenticate().await.unwrap();
    session.open_daily_schedule().await.unwrap();
    let err = session
        .trigger_export_and_await(date(2025, 12, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::InvalidState { .. }));
    assert!(sink.tags.lock().unwrap().is_empty());

    session.close().await.unwrap();
    dirs.remove().unwrap();
}
