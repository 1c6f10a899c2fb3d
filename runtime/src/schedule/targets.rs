//! Where things live in the schedule application.
//!
//! The application is a frameset: a menu frame (`topFrame`) and a main
//! frame holding the calendar sidebar and the daily schedule.

use super::locator::{xpath_literal, Locator, Readiness, Strategy};
use super::scripts::{FrameRef, FrameScope};
use crate::config::Timeouts;
use std::time::Duration;

pub const MENU_FRAME: &str = "topFrame";
pub const MAIN_FRAME: &str = "mainFrame";

/// The menu frame, by name first and then by position.
pub fn menu_scope() -> FrameScope {
    FrameScope::frame(vec![
        FrameRef::Name(MENU_FRAME.to_string()),
        FrameRef::Index(0),
    ])
}

/// The main frame: second frame, then by name, then any non-menu frame.
pub fn main_scope() -> FrameScope {
    FrameScope::frame(vec![
        FrameRef::Index(1),
        FrameRef::Name(MAIN_FRAME.to_string()),
        FrameRef::NotNamed(MENU_FRAME.to_string()),
    ])
}

pub fn schedule_menu(t: &Timeouts) -> Locator {
    Locator::new("schedule_menu", menu_scope())
        .then(
            Strategy::text("div", "대여일정"),
            t.menu_wait,
            Readiness::Clickable,
        )
        .then(
            Strategy::xpath("/html/body/div/div/div[3]"),
            Duration::ZERO,
            Readiness::Present,
        )
}

pub fn daily_view(t: &Timeouts) -> Locator {
    Locator::new("daily_view", main_scope())
        .then(Strategy::text("a", "일간"), t.daily_link_wait, Readiness::Present)
        .then(
            Strategy::attr_contains("a", "href", "rent_day"),
            Duration::ZERO,
            Readiness::Present,
        )
}

pub fn calendar_next() -> Locator {
    Locator::new("calendar_next", main_scope())
        .then(Strategy::css("#sidebar .next"), Duration::ZERO, Readiness::Present)
        .then(
            Strategy::xpath("//*[@id='sidebar']//a[contains(text(), '>')]"),
            Duration::ZERO,
            Readiness::Present,
        )
}

pub fn calendar_prev() -> Locator {
    Locator::new("calendar_prev", main_scope())
        .then(Strategy::css("#sidebar .prev"), Duration::ZERO, Readiness::Present)
        .then(
            Strategy::xpath("//*[@id='sidebar']//a[contains(text(), '<')]"),
            Duration::ZERO,
            Readiness::Present,
        )
}

/// The day link of the displayed month, skipping spill-over days of
/// neighbouring months.
pub fn day_cell(day: u32, t: &Timeouts) -> Locator {
    Locator::new("day_cell", main_scope()).then(
        Strategy::XPath(format!(
            "//div[contains(@class, 'lnb-cal')]//td[not(contains(@class, 'other'))]//a[normalize-space(text())={}]",
            xpath_literal(&day.to_string())
        )),
        t.date_link_wait,
        Readiness::Clickable,
    )
}

pub fn export_button(t: &Timeouts) -> Locator {
    Locator::new("export_button", main_scope())
        .then(Strategy::text("a", "엑셀"), t.export_button_wait, Readiness::Present)
        .then(
            Strategy::attr_contains("a", "href", "excel"),
            Duration::ZERO,
            Readiness::Present,
        )
        .then(
            Strategy::xpath("//img[contains(@src, 'excel')]/parent::a"),
            Duration::ZERO,
            Readiness::Present,
        )
}
