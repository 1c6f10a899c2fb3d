//! Ordered element locators with bounded waits.
//!
//! A [`Locator`] holds attempts in priority order. Each attempt polls its
//! strategy until it matches or its wait runs out, then the next attempt
//! is tried. The first match is clicked.

use super::scripts::{json_literal, tagged, FrameScope};
use crate::renderer::RenderContext;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How an element is found inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    XPath(String),
    Css(String),
}

impl Strategy {
    /// `//tag[contains(text(), 'label')]`
    pub fn text(tag: &str, label: &str) -> Self {
        Strategy::XPath(format!("//{tag}[contains(text(), {})]", xpath_literal(label)))
    }

    /// `//tag[contains(@attr, 'fragment')]`
    pub fn attr_contains(tag: &str, attr: &str, fragment: &str) -> Self {
        Strategy::XPath(format!(
            "//{tag}[contains(@{attr}, {})]",
            xpath_literal(fragment)
        ))
    }

    pub fn css(selector: &str) -> Self {
        Strategy::Css(selector.to_string())
    }

    pub fn xpath(expr: &str) -> Self {
        Strategy::XPath(expr.to_string())
    }

    fn find_js(&self) -> String {
        match self {
            Strategy::XPath(expr) => format!(
                "doc.evaluate({}, doc, null, 9, null).singleNodeValue",
                json_literal(expr)
            ),
            Strategy::Css(sel) => format!("doc.querySelector({})", json_literal(sel)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::XPath(expr) => write!(f, "xpath {expr}"),
            Strategy::Css(sel) => write!(f, "css {sel}"),
        }
    }
}

/// Quote a string as an XPath 1.0 literal.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// What a match must satisfy before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Present in the document.
    Present,
    /// Present, enabled and laid out with a non-empty box.
    Clickable,
}

#[derive(Debug, Clone)]
struct Attempt {
    strategy: Strategy,
    wait: Duration,
    readiness: Readiness,
}

/// Every attempt of a locator failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{locator}: no strategy matched ({})", .tried.join("; "))]
pub struct LocateError {
    pub locator: &'static str,
    pub tried: Vec<String>,
}

/// A named, ordered list of ways to find one clickable element.
#[derive(Debug, Clone)]
pub struct Locator {
    name: &'static str,
    scope: FrameScope,
    attempts: Vec<Attempt>,
}

impl Locator {
    pub fn new(name: &'static str, scope: FrameScope) -> Self {
        Self {
            name,
            scope,
            attempts: Vec::new(),
        }
    }

    /// Append an attempt. Attempts run in insertion order.
    pub fn then(mut self, strategy: Strategy, wait: Duration, readiness: Readiness) -> Self {
        self.attempts.push(Attempt {
            strategy,
            wait,
            readiness,
        });
        self
    }

    /// Script that finds attempt `index` and, if ready, schedules a click.
    pub fn click_script(&self, index: usize) -> Option<String> {
        let attempt = self.attempts.get(index)?;
        let ready = match attempt.readiness {
            Readiness::Present => "true",
            Readiness::Clickable => {
                "(() => { const r = el.getBoundingClientRect(); return !el.disabled && (r.width > 0 || r.height > 0); })()"
            }
        };
        let body = format!(
            r#"(() => {{
    const win = {resolve};
    if (!win) return {{ found: false, reason: 'frame not available' }};
    const doc = win.document;
    let el = null;
    try {{ el = {find}; }} catch (e) {{ return {{ found: false, reason: String(e) }}; }}
    if (!el) return {{ found: false, reason: 'no match' }};
    if (!{ready}) return {{ found: false, reason: 'not clickable' }};
    win.setTimeout(() => el.click(), 0);
    return {{ found: true }};
}})()"#,
            resolve = self.scope.resolver_js(),
            find = attempt.strategy.find_js(),
        );
        Some(tagged(&format!("locate:{}:{index}", self.name), &body))
    }

    /// Click the first element any attempt finds.
    ///
    /// Returns the index of the attempt that matched. Script failures count
    /// as a miss for the current probe.
    pub async fn click(
        &self,
        context: &dyn RenderContext,
        poll: Duration,
    ) -> Result<usize, LocateError> {
        let mut tried = Vec::with_capacity(self.attempts.len());

        for (index, attempt) in self.attempts.iter().enumerate() {
            let Some(script) = self.click_script(index) else {
                continue;
            };
            let deadline = Instant::now() + attempt.wait;
            let reason = loop {
                let last = match context.execute_js(&script).await {
                    Ok(v) if v.get("found").and_then(|f| f.as_bool()) == Some(true) => {
                        debug!("{}: matched {}", self.name, attempt.strategy);
                        return Ok(index);
                    }
                    Ok(v) => v
                        .get("reason")
                        .and_then(|r| r.as_str())
                        .unwrap_or("no match")
                        .to_string(),
                    Err(e) => format!("{e:#}"),
                };
                if Instant::now() >= deadline {
                    break last;
                }
                tokio::time::sleep(poll).await;
            };
            tried.push(format!("{}: {reason}", attempt.strategy));
        }

        Err(LocateError {
            locator: self.name,
            tried,
        })
    }
}
