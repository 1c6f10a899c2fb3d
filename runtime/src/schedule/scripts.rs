//! JavaScript snippets evaluated in the schedule application's top window.
//!
//! Every snippet is an expression returning a plain object, starts with a
//! `/* rentsched:<tag> */` marker naming the step, and never triggers UI
//! side effects synchronously: clicks and page entry points are deferred
//! with `setTimeout` so that a native dialog cannot block the evaluation.
//!
//! Caller-provided values are embedded as JSON string literals.

use serde::Serialize;

/// How a frame is reached from the top-level window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FrameRef {
    /// `window.frames[name]`.
    Name(String),
    /// `window.frames[index]`.
    Index(u32),
    /// First child frame whose name differs from the given one.
    NotNamed(String),
}

/// The window a script acts in: the top-level window, or the first frame
/// reference that resolves to a same-origin document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameScope {
    refs: Vec<FrameRef>,
}

impl FrameScope {
    pub fn top() -> Self {
        Self::default()
    }

    pub fn frame(refs: Vec<FrameRef>) -> Self {
        Self { refs }
    }

    /// JS expression evaluating to the scope's `Window`, or `null`.
    pub fn resolver_js(&self) -> String {
        if self.refs.is_empty() {
            return "window".to_string();
        }
        format!(
            r#"((refs) => {{
    const usable = (w) => {{ try {{ return w && w.document ? w : null; }} catch (e) {{ return null; }} }};
    for (const r of refs) {{
        let w = null;
        if (r.kind === 'index' || r.kind === 'name') {{
            w = window.frames[r.value] || null;
        }} else {{
            for (let i = 0; i < window.frames.length; i++) {{
                let name = null;
                try {{ name = window.frames[i].name; }} catch (e) {{ continue; }}
                if (name !== r.value) {{ w = window.frames[i]; break; }}
            }}
        }}
        w = usable(w);
        if (w) return w;
    }}
    return null;
}})({refs})"#,
            refs = json_literal(&self.refs)
        )
    }
}

/// Embed a value as a JS literal.
pub fn json_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Prefix a script with its step marker.
pub fn tagged(tag: &str, body: &str) -> String {
    format!("/* rentsched:{tag} */ {body}")
}

/// Fill the login form and submit it.
pub fn fill_login(username: &str, password: &str) -> String {
    tagged(
        "login",
        &format!(
            r#"(() => {{
    const id = document.getElementById('Login_id');
    const pw = document.getElementById('Login_pw');
    const submit = document.querySelector("input[type='submit']");
    if (!id || !pw || !submit) return {{ ok: false, reason: 'login form not found' }};
    id.value = {user};
    pw.value = {pass};
    for (const el of [id, pw]) {{
        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    }}
    setTimeout(() => submit.click(), 0);
    return {{ ok: true }};
}})()"#,
            user = json_literal(username),
            pass = json_literal(password),
        ),
    )
}

/// Read the calendar's displayed year/month controls inside `scope`.
///
/// Returns `{ selects: [yearText, monthText] | null, header: text | null }`.
pub fn calendar_probe(scope: &FrameScope) -> String {
    tagged(
        "calendar_probe",
        &format!(
            r#"(() => {{
    const win = {resolve};
    if (!win) return {{ selects: null, header: null, reason: 'frame not available' }};
    const doc = win.document;
    const selects = doc.querySelectorAll('#sidebar select');
    if (selects.length >= 2) {{
        const text = (s) => s.selectedIndex >= 0 ? s.options[s.selectedIndex].text : '';
        return {{ selects: [text(selects[0]), text(selects[1])], header: null }};
    }}
    const row = doc.querySelector('#sidebar .lnb-cal tr:first-child');
    return {{ selects: null, header: row ? row.innerText : null }};
}})()"#,
            resolve = scope.resolver_js()
        ),
    )
}

/// Invoke the page's own date navigation entry point inside `scope`.
pub fn go_plan_today(scope: &FrameScope, date: &str, year: i32, month: u32) -> String {
    tagged(
        &format!("go_plan_today:{date}"),
        &format!(
            r#"(() => {{
    const win = {resolve};
    if (!win) return {{ ok: false, reason: 'frame not available' }};
    if (typeof win.goPlanToday !== 'function') return {{ ok: false, reason: 'goPlanToday is not defined' }};
    win.setTimeout(() => win.goPlanToday({date}, {year}, {month}), 0);
    return {{ ok: true }};
}})()"#,
            resolve = scope.resolver_js(),
            date = json_literal(date),
            year = json_literal(&year.to_string()),
            month = json_literal(&month.to_string()),
        ),
    )
}
