//! In-page scripts evaluated through [`PageDriver::evaluate`](crate::PageDriver::evaluate).
//!
//! Every script is a single expression. String arguments are embedded as JSON
//! literals.

use serde_json::Value;

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn js_string_array(values: &[&str]) -> String {
    Value::Array(values.iter().map(|v| Value::String(v.to_string())).collect()).to_string()
}

/// JavaScript expression resolving to the scroll container element.
fn container_expr(candidates: &[&str]) -> String {
    format!(
        "({}.map(s => document.querySelector(s)).find(e => e) \
         || document.scrollingElement || document.documentElement)",
        js_string_array(candidates)
    )
}

/// `outerHTML` of the first element matching `css`, or `null`.
pub fn outer_html(css: &str) -> String {
    format!(
        "(() => {{ const e = document.querySelector({}); return e ? e.outerHTML : null; }})()",
        js_string(css)
    )
}

/// Scroll the container to its maximum extent.
pub fn scroll_to_end(candidates: &[&str]) -> String {
    format!(
        "(() => {{ const c = {}; c.scrollTo(0, c.scrollHeight); \
         window.scrollTo(0, document.body ? document.body.scrollHeight : 0); return true; }})()",
        container_expr(candidates)
    )
}

/// Current `scrollHeight` of the container.
pub fn content_height(candidates: &[&str]) -> String {
    format!("(() => {}.scrollHeight)()", container_expr(candidates))
}

/// `{ ready, resources }` for the network-idle heuristic.
pub fn network_activity() -> String {
    "(() => ({ ready: document.readyState, \
     resources: performance.getEntriesByType('resource').length }))()"
        .to_string()
}

/// `{ origin, entries }` with the page's localStorage as `[key, value]` pairs.
pub fn local_storage_snapshot() -> String {
    "(() => { let entries = []; try { entries = Object.entries(window.localStorage); } \
     catch (e) {} return { origin: window.location.origin, entries }; })()"
        .to_string()
}

/// Script run on every new document: seeds localStorage for `origin`.
pub fn seed_local_storage(origin: &str, entries: &[(String, String)]) -> String {
    let pairs = Value::Array(
        entries
            .iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), Value::String(v.clone())]))
            .collect(),
    );
    format!(
        "(() => {{ if (window.location.origin !== {}) return; \
         for (const [k, v] of {}) {{ try {{ window.localStorage.setItem(k, v); }} catch (e) {{}} }} }})()",
        js_string(origin),
        pairs
    )
}

/// Marks elements matching `css` (and containing `text`, innermost only) with
/// `data-catalog-match=token` and returns how many were marked.
pub fn tag_matches(css: &str, text: Option<&str>, visible_only: bool, token: &str) -> String {
    let text = text.map(js_string).unwrap_or_else(|| "null".to_string());
    format!(
        "(() => {{ \
         const css = {css}; const text = {text}; const token = {token}; \
         document.querySelectorAll('[data-catalog-match]').forEach(e => e.removeAttribute('data-catalog-match')); \
         const visible = e => {{ const r = e.getBoundingClientRect(); const s = window.getComputedStyle(e); \
           return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }}; \
         let found = Array.from(document.querySelectorAll(css)); \
         if (text !== null) {{ \
           found = found.filter(e => (e.innerText || e.textContent || '').includes(text)); \
           found = found.filter(e => !found.some(o => o !== e && e.contains(o))); }} \
         if ({visible_only}) found = found.filter(visible); \
         found.forEach(e => e.setAttribute('data-catalog-match', token)); \
         return found.length; }})()",
        css = js_string(css),
        text = text,
        token = js_string(token),
        visible_only = visible_only,
    )
}

/// Selector for elements marked by [`tag_matches`].
pub fn tagged_selector(token: &str) -> String {
    format!("[data-catalog-match={}]", js_string(token))
}

/// Function declaration for `Element::call_js_fn`: clears a controlled input.
pub const CLEAR_INPUT_FN: &str = "function() { \
    const proto = Object.getPrototypeOf(this); \
    const desc = Object.getOwnPropertyDescriptor(proto, 'value'); \
    if (desc && desc.set) { desc.set.call(this, ''); } else { this.value = ''; } \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
    this.dispatchEvent(new Event('change', { bubbles: true })); \
    return true; }";

/// Function declaration for `Element::call_js_fn`: `{ connected, visible }`.
pub const ELEMENT_STATE_FN: &str = "function() { \
    const r = this.getBoundingClientRect(); const s = window.getComputedStyle(this); \
    return { connected: this.isConnected, \
             visible: this.isConnected && r.width > 0 && r.height > 0 \
                      && s.visibility !== 'hidden' && s.display !== 'none' }; }";
