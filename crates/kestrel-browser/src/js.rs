//! JavaScript snippets the driver evaluates in the page.
//!
//! Each snippet is a self-contained IIFE that resolves the scope chain,
//! performs one operation, and returns a `{ ok, kind, message }` verdict
//! object the Rust side maps onto `DriverError`. Literal arguments are
//! embedded JSON-escaped, never spliced raw.

use kestrel_core::HasFilter;

const HELPERS: &str = r#"const norm = (s) => (s || "").replace(/\s+/g, " ").trim();
const fail = (kind, message) => ({ ok: false, kind, message });
const pass = () => ({ ok: true });
const accessibleName = (el) => el.tagName === "INPUT" ? norm(el.value) : norm(el.innerText !== undefined ? el.innerText : el.textContent);
const visibleText = (el) => norm(el === document ? document.body.innerText : el.innerText);
const labelledControl = (root, label) => {
  for (const l of Array.from(root.querySelectorAll("label"))) {
    if (norm(l.textContent) !== label) continue;
    if (l.htmlFor) {
      const c = document.getElementById(l.htmlFor);
      if (c) return c;
      continue;
    }
    const c = l.querySelector("input, textarea, select");
    if (c) return c;
  }
  return null;
};
const placeholderControl = (root, label) => Array.from(root.querySelectorAll("input[placeholder], textarea[placeholder]")).find((el) => el.placeholder === label) || null;
const rememberForm = (el) => { const form = el.closest("form"); if (form) window.__kestrelLastForm = form; };"#;

fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

fn js_opt_str(s: Option<&str>) -> String {
    s.map_or_else(|| String::from("null"), js_str)
}

fn js_opt_num(n: Option<usize>) -> String {
    n.map_or_else(|| String::from("null"), |n| n.to_string())
}

/// Wrap an operation body into the full script: helpers, scope-chain
/// resolution, then the body (which may reference `scope`).
pub(crate) fn wrap(scope_chain: &[String], body: &str) -> String {
    let chain = serde_json::to_string(scope_chain).unwrap_or_else(|_| String::from("[]"));
    format!(
        "(() => {{\n{HELPERS}\nlet scope = document;\nfor (const sel of {chain}) {{\n  scope = scope.querySelector(sel);\n  if (!scope) return fail(\"scope\", \"scope selector \" + JSON.stringify(sel) + \" matched nothing\");\n}}\n{body}\n}})()"
    )
}

/// `kind` is `"any"`, `"link"` or `"button"`; `what` names the lookup in
/// the zero-elements message.
pub(crate) fn click(kind: &str, text: &str, what: &str) -> String {
    format!(
        r#"const wanted = norm({text});
let candidates;
if ({kind} === "link") candidates = Array.from(scope.querySelectorAll("a"));
else if ({kind} === "button") candidates = Array.from(scope.querySelectorAll("button, input[type=submit], input[type=button], input[type=reset]"));
else candidates = Array.from(scope.querySelectorAll("*"));
candidates = candidates.filter((el) => !el.disabled && accessibleName(el) === wanted);
candidates = candidates.filter((el) => !candidates.some((other) => other !== el && el.contains(other)));
if (candidates.length === 0) return fail("not_found", {what} + " " + JSON.stringify(wanted) + " (zero elements)");
candidates[0].click();
return pass();"#,
        kind = js_str(kind),
        text = js_str(text),
        what = js_str(what),
    )
}

pub(crate) fn fill_in(label: &str, value: &str) -> String {
    format!(
        r#"const label = {label};
let control = labelledControl(scope, norm(label));
if (!control) control = placeholderControl(scope, label);
if (!control) return fail("not_found", "field labelled or placeholder-matched " + JSON.stringify(label) + " (zero elements)");
if (control.tagName === "SELECT") return fail("invalid", JSON.stringify(label) + " resolves to a <select>; use select_option");
if (control.disabled) return fail("invalid", "field labelled " + JSON.stringify(label) + " is disabled");
control.focus();
control.value = {value};
control.dispatchEvent(new Event("input", {{ bubbles: true }}));
control.dispatchEvent(new Event("change", {{ bubbles: true }}));
rememberForm(control);
return pass();"#,
        label = js_str(label),
        value = js_str(value),
    )
}

pub(crate) fn select_option(label: &str, option: &str) -> String {
    format!(
        r#"const label = norm({label});
const control = labelledControl(scope, label);
if (!control) return fail("not_found", "selection control labelled " + JSON.stringify(label) + " (zero elements)");
if (control.tagName !== "SELECT") return fail("invalid", JSON.stringify(label) + " does not resolve to a <select>");
const wanted = norm({option});
const option = Array.from(control.options).find((o) => norm(o.textContent) === wanted);
if (!option) return fail("not_found", "option " + JSON.stringify(wanted) + " in " + JSON.stringify(label) + " (zero elements)");
control.value = option.value;
control.dispatchEvent(new Event("change", {{ bubbles: true }}));
rememberForm(control);
return pass();"#,
        label = js_str(label),
        option = js_str(option),
    )
}

/// Idempotent: a checkbox already in the target state is left alone.
pub(crate) fn set_checked(label: &str, target: bool) -> String {
    format!(
        r#"const label = norm({label});
const control = labelledControl(scope, label) || placeholderControl(scope, {label});
if (!control) return fail("not_found", "checkbox labelled " + JSON.stringify(label) + " (zero elements)");
if (control.tagName !== "INPUT" || control.type !== "checkbox") return fail("invalid", JSON.stringify(label) + " does not resolve to a checkbox");
if (control.disabled) return fail("invalid", "checkbox labelled " + JSON.stringify(label) + " is disabled");
if (control.checked !== {target}) control.click();
rememberForm(control);
return pass();"#,
        label = js_str(label),
        target = target,
    )
}

pub(crate) fn choose(name: &str) -> String {
    format!(
        r#"const name = norm({name});
const control = labelledControl(scope, name);
if (!control) return fail("not_found", "radio labelled " + JSON.stringify(name) + " (zero elements)");
if (control.tagName !== "INPUT" || control.type !== "radio") return fail("invalid", JSON.stringify(name) + " does not resolve to a radio control");
if (!control.checked) control.click();
rememberForm(control);
return pass();"#,
        name = js_str(name),
    )
}

/// Submit the last touched form: explicit submit control first, then the
/// programmatic default gesture.
pub(crate) fn submit() -> String {
    String::from(
        r#"const form = window.__kestrelLastForm;
if (!form || !form.isConnected) return fail("precondition", "no form was previously interacted with");
const control = form.querySelector("button[type=submit], input[type=submit], button:not([type])");
if (control && !control.disabled) control.click();
else if (form.requestSubmit) form.requestSubmit();
else form.submit();
return pass();"#,
    )
}

pub(crate) fn assert_text(text: &str, present: bool) -> String {
    format!(
        r#"const wanted = norm({text});
const present = {present};
const found = visibleText(scope).includes(wanted);
if (found === present) return pass();
return fail("assertion", present
  ? "expected to find text " + JSON.stringify(wanted) + ", but it was not visible"
  : "expected not to find text " + JSON.stringify(wanted) + ", but it was visible");"#,
        text = js_str(text),
        present = present,
    )
}

pub(crate) fn assert_selector(selector: &str, filter: &HasFilter, present: bool) -> String {
    format!(
        r#"const selector = {selector};
let nodes;
try {{ nodes = Array.from(scope.querySelectorAll(selector)); }}
catch (e) {{ return fail("invalid", "unsupported selector " + JSON.stringify(selector)); }}
const text = {text};
const exact = {exact};
if (text !== null) nodes = nodes.filter((el) => exact ? visibleText(el) === norm(text) : visibleText(el).includes(norm(text)));
const count = {count};
const found = nodes.length;
const holds = count === null ? found > 0 : found === count;
if (holds === {present}) return pass();
return fail("assertion", ({present} ? "expected elements matching " : "expected no match for ") + JSON.stringify(selector) + ", found " + found);"#,
        selector = js_str(selector),
        text = js_opt_str(filter.text.as_deref()),
        exact = filter.exact,
        count = js_opt_num(filter.count),
        present = present,
    )
}

/// Existence probe used before narrowing a driver to `selector`.
pub(crate) fn scope_probe(selector: &str) -> String {
    format!(
        r#"const selector = {selector};
try {{
  if (!scope.querySelector(selector)) return fail("not_found", "selector " + JSON.stringify(selector) + " (zero elements)");
}} catch (e) {{
  return fail("invalid", "unsupported selector " + JSON.stringify(selector));
}}
return pass();"#,
        selector = js_str(selector),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_are_json_escaped() {
        let body = fill_in("Email \"work\"", "a\\b");
        assert!(body.contains(r#"const label = "Email \"work\"";"#));
        assert!(body.contains(r#"control.value = "a\\b";"#));
    }

    #[test]
    fn test_wrap_resolves_scope_chain_in_order() {
        let script = wrap(
            &["form#signup".to_string(), ".row".to_string()],
            "return pass();",
        );
        assert!(script.contains(r#"["form#signup",".row"]"#));
        assert!(script.starts_with("(() => {"));
        assert!(script.ends_with("})()"));
    }

    #[test]
    fn test_assert_selector_embeds_filter() {
        let filter = HasFilter::new().text("Join").count(2);
        let body = assert_selector("aside.promo", &filter, true);
        assert!(body.contains(r#"const text = "Join";"#));
        assert!(body.contains("const count = 2;"));
        assert!(body.contains("const exact = false;"));

        let body = assert_selector("aside", &HasFilter::new(), false);
        assert!(body.contains("const text = null;"));
        assert!(body.contains("const count = null;"));
    }
}
