use crate::{js, path_match};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use kestrel_core::{Driver, DriverError, HasFilter, QueryMap, Result};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// How long `assert_has`/`refute_has` polls for its condition when the
/// filter carries no timeout of its own.
const DEFAULT_ASSERT_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Verdict object every evaluated snippet resolves to.
#[derive(Debug, Deserialize)]
struct Verdict {
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl Verdict {
    fn into_result(self, operation: &'static str) -> Result<()> {
        if self.ok {
            return Ok(());
        }
        let message = self
            .message
            .unwrap_or_else(|| format!("{operation} failed"));
        match self.kind.as_deref() {
            Some("not_found") | Some("scope") => Err(DriverError::NotFound(message)),
            Some("precondition") => Err(DriverError::NoFormTouched),
            Some("assertion") => Err(DriverError::Assertion(message)),
            Some("invalid") => Err(DriverError::Invalid(message)),
            _ => Err(DriverError::Backend(message)),
        }
    }
}

/// Real-browser back end over a Chrome DevTools Protocol page.
///
/// Element lookup and interaction run as JavaScript in the page, so one
/// evaluation resolves and acts atomically; the driver maps each snippet's
/// verdict onto `DriverError`. The last touched form lives in the page
/// itself (`window.__kestrelLastForm`), which keeps it accurate across
/// navigations within one document and naturally stale-able across them.
///
/// A scoped driver carries the selector chain that narrows it; every
/// snippet re-resolves the chain from the document root before acting.
pub struct BrowserDriver {
    page: Page,
    base: Url,
    scope: Vec<String>,
}

impl BrowserDriver {
    pub fn new(page: Page, base: Url) -> Self {
        Self {
            page,
            base,
            scope: Vec::new(),
        }
    }

    async fn run_script(&self, operation: &'static str, body: String) -> Result<()> {
        let script = js::wrap(&self.scope, &body);
        let outcome = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::Backend(format!("{operation}: {e}")))?;
        let verdict: Verdict = outcome
            .into_value()
            .map_err(|e| DriverError::Backend(format!("{operation}: malformed verdict: {e}")))?;
        verdict.into_result(operation)
    }

    async fn current_url(&self) -> Result<Url> {
        let current = self
            .page
            .url()
            .await
            .map_err(|e| DriverError::Backend(format!("could not read location: {e}")))?
            .ok_or_else(|| DriverError::Backend("page has no location".to_string()))?;
        Url::parse(&current)
            .map_err(|e| DriverError::Backend(format!("unparseable location {current:?}: {e}")))
    }
}

#[async_trait]
impl Driver for BrowserDriver {
    async fn visit(&self, path: &str) -> Result<()> {
        let target = self.base.join(path).map_err(|e| {
            DriverError::Invalid(format!("cannot join {path:?} onto {}: {e}", self.base))
        })?;
        tracing::debug!(%target, "navigating");
        self.page
            .goto(target.as_str())
            .await
            .map_err(|e| DriverError::Backend(format!("navigation to {target} failed: {e}")))?;
        Ok(())
    }

    async fn click(&self, text: &str) -> Result<()> {
        self.run_script("click", js::click("any", text, "visible text"))
            .await
    }

    async fn click_link(&self, text: &str) -> Result<()> {
        self.run_script("click_link", js::click("link", text, "link"))
            .await
    }

    async fn click_button(&self, text: &str) -> Result<()> {
        self.run_script("click_button", js::click("button", text, "button"))
            .await
    }

    async fn fill_in(&self, label: &str, value: &str) -> Result<()> {
        self.run_script("fill_in", js::fill_in(label, value)).await
    }

    async fn select_option(&self, label: &str, option: &str) -> Result<()> {
        self.run_script("select_option", js::select_option(label, option))
            .await
    }

    async fn check(&self, label: &str) -> Result<()> {
        self.run_script("check", js::set_checked(label, true)).await
    }

    async fn uncheck(&self, label: &str) -> Result<()> {
        self.run_script("uncheck", js::set_checked(label, false))
            .await
    }

    async fn choose(&self, name: &str) -> Result<()> {
        self.run_script("choose", js::choose(name)).await
    }

    async fn submit(&self) -> Result<()> {
        self.run_script("submit", js::submit()).await
    }

    async fn assert_text(&self, text: &str, present: bool) -> Result<()> {
        self.run_script("assert_text", js::assert_text(text, present))
            .await
    }

    async fn assert_selector(
        &self,
        selector: &str,
        filter: &HasFilter,
        present: bool,
    ) -> Result<()> {
        let timeout = filter.timeout.unwrap_or(DEFAULT_ASSERT_TIMEOUT);
        let deadline = tokio::time::Instant::now() + timeout;
        let body = js::assert_selector(selector, filter, present);
        // The page may still be reacting to a previous step; poll the
        // condition until the deadline instead of failing on first look.
        loop {
            match self.run_script("assert_has", body.clone()).await {
                Ok(()) => return Ok(()),
                Err(err @ DriverError::Assertion(_)) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(err);
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn assert_path(&self, path: &str, query: Option<&QueryMap>, present: bool) -> Result<()> {
        let current = self.current_url().await?;
        let matched = path_match::location_matches(&current, path, query);
        if matched == present {
            return Ok(());
        }
        let expected = path_match::describe_expected(path, query);
        let actual = path_match::describe_current(&current);
        if present {
            Err(DriverError::Assertion(format!(
                "expected location {expected}, but it was {actual}"
            )))
        } else {
            Err(DriverError::Assertion(format!(
                "expected location not to be {expected}, but it was {actual}"
            )))
        }
    }

    async fn scoped(&self, selector: &str) -> Result<Box<dyn Driver>> {
        self.run_script("within", js::scope_probe(selector)).await?;
        let mut scope = self.scope.clone();
        scope.push(selector.to_string());
        Ok(Box::new(BrowserDriver {
            page: self.page.clone(),
            base: self.base.clone(),
            scope,
        }))
    }

    async fn debug_dump(&self) -> Result<()> {
        let bytes = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| DriverError::Backend(format!("screenshot failed: {e}")))?;
        let path = std::env::temp_dir().join(format!(
            "kestrel-debug-{}.png",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%3f")
        ));
        std::fs::write(&path, &bytes)
            .map_err(|e| DriverError::Backend(format!("could not write {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "captured debug screenshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(ok: bool, kind: Option<&str>, message: Option<&str>) -> Verdict {
        Verdict {
            ok,
            kind: kind.map(str::to_string),
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn test_verdict_success_maps_to_ok() {
        assert!(verdict(true, None, None).into_result("click").is_ok());
    }

    #[test]
    fn test_verdict_kinds_map_to_driver_errors() {
        let err = verdict(false, Some("not_found"), Some("button \"x\" (zero elements)"))
            .into_result("click_button")
            .unwrap_err();
        assert!(matches!(err, DriverError::NotFound(_)));

        let err = verdict(false, Some("scope"), Some("scope matched nothing"))
            .into_result("fill_in")
            .unwrap_err();
        assert!(matches!(err, DriverError::NotFound(_)));

        let err = verdict(false, Some("precondition"), None)
            .into_result("submit")
            .unwrap_err();
        assert!(matches!(err, DriverError::NoFormTouched));

        let err = verdict(false, Some("assertion"), Some("nope"))
            .into_result("assert_text")
            .unwrap_err();
        assert!(matches!(err, DriverError::Assertion(_)));

        let err = verdict(false, Some("invalid"), Some("bad selector"))
            .into_result("assert_has")
            .unwrap_err();
        assert!(matches!(err, DriverError::Invalid(_)));
    }

    #[test]
    fn test_verdict_without_kind_is_a_backend_error() {
        let err = verdict(false, None, None).into_result("click").unwrap_err();
        match err {
            DriverError::Backend(message) => assert_eq!(message, "click failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
