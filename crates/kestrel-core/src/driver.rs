use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

/// Unordered query-parameter map used by path assertions.
pub type QueryMap = BTreeMap<String, String>;

/// Filters applied by `assert_has` / `refute_has`.
///
/// Defaults mean "at least one match, any contained text". The timeout is a
/// hint for back ends that can wait for the condition (the real browser
/// polls up to it); back ends with a synchronous view of the world ignore
/// it.
#[derive(Debug, Clone, Default)]
pub struct HasFilter {
    pub text: Option<String>,
    pub exact: bool,
    pub count: Option<usize>,
    pub timeout: Option<Duration>,
}

impl HasFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only count elements whose visible text contains (or, with `exact`,
    /// equals) the given text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Require the text filter to match the whole visible text.
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Require exactly this many matches instead of "at least one".
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// How long a waiting-capable back end may poll before giving up.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Render the non-default parts for step descriptors and error text.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(text) = &self.text {
            let _ = write!(out, ", text: {text:?}");
        }
        if self.exact {
            out.push_str(", exact");
        }
        if let Some(count) = self.count {
            let _ = write!(out, ", count: {count}");
        }
        if let Some(timeout) = self.timeout {
            let _ = write!(out, ", timeout: {timeout:?}");
        }
        out
    }
}

/// Capability contract every interaction back end satisfies.
///
/// One asynchronous operation per chain method family; each returns no value
/// on success and fails with a `DriverError` on inability to complete. Back
/// ends may implement only a subset faithfully, provided every unimplemented
/// operation fails deterministically and immediately with
/// `DriverError::Unsupported` naming the operation — never a silent no-op.
///
/// Form-filling operations additionally record which enclosing form was
/// touched, as single-slot state inside the back end, so a later `submit`
/// can find it. The slot is overwritten by every form interaction and never
/// cleared.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to a path. Back ends without navigation must fail.
    async fn visit(&self, path: &str) -> Result<()>;

    /// Activate any element whose visible text matches.
    async fn click(&self, text: &str) -> Result<()>;

    /// Activate a link-like element by accessible name.
    async fn click_link(&self, text: &str) -> Result<()>;

    /// Activate a button-like element by accessible name.
    async fn click_button(&self, text: &str) -> Result<()>;

    /// Set the value of a labeled or placeholder-matched input.
    ///
    /// A label match always wins; the placeholder is only consulted when no
    /// label matches.
    async fn fill_in(&self, label: &str, value: &str) -> Result<()>;

    /// Choose an option, by visible option text, in a labeled selection
    /// control.
    async fn select_option(&self, label: &str, option: &str) -> Result<()>;

    /// Force a labeled checkbox to checked. No-op if already checked.
    async fn check(&self, label: &str) -> Result<()>;

    /// Force a labeled checkbox to unchecked. No-op if already unchecked.
    async fn uncheck(&self, label: &str) -> Result<()>;

    /// Select a radio control by accessible name.
    async fn choose(&self, name: &str) -> Result<()>;

    /// Submit the most recently touched form.
    ///
    /// Prefers an explicit submit-typed control inside that form; falls back
    /// to a back-end-specific default completion gesture. Fails with
    /// `DriverError::NoFormTouched` when no form interaction was recorded.
    async fn submit(&self) -> Result<()>;

    /// Assert (`present`) or refute (`!present`) that text is visible
    /// anywhere in the current scope.
    async fn assert_text(&self, text: &str, present: bool) -> Result<()>;

    /// Assert or refute that elements matching a structural selector exist,
    /// subject to the filter's text/count constraints.
    async fn assert_selector(&self, selector: &str, filter: &HasFilter, present: bool)
        -> Result<()>;

    /// Assert or refute the current location path. With a query map, the
    /// path must match exactly and the query parameters must be equivalent
    /// as an unordered key/value set; without one, the path is a prefix
    /// match on whole segments and any query string on the current location
    /// is ignored.
    async fn assert_path(&self, path: &str, query: Option<&QueryMap>, present: bool) -> Result<()>;

    /// Resolve a structural selector against the current scope and return a
    /// new driver rooted at the narrowed context. Fails on zero matches.
    async fn scoped(&self, selector: &str) -> Result<Box<dyn Driver>>;

    /// Capture a best-effort snapshot of visible state for diagnostics: a
    /// full-canvas image on a real browser, a structural dump in memory.
    async fn debug_dump(&self) -> Result<()>;
}
