use crate::driver::{Driver, HasFilter, QueryMap};
use crate::error::{Result, StepFailure};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;

type StepAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// One deferred operation: a diagnostic descriptor, a zero-argument action
/// that performs it against the back end, and the enqueue-time index used
/// for ordering.
struct Step {
    index: usize,
    descriptor: String,
    action: StepAction,
}

/// A fluent, reusable chain of deferred browser-interaction and assertion
/// steps.
///
/// Every fluent method captures its arguments without checking them,
/// appends exactly one step, and returns the same session; nothing is
/// observable until [`Session::run`] drains the queue. A session stays
/// usable after a drain: new steps queue up as before and the next `run`
/// executes only them, with step indices continuing to increase.
///
/// ```no_run
/// # async fn demo(mut session: kestrel_core::Session) -> Result<(), kestrel_core::StepFailure> {
/// session
///     .visit("/")
///     .fill_in("Email", "e2e@example.com")
///     .click_button("Sign up")
///     .assert_text("Hello! You are signed in.");
/// session.run().await
/// # }
/// ```
pub struct Session {
    driver: Arc<dyn Driver>,
    queue: Vec<Step>,
    next_index: usize,
}

impl Session {
    /// Bind a new session to a back end. The queue starts empty.
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            queue: Vec::new(),
            next_index: 0,
        }
    }

    /// Number of steps queued and not yet drained.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn enqueue(&mut self, descriptor: String, action: StepAction) -> &mut Self {
        let index = self.next_index;
        self.next_index += 1;
        tracing::debug!(step = index, %descriptor, "queued");
        self.queue.push(Step {
            index,
            descriptor,
            action,
        });
        self
    }

    /// Queue a navigation to `path`.
    pub fn visit(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("visit({path:?})"),
            Box::new(move || async move { driver.visit(&path).await }.boxed()),
        )
    }

    /// Queue activating any element whose visible text matches.
    pub fn click(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("click({text:?})"),
            Box::new(move || async move { driver.click(&text).await }.boxed()),
        )
    }

    /// Queue activating a link by accessible name.
    pub fn click_link(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("click_link({text:?})"),
            Box::new(move || async move { driver.click_link(&text).await }.boxed()),
        )
    }

    /// Queue activating a button by accessible name.
    pub fn click_button(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("click_button({text:?})"),
            Box::new(move || async move { driver.click_button(&text).await }.boxed()),
        )
    }

    /// Queue filling a labeled (or placeholder-matched) input with `value`.
    pub fn fill_in(&mut self, label: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let label = label.into();
        let value = value.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("fill_in({label:?}, {value:?})"),
            Box::new(move || async move { driver.fill_in(&label, &value).await }.boxed()),
        )
    }

    /// Queue choosing `option` (by visible option text) in a labeled
    /// selection control.
    pub fn select_option(
        &mut self,
        label: impl Into<String>,
        option: impl Into<String>,
    ) -> &mut Self {
        let label = label.into();
        let option = option.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("select_option({label:?}, {option:?})"),
            Box::new(move || async move { driver.select_option(&label, &option).await }.boxed()),
        )
    }

    /// Queue checking a labeled checkbox (idempotent).
    pub fn check(&mut self, label: impl Into<String>) -> &mut Self {
        let label = label.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("check({label:?})"),
            Box::new(move || async move { driver.check(&label).await }.boxed()),
        )
    }

    /// Queue unchecking a labeled checkbox (idempotent).
    pub fn uncheck(&mut self, label: impl Into<String>) -> &mut Self {
        let label = label.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("uncheck({label:?})"),
            Box::new(move || async move { driver.uncheck(&label).await }.boxed()),
        )
    }

    /// Queue selecting a radio control by accessible name.
    pub fn choose(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("choose({name:?})"),
            Box::new(move || async move { driver.choose(&name).await }.boxed()),
        )
    }

    /// Queue submitting the most recently touched form.
    pub fn submit(&mut self) -> &mut Self {
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            "submit()".to_string(),
            Box::new(move || async move { driver.submit().await }.boxed()),
        )
    }

    /// Queue asserting that `text` is visible in the current scope.
    pub fn assert_text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("assert_text({text:?})"),
            Box::new(move || async move { driver.assert_text(&text, true).await }.boxed()),
        )
    }

    /// Queue refuting that `text` is visible in the current scope.
    pub fn refute_text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("refute_text({text:?})"),
            Box::new(move || async move { driver.assert_text(&text, false).await }.boxed()),
        )
    }

    /// Queue asserting that elements matching `selector` exist, subject to
    /// `filter`.
    pub fn assert_has(&mut self, selector: impl Into<String>, filter: HasFilter) -> &mut Self {
        let selector = selector.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("assert_has({selector:?}{})", filter.describe()),
            Box::new(move || {
                async move { driver.assert_selector(&selector, &filter, true).await }.boxed()
            }),
        )
    }

    /// Queue refuting that elements matching `selector` exist, subject to
    /// `filter`.
    pub fn refute_has(&mut self, selector: impl Into<String>, filter: HasFilter) -> &mut Self {
        let selector = selector.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("refute_has({selector:?}{})", filter.describe()),
            Box::new(move || {
                async move { driver.assert_selector(&selector, &filter, false).await }.boxed()
            }),
        )
    }

    /// Queue asserting the current location path, as a whole-segment prefix
    /// match ignoring any query string.
    pub fn assert_path(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("assert_path({path:?})"),
            Box::new(move || async move { driver.assert_path(&path, None, true).await }.boxed()),
        )
    }

    /// Queue asserting the current location path and its exact query
    /// parameters (order-independent key/value equivalence).
    pub fn assert_path_with_query(
        &mut self,
        path: impl Into<String>,
        query: &[(&str, &str)],
    ) -> &mut Self {
        let path = path.into();
        let query: QueryMap = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("assert_path({path:?}, query: {query:?})"),
            Box::new(move || {
                async move { driver.assert_path(&path, Some(&query), true).await }.boxed()
            }),
        )
    }

    /// Queue refuting the current location path.
    pub fn refute_path(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("refute_path({path:?})"),
            Box::new(move || async move { driver.assert_path(&path, None, false).await }.boxed()),
        )
    }

    /// Queue a scoped sub-chain: when this step executes, `selector` is
    /// resolved against the current scope (zero matches fail the step), a
    /// brand-new session is built around the narrowed back end, `build`
    /// runs synchronously to queue the nested steps, and the nested
    /// session's own drain is awaited. A nested failure surfaces its
    /// underlying cause as this step's cause.
    pub fn within<F>(&mut self, selector: impl Into<String>, build: F) -> &mut Self
    where
        F: FnOnce(Session) -> Session + Send + 'static,
    {
        let selector = selector.into();
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            format!("within({selector:?})"),
            Box::new(move || {
                async move {
                    let scoped = driver.scoped(&selector).await?;
                    let mut nested = build(Session::new(Arc::from(scoped)));
                    nested.run().await.map_err(StepFailure::into_cause)
                }
                .boxed()
            }),
        )
    }

    /// Queue a diagnostic snapshot of visible state.
    ///
    /// A failure here aborts the chain like any other step; diagnostics do
    /// not get silent-failure semantics.
    pub fn debug(&mut self) -> &mut Self {
        let driver = Arc::clone(&self.driver);
        self.enqueue(
            "debug()".to_string(),
            Box::new(move || async move { driver.debug_dump().await }.boxed()),
        )
    }

    /// Drain the pending queue, executing each step in insertion order.
    ///
    /// The queue is swapped out for an empty one before the first step
    /// runs, so enqueues issued while draining never interleave into the
    /// in-flight snapshot. The first failing step stops the drain and
    /// raises a [`StepFailure`] carrying the full snapshot trace and the
    /// original cause; steps after it are never invoked.
    pub async fn run(&mut self) -> std::result::Result<(), StepFailure> {
        let steps = std::mem::take(&mut self.queue);
        let descriptors: Vec<String> = steps.iter().map(|s| s.descriptor.clone()).collect();
        tracing::debug!(total = steps.len(), "draining chain");

        for (offset, step) in steps.into_iter().enumerate() {
            let position = offset + 1;
            let index = step.index;
            tracing::debug!(step = index, descriptor = %step.descriptor, "executing");
            if let Err(cause) = (step.action)().await {
                tracing::debug!(step = index, %cause, "step failed, aborting drain");
                return Err(StepFailure::new(descriptors, position, cause));
            }
        }
        Ok(())
    }
}
