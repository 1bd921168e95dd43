//! End-to-end chain scenarios against the in-memory back end.

use kestrel_core::{DriverError, HasFilter, Session, StepStatus};
use kestrel_dom::{DomDriver, Interaction, SubmitVia};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A sign-up page whose "Sign up" button is missing, so the flow fails at
/// the button click.
const BROKEN_SIGNUP_PAGE: &str = r#"
    <main>
      <p>Hello, Anonymous!</p>
      <a href="/signup">Sign up instead</a>
      <form id="signup">
        <label for="email">Email</label>
        <input id="email" type="text">
        <label for="password">Password</label>
        <input id="password" type="password">
      </form>
    </main>
"#;

const WORKING_SIGNUP_PAGE: &str = r#"
    <main>
      <p>Hello, Anonymous!</p>
      <form id="signup">
        <label for="email">Email</label>
        <input id="email" type="text">
        <label for="password">Password</label>
        <input id="password" type="password">
        <button type="submit">Sign up</button>
      </form>
      <aside class="promo"><p>Join today</p></aside>
    </main>
"#;

#[tokio::test]
async fn test_failed_step_reports_completed_failed_and_skipped() {
    init_tracing();
    let mut session = kestrel_dom::session_from_html(BROKEN_SIGNUP_PAGE);

    session
        .assert_text("Hello, Anonymous!")
        .click("Sign up instead")
        .fill_in("Email", "e2e@example.com")
        .click_button("Sign up")
        .fill_in("Password", "password123")
        .assert_text("Hello! You are signed in.");
    let failure = session.run().await.unwrap_err();

    assert_eq!(failure.descriptor(), "click_button(\"Sign up\")");
    assert_eq!(failure.position(), 4);
    assert_eq!(failure.total(), 6);
    match failure.cause() {
        DriverError::NotFound(what) => assert!(what.contains("zero elements")),
        other => panic!("unexpected cause: {other:?}"),
    }

    let statuses: Vec<StepStatus> = failure.steps().iter().map(|(_, s)| *s).collect();
    assert!(statuses[..3].iter().all(|s| *s == StepStatus::Completed));
    assert_eq!(statuses[3], StepStatus::Failed);
    assert!(statuses[4..].iter().all(|s| *s == StepStatus::Skipped));

    // fill_in("Password", ...) was never attempted.
    let report = failure.to_string();
    assert!(report.contains("step 4 of 6 failed: click_button(\"Sign up\")"));
    assert!(report.contains("-  5. fill_in(\"Password\", \"password123\")"));
}

#[tokio::test]
async fn test_filled_form_is_the_one_submitted() {
    init_tracing();
    let driver = Arc::new(DomDriver::from_html(WORKING_SIGNUP_PAGE));
    let mut session = Session::new(driver.clone());

    session.fill_in("Email", "e2e@example.com").submit();
    session.run().await.unwrap();

    assert_eq!(
        driver.journal().await,
        vec![
            Interaction::Filled {
                label: "Email".to_string(),
                value: "e2e@example.com".to_string()
            },
            Interaction::Submitted {
                via: SubmitVia::SubmitControl
            },
        ]
    );
}

#[tokio::test]
async fn test_submit_without_prior_form_interaction_fails() {
    init_tracing();
    let mut session = kestrel_dom::session_from_html(WORKING_SIGNUP_PAGE);

    session.submit();
    let failure = session.run().await.unwrap_err();

    assert!(matches!(failure.cause(), DriverError::NoFormTouched));
    assert!(
        failure
            .to_string()
            .contains("no form was previously interacted with")
    );
}

#[tokio::test]
async fn test_within_scopes_a_nested_chain() {
    init_tracing();
    let driver = Arc::new(DomDriver::from_html(WORKING_SIGNUP_PAGE));
    let mut session = Session::new(driver.clone());

    session
        .within("form#signup", |mut nested| {
            nested
                .fill_in("Email", "scoped@example.com")
                .fill_in("Password", "password123")
                .submit();
            nested
        })
        .assert_has("aside.promo", HasFilter::new().text("Join today"));
    session.run().await.unwrap();

    assert_eq!(
        driver.journal().await.last().unwrap(),
        &Interaction::Submitted {
            via: SubmitVia::SubmitControl
        }
    );
}

#[tokio::test]
async fn test_within_fails_on_unresolvable_scope_even_if_nested_chain_would_pass() {
    init_tracing();
    let mut session = kestrel_dom::session_from_html(WORKING_SIGNUP_PAGE);

    session.within("form#other", |mut nested| {
        nested.assert_text("Email");
        nested
    });
    let failure = session.run().await.unwrap_err();

    assert_eq!(failure.descriptor(), "within(\"form#other\")");
    assert!(matches!(failure.cause(), DriverError::NotFound(_)));
}

#[tokio::test]
async fn test_unsupported_navigation_fails_identically_every_time() {
    init_tracing();
    let mut session = kestrel_dom::session_from_html(WORKING_SIGNUP_PAGE);

    let mut messages = Vec::new();
    for _ in 0..2 {
        session.visit("/dashboard");
        let failure = session.run().await.unwrap_err();
        assert!(matches!(
            failure.cause(),
            DriverError::Unsupported {
                operation: "visit",
                ..
            }
        ));
        messages.push(failure.cause().to_string());
    }
    assert_eq!(messages[0], messages[1]);
}

#[tokio::test]
async fn test_drained_session_reruns_only_new_steps() {
    init_tracing();
    let driver = Arc::new(DomDriver::from_html(WORKING_SIGNUP_PAGE));
    let mut session = Session::new(driver.clone());

    session.fill_in("Email", "first@example.com");
    session.run().await.unwrap();

    session.fill_in("Password", "password123");
    session.run().await.unwrap();

    assert_eq!(driver.journal().await.len(), 2);
}
