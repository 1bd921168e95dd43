use crate::trace::{self, StepStatus};
use thiserror::Error;

/// Failure cause produced by a back end while executing one queued step.
///
/// Back-end-internal errors are never altered in meaning, only wrapped into
/// `Backend`; everything else carries a message intended to be readable
/// inside a step trace.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("`{operation}` is not supported by this back end: {reason}")]
    Unsupported {
        operation: &'static str,
        reason: &'static str,
    },

    #[error("no element matched {0}")]
    NotFound(String),

    #[error("{0} matched more than one element")]
    Ambiguous(String),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("no form was previously interacted with; fill in, select, check or choose a field before calling submit()")]
    NoFormTouched,

    #[error("invalid argument: {0}")]
    Invalid(String),

    #[error("back end error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// The single aggregate error raised when a chain drain hits a failing step.
///
/// `Display` renders the full step-status trace; the original back-end error
/// stays available as a structured `source` so calling code can inspect it
/// instead of parsing the report text.
#[derive(Error, Debug)]
#[error("{report}")]
pub struct StepFailure {
    descriptor: String,
    position: usize,
    total: usize,
    steps: Vec<(String, StepStatus)>,
    report: String,
    #[source]
    cause: DriverError,
}

impl StepFailure {
    /// Build a failure from the drained snapshot's descriptors.
    ///
    /// `position` is one-based within the snapshot.
    pub(crate) fn new(descriptors: Vec<String>, position: usize, cause: DriverError) -> Self {
        let report = trace::render_trace(&descriptors, position, &cause);
        let steps = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.clone(), StepStatus::classify(i + 1, position)))
            .collect();
        Self {
            descriptor: descriptors[position - 1].clone(),
            position,
            total: descriptors.len(),
            steps,
            report,
            cause,
        }
    }

    /// Descriptor of the step that failed, e.g. `click_button("Sign up")`.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// One-based position of the failed step within the drained snapshot.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of steps in the drained snapshot.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Every drained step in original order with its derived status.
    pub fn steps(&self) -> &[(String, StepStatus)] {
        &self.steps
    }

    /// The original back-end error that failed the step.
    pub fn cause(&self) -> &DriverError {
        &self.cause
    }

    /// Consume the failure, keeping only the underlying cause.
    pub fn into_cause(self) -> DriverError {
        self.cause
    }
}
