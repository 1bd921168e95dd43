use crate::error::DriverError;

/// Outcome of one queued step relative to the step that failed the drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Ran to completion before the failing step.
    Completed,
    /// The step that aborted the drain.
    Failed,
    /// Never attempted because an earlier step failed.
    Skipped,
}

impl StepStatus {
    /// Derive a status purely from position comparison.
    ///
    /// Both positions are one-based within the same drained snapshot.
    pub fn classify(position: usize, failed_position: usize) -> Self {
        if position < failed_position {
            StepStatus::Completed
        } else if position == failed_position {
            StepStatus::Failed
        } else {
            StepStatus::Skipped
        }
    }

    fn marker(self) -> &'static str {
        match self {
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "-",
        }
    }
}

/// Render the human-readable report for a failed drain.
///
/// Lists the failed step's one-based position out of the snapshot total, a
/// one-line cause, then every step in original order with a status marker.
/// The failed line alone gets a leading arrow so it stands out in a long
/// chain.
pub(crate) fn render_trace(
    descriptors: &[String],
    failed_position: usize,
    cause: &DriverError,
) -> String {
    let total = descriptors.len();
    let mut out = format!(
        "step {failed_position} of {total} failed: {}\n",
        descriptors[failed_position - 1]
    );
    out.push_str(&format!("caused by: {cause}\n\n"));

    for (i, descriptor) in descriptors.iter().enumerate() {
        let position = i + 1;
        let status = StepStatus::classify(position, failed_position);
        let arrow = if status == StepStatus::Failed { "→" } else { " " };
        out.push_str(&format!(
            "{arrow} {} {position:>2}. {descriptor}\n",
            status.marker()
        ));
    }
    out
}
