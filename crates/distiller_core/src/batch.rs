use std::fmt::Display;

use serde::Serialize;

/// What a failed item does to the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// The first failure aborts the batch.
    #[default]
    StopOnFailure,
    /// Failures are recorded in place and the batch moves on.
    ContinueOnFailure,
}

impl BatchMode {
    pub fn from_continue_flag(continue_on_fail: bool) -> Self {
        if continue_on_fail {
            BatchMode::ContinueOnFailure
        } else {
            BatchMode::StopOnFailure
        }
    }
}

/// Output slot of one input item: the success record itself, or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ItemOutput<T> {
    Success(T),
    Failure { error: String },
}

/// Outputs accumulated so far, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<T> {
    outputs: Vec<ItemOutput<T>>,
    failed: usize,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            failed: 0,
        }
    }
}

impl<T> BatchReport<T> {
    pub fn outputs(&self) -> &[ItemOutput<T>] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<ItemOutput<T>> {
        self.outputs
    }

    pub fn succeeded(&self) -> usize {
        self.outputs.len() - self.failed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }
}

/// Result of folding one item into a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Continue(BatchReport<T>),
    /// Stop-on-failure mode hit an error; `report` holds the items before it.
    Abort {
        report: BatchReport<T>,
        index: usize,
        error: String,
    },
}

/// Pure fold step: applies the outcome of item `index` to `report`.
pub fn record<T, E: Display>(
    mut report: BatchReport<T>,
    mode: BatchMode,
    index: usize,
    result: Result<T, E>,
) -> Step<T> {
    match result {
        Ok(output) => {
            report.outputs.push(ItemOutput::Success(output));
            Step::Continue(report)
        }
        Err(err) => match mode {
            BatchMode::StopOnFailure => Step::Abort {
                report,
                index,
                error: err.to_string(),
            },
            BatchMode::ContinueOnFailure => {
                report.outputs.push(ItemOutput::Failure {
                    error: err.to_string(),
                });
                report.failed += 1;
                Step::Continue(report)
            }
        },
    }
}
