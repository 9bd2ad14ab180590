//! Parallel validation of many contracts
//!
//! Each input is validated independently on a scoped worker thread. Results
//! are merged by concatenation and re-sorted by contract identifier (input
//! index breaks ties), so the output never depends on completion order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use serde::Serialize;

use crate::error::ParseError;
use crate::report::{validate, OverallStatus, ValidationReport};
use crate::verifier::ValidateOptions;

/// One contract to validate: a display name (usually a path) and its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub name: String,
    pub text: String,
}

impl BatchInput {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        BatchInput {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchOutcome {
    Report(ValidationReport),
    Error { error: ParseError, message: String },
}

/// Result for one input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    /// Position in the input slice
    pub index: usize,
    pub name: String,
    pub outcome: BatchOutcome,
}

impl BatchEntry {
    /// Identifier used for ordering; the input name when none is declared
    pub fn sort_key(&self) -> &str {
        match self.outcome {
            BatchOutcome::Report(ref report) => report.identifier.as_deref().unwrap_or(&self.name),
            BatchOutcome::Error { .. } => &self.name,
        }
    }

    pub fn is_invalid(&self) -> bool {
        match self.outcome {
            BatchOutcome::Report(ref report) => report.overall_status == OverallStatus::Invalid,
            BatchOutcome::Error { .. } => true,
        }
    }
}

/// Validate every input, using at most `available_parallelism` threads
pub fn validate_batch(inputs: &[BatchInput], options: &ValidateOptions) -> Vec<BatchEntry> {
    let workers = thread::available_parallelism()
        .map_or(1, |n| n.get())
        .min(inputs.len());
    tracing::debug!(inputs = inputs.len(), workers, "validating batch");

    let mut entries = if workers <= 1 {
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| validate_one(index, input, options))
            .collect()
    } else {
        run_parallel(inputs, options, workers)
    };

    entries.sort_by(|a, b| a.sort_key().cmp(b.sort_key()).then(a.index.cmp(&b.index)));
    entries
}

fn run_parallel(inputs: &[BatchInput], options: &ValidateOptions, workers: usize) -> Vec<BatchEntry> {
    let next_index = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<BatchEntry>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next_index = &next_index;
            scope.spawn(move || loop {
                let index = next_index.fetch_add(1, Ordering::Relaxed);
                let Some(input) = inputs.get(index) else {
                    break;
                };
                if tx.send(validate_one(index, input, options)).is_err() {
                    break;
                }
            });
        }
        drop(tx);
        rx.into_iter().collect()
    })
}

fn validate_one(index: usize, input: &BatchInput, options: &ValidateOptions) -> BatchEntry {
    let outcome = match validate(&input.text, options) {
        Ok(report) => BatchOutcome::Report(report),
        Err(error) => BatchOutcome::Error {
            message: error.to_string(),
            error,
        },
    };
    BatchEntry {
        index,
        name: input.name.clone(),
        outcome,
    }
}
