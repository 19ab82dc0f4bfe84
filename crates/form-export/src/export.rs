use clap::ValueEnum;
use form_model::{FormDefinition, SubmissionSource};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ExportError;
use crate::format::SubmissionFormatter;

/// What to do when a single record cannot be read or rendered.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the export and return the error.
    #[default]
    Abort,
    /// Log the failure, leave the record out and continue.
    #[serde(rename = "skip")]
    #[value(name = "skip")]
    SkipRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportSummary {
    pub records: usize,
    pub placemarks: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Feeds records from a source through a formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportDriver {
    policy: FailurePolicy,
}

impl ExportDriver {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// Export every record of `source` in order.
    ///
    /// Record errors follow the failure policy. Anything else aborts, leaving
    /// the output written so far in place.
    pub fn run<F, S>(
        &self,
        formatter: &mut F,
        source: &S,
        form: &FormDefinition,
    ) -> Result<ExportSummary, ExportError>
    where
        F: SubmissionFormatter + ?Sized,
        S: SubmissionSource + ?Sized,
    {
        let mut summary = ExportSummary::default();
        formatter.begin()?;

        for (index, record) in source.submissions(form).enumerate() {
            let outcome = record
                .map_err(ExportError::from)
                .and_then(|submission| formatter.format_submission(&submission));
            match outcome {
                Ok(placemarks) => {
                    summary.records += 1;
                    summary.placemarks += placemarks;
                }
                Err(err) if err.is_record_error() && self.policy == FailurePolicy::SkipRecord => {
                    warn!(record = index, error = %err, "skipping record");
                    summary.skipped.push(SkippedRecord {
                        index,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        formatter.finish()?;
        info!(
            form = form.form_id(),
            records = summary.records,
            placemarks = summary.placemarks,
            skipped = summary.skipped.len(),
            "export finished"
        );
        Ok(summary)
    }
}
