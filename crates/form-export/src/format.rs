use form_model::Submission;

use crate::error::ExportError;

/// Streams a document for a sequence of records.
///
/// Output is append-only: `begin` once, `format_submission` per record in
/// input order, then `finish`.
pub trait SubmissionFormatter {
    fn begin(&mut self) -> Result<(), ExportError>;

    /// Write one record and return the number of output units it produced.
    fn format_submission(&mut self, submission: &Submission) -> Result<usize, ExportError>;

    fn finish(&mut self) -> Result<(), ExportError>;

    fn process_submissions(&mut self, submissions: &[Submission]) -> Result<usize, ExportError> {
        self.begin()?;
        let mut written = 0;
        for submission in submissions {
            written += self.format_submission(submission)?;
        }
        self.finish()?;
        Ok(written)
    }
}
