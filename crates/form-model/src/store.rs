use std::cell::RefCell;
use std::io::BufRead;

use serde_json::Value;
use thiserror::Error;

use crate::catalog::FormDefinition;
use crate::submission::{Submission, SubmissionError};

/// Per-record failures reported by a submission source.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {index} is unreadable: {source}")]
    Decode {
        index: usize,
        #[source]
        source: SubmissionError,
    },
    #[error("record {index} is not valid JSON: {source}")]
    Json {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {index} is not valid UTF-8: {source}")]
    Encoding {
        index: usize,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("failed to read submissions: {0}")]
    Io(#[from] std::io::Error),
    #[error("submission source was already consumed")]
    Exhausted,
}

/// Ordered supplier of top-level records.
///
/// Each item is fetched and decoded on demand, so a storage failure affects a
/// single record and the caller decides whether to continue.
pub trait SubmissionSource {
    fn submissions<'a>(
        &'a self,
        form: &'a FormDefinition,
    ) -> Box<dyn Iterator<Item = Result<Submission, StoreError>> + 'a>;
}

/// Records held in memory, either decoded already or as raw JSON documents.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubmissions {
    records: Vec<Record>,
}

#[derive(Debug, Clone)]
enum Record {
    Decoded(Submission),
    Raw(Value),
}

impl InMemorySubmissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, submission: Submission) {
        self.records.push(Record::Decoded(submission));
    }

    pub fn push_json(&mut self, document: Value) {
        self.records.push(Record::Raw(document));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Submission> for InMemorySubmissions {
    fn from_iter<T: IntoIterator<Item = Submission>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().map(Record::Decoded).collect(),
        }
    }
}

impl SubmissionSource for InMemorySubmissions {
    fn submissions<'a>(
        &'a self,
        form: &'a FormDefinition,
    ) -> Box<dyn Iterator<Item = Result<Submission, StoreError>> + 'a> {
        Box::new(
            self.records
                .iter()
                .enumerate()
                .map(move |(index, record)| match record {
                    Record::Decoded(submission) => Ok(submission.clone()),
                    Record::Raw(document) => Submission::from_json(form, document)
                        .map_err(|source| StoreError::Decode { index, source }),
                }),
        )
    }
}

/// Newline-delimited JSON records read lazily from any buffered reader.
///
/// Blank lines are ignored. A line that is not UTF-8 is reported as a bad
/// record and reading continues with the next line. The reader can be
/// consumed once.
pub struct NdjsonSubmissions<R> {
    reader: RefCell<Option<R>>,
}

impl<R: BufRead> NdjsonSubmissions<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: RefCell::new(Some(reader)),
        }
    }
}

impl<R: BufRead> SubmissionSource for NdjsonSubmissions<R> {
    fn submissions<'a>(
        &'a self,
        form: &'a FormDefinition,
    ) -> Box<dyn Iterator<Item = Result<Submission, StoreError>> + 'a> {
        let Some(reader) = self.reader.borrow_mut().take() else {
            return Box::new(std::iter::once(Err(StoreError::Exhausted)));
        };

        Box::new(
            reader
                .split(b'\n')
                .filter(|line| !matches!(line, Ok(bytes) if bytes.trim_ascii().is_empty()))
                .enumerate()
                .map(move |(index, line)| {
                    let line = String::from_utf8(line?)
                        .map_err(|source| StoreError::Encoding { index, source })?;
                    let document: Value = serde_json::from_str(&line)
                        .map_err(|source| StoreError::Json { index, source })?;
                    Submission::from_json(form, &document)
                        .map_err(|source| StoreError::Decode { index, source })
                }),
        )
    }
}
