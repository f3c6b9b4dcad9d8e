use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::NewPaper;

/// Author positions are stored as `SMALLINT`.
pub const MAX_AUTHORS: usize = i16::MAX as usize + 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("a paper needs at least one author")]
    NoAuthors,
    #[error("author {0} is listed more than once")]
    DuplicateAuthor(i32),
    #[error("a paper lists at most {} authors", MAX_AUTHORS)]
    TooManyAuthors,
    #[error("title must not be empty")]
    EmptyTitle,
}

/// The JSON document carried in the `data` query parameter of a submission.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaperSubmission {
    pub authors: Vec<i32>,
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
}

impl PaperSubmission {
    /// Checks the shape of the submission. Whether the authors exist is
    /// decided by the store inside the insert transaction.
    pub fn into_new_paper(self, submitted_by: i32) -> Result<NewPaper, SubmissionError> {
        if self.authors.is_empty() {
            return Err(SubmissionError::NoAuthors);
        }
        if self.authors.len() > MAX_AUTHORS {
            return Err(SubmissionError::TooManyAuthors);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.authors.iter().find(|id| !seen.insert(**id)) {
            return Err(SubmissionError::DuplicateAuthor(*dup));
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(SubmissionError::EmptyTitle);
        }

        Ok(NewPaper {
            authors: self.authors,
            title: title.to_string(),
            abstract_text: self.abstract_text.trim().to_string(),
            submitted_by,
        })
    }
}
