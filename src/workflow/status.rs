use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid paper status {0}, expected 0..=3")]
pub struct InvalidStatus(pub i64);

/// Review state of a paper. The numeric codes are what the `papers.status`
/// column and the `action` query parameter carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
}

impl PaperStatus {
    pub const ALL: [PaperStatus; 4] = [
        PaperStatus::Submitted,
        PaperStatus::UnderReview,
        PaperStatus::Accepted,
        PaperStatus::Rejected,
    ];

    pub fn code(self) -> i16 {
        match self {
            PaperStatus::Submitted => 0,
            PaperStatus::UnderReview => 1,
            PaperStatus::Accepted => 2,
            PaperStatus::Rejected => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaperStatus::Submitted => "Submitted",
            PaperStatus::UnderReview => "Under Review",
            PaperStatus::Accepted => "Accepted",
            PaperStatus::Rejected => "Rejected",
        }
    }

    pub fn from_code(code: i64) -> Result<Self, InvalidStatus> {
        Self::ALL
            .into_iter()
            .find(|s| i64::from(s.code()) == code)
            .ok_or(InvalidStatus(code))
    }
}

impl TryFrom<i16> for PaperStatus {
    type Error = InvalidStatus;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        Self::from_code(i64::from(code))
    }
}
