use async_trait::async_trait;
use thiserror::Error;

use crate::workflow::PaperStatus;

use super::{NewPaper, NewUser, Paper, PaperReviewer, Role, User};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn missing(entity: &str, id: i32) -> Self {
        StoreError::NotFound(format!("{} {}", entity, id))
    }
}

/// Persistence for users, papers and review assignments.
///
/// Each mutating call is one unit of work: it either applies completely or
/// leaves the store untouched.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, id: i32) -> StoreResult<Option<User>>;

    async fn users_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<User>>;

    /// All users ordered by last name, first name, id.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn count_users(&self) -> StoreResult<i64>;

    async fn create_user(&self, user: NewUser, roles: &[Role]) -> StoreResult<User>;

    async fn set_user_active(&self, id: i32, active: bool) -> StoreResult<()>;

    /// Grants or revokes `role`. Repeating the call is a no-op. The admin
    /// role is never revoked; revoking reviewer also drops the user's paper
    /// assignments.
    async fn set_role(&self, user_id: i32, role: Role, present: bool) -> StoreResult<()>;

    /// Flips `role` for the user and returns whether it is now held.
    async fn toggle_role(&self, user_id: i32, role: Role) -> StoreResult<bool>;

    /// Inserts a paper with status Submitted. Every author must exist.
    async fn create_paper(&self, paper: NewPaper) -> StoreResult<Paper>;

    async fn find_paper(&self, id: i32) -> StoreResult<Option<Paper>>;

    /// All papers in id order.
    async fn list_papers(&self) -> StoreResult<Vec<Paper>>;

    /// Papers the user submitted or co-authored, in id order.
    async fn papers_for_member(&self, user_id: i32) -> StoreResult<Vec<Paper>>;

    /// The reviewer's assignments, in assignment order, with their papers.
    async fn papers_for_reviewer(&self, reviewer_id: i32)
        -> StoreResult<Vec<(Paper, PaperReviewer)>>;

    async fn set_paper_status(&self, id: i32, status: PaperStatus) -> StoreResult<()>;

    /// Points the paper at new media and returns the reference it replaced.
    async fn set_paper_media(
        &self,
        id: i32,
        media_ref: &str,
        media_type: &str,
    ) -> StoreResult<Option<String>>;

    /// Assignments of a paper in assignment order.
    async fn reviewers_for_paper(&self, paper_id: i32) -> StoreResult<Vec<PaperReviewer>>;

    /// Creates or removes the (paper, reviewer) assignment. Creating one
    /// requires the user to hold the reviewer role.
    async fn set_assignment(&self, paper_id: i32, reviewer_id: i32, assigned: bool)
        -> StoreResult<()>;

    /// Overwrites the score of an existing assignment and moves a Submitted
    /// paper to Under Review.
    async fn record_score(&self, paper_id: i32, reviewer_id: i32, score: i32)
        -> StoreResult<()>;
}
