use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::workflow::PaperStatus;

use super::StoreError;

/// Roles the workflow checks for. Members have no role row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Reviewer,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reviewer => "reviewer",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Reviewer => "Reviewer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Role::Admin),
            "reviewer" => Some(Role::Reviewer),
            _ => None,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    pub roles: Vec<Role>,
}

impl User {
    pub fn from_row(row: UserRow, roles: Vec<Role>) -> Self {
        Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            active: row.active,
            roles,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Admins pass every role check.
    pub fn acts_as(&self, role: Role) -> bool {
        self.has_role(Role::Admin) || self.has_role(role)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
}

#[derive(Debug, FromRow)]
pub struct PaperRow {
    pub id: i32,
    pub title: String,
    pub abstract_text: String,
    pub media_ref: Option<String>,
    pub media_type: Option<String>,
    pub status: i16,
    pub submitted_by: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Paper {
    pub id: i32,
    /// Author user ids in submission order.
    pub authors: Vec<i32>,
    pub title: String,
    pub abstract_text: String,
    pub media_ref: Option<String>,
    pub media_type: Option<String>,
    pub status: PaperStatus,
    pub submitted_by: i32,
    pub created_at: DateTime<Utc>,
}

impl Paper {
    pub fn from_row(row: PaperRow, authors: Vec<i32>) -> Result<Self, StoreError> {
        let status = PaperStatus::try_from(row.status)
            .map_err(|e| StoreError::Corrupt(format!("paper {}: {}", row.id, e)))?;
        Ok(Self {
            id: row.id,
            authors,
            title: row.title,
            abstract_text: row.abstract_text,
            media_ref: row.media_ref,
            media_type: row.media_type,
            status,
            submitted_by: row.submitted_by,
            created_at: row.created_at,
        })
    }

    pub fn involves(&self, user_id: i32) -> bool {
        self.submitted_by == user_id || self.authors.contains(&user_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewPaper {
    pub authors: Vec<i32>,
    pub title: String,
    pub abstract_text: String,
    pub submitted_by: i32,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaperReviewer {
    pub id: i32,
    pub paper_id: i32,
    pub reviewer_id: i32,
    pub score: Option<i32>,
}
