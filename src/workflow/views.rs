//! Display rows for the listing pages.
//!
//! Each builder fetches the papers it needs, resolves every referenced user
//! in one lookup and then assembles the rows without further store calls.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{Paper, PaperReviewer, Role, Store, StoreError, StoreResult, User};

use super::authors::display_authors;
use super::scoring::{score_to_stars, total_score};

#[derive(Debug, Serialize)]
pub struct PaperListing {
    pub id: i32,
    pub title: String,
    pub status: &'static str,
    pub status_code: i16,
    pub authors: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewerScore {
    pub reviewer_id: i32,
    pub name: String,
    pub score: Option<i32>,
    pub stars: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct PaperOverview {
    pub id: i32,
    pub title: String,
    pub abstract_text: String,
    pub media_ref: Option<String>,
    pub media_type: Option<String>,
    pub status: &'static str,
    pub status_code: i16,
    pub authors: String,
    pub reviewers: Vec<ReviewerScore>,
    pub reviewer_names: String,
    pub total_score: i32,
    pub scored: usize,
}

#[derive(Debug, Serialize)]
pub struct AssignedPaper {
    pub id: i32,
    pub title: String,
    pub abstract_text: String,
    pub status: &'static str,
    pub authors: String,
    pub score: Option<i32>,
    pub stars: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentOption {
    pub id: i32,
    pub name: String,
    pub assigned: bool,
}

#[derive(Debug, Serialize)]
pub struct ReviewerCandidate {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub is_admin: bool,
    pub is_reviewer: bool,
}

async fn directory(store: &dyn Store, mut ids: Vec<i32>) -> StoreResult<HashMap<i32, User>> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(store
        .users_by_ids(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

fn overview(
    paper: Paper,
    assignments: Vec<PaperReviewer>,
    users: &HashMap<i32, User>,
    viewer: i32,
) -> StoreResult<PaperOverview> {
    let reviewers = assignments
        .iter()
        .map(|a| {
            let reviewer = users
                .get(&a.reviewer_id)
                .ok_or_else(|| StoreError::missing("user", a.reviewer_id))?;
            Ok(ReviewerScore {
                reviewer_id: a.reviewer_id,
                name: reviewer.display_name(),
                score: a.score,
                stars: a.score.map(score_to_stars),
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    let reviewer_names = reviewers
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(PaperOverview {
        id: paper.id,
        authors: display_authors(&paper.authors, users, Some(viewer))?,
        title: paper.title,
        abstract_text: paper.abstract_text,
        media_ref: paper.media_ref,
        media_type: paper.media_type,
        status: paper.status.label(),
        status_code: paper.status.code(),
        total_score: total_score(assignments.iter().map(|a| a.score)),
        scored: assignments.iter().filter(|a| a.score.is_some()).count(),
        reviewers,
        reviewer_names,
    })
}

/// Papers the viewer submitted or co-authored.
pub async fn member_papers(store: &dyn Store, viewer: &User) -> StoreResult<Vec<PaperListing>> {
    let papers = store.papers_for_member(viewer.id).await?;
    let ids: Vec<i32> = papers.iter().flat_map(|p| p.authors.iter().copied()).collect();
    let users = directory(store, ids).await?;

    papers
        .into_iter()
        .map(|paper| {
            Ok(PaperListing {
                id: paper.id,
                authors: display_authors(&paper.authors, &users, Some(viewer.id))?,
                title: paper.title,
                status: paper.status.label(),
                status_code: paper.status.code(),
            })
        })
        .collect()
}

/// Every paper with its reviewers and summed score, in paper-id order.
pub async fn conference_papers(
    store: &dyn Store,
    viewer: &User,
) -> StoreResult<Vec<PaperOverview>> {
    let papers = store.list_papers().await?;
    let mut assignments = Vec::with_capacity(papers.len());
    for paper in &papers {
        assignments.push(store.reviewers_for_paper(paper.id).await?);
    }

    let ids: Vec<i32> = papers
        .iter()
        .flat_map(|p| p.authors.iter().copied())
        .chain(assignments.iter().flatten().map(|a| a.reviewer_id))
        .collect();
    let users = directory(store, ids).await?;

    papers
        .into_iter()
        .zip(assignments)
        .map(|(paper, assigned)| overview(paper, assigned, &users, viewer.id))
        .collect()
}

pub async fn paper_detail(
    store: &dyn Store,
    paper_id: i32,
    viewer: &User,
) -> StoreResult<PaperOverview> {
    let paper = store
        .find_paper(paper_id)
        .await?
        .ok_or_else(|| StoreError::missing("paper", paper_id))?;
    let assignments = store.reviewers_for_paper(paper_id).await?;

    let ids: Vec<i32> = paper
        .authors
        .iter()
        .copied()
        .chain(assignments.iter().map(|a| a.reviewer_id))
        .collect();
    let users = directory(store, ids).await?;

    overview(paper, assignments, &users, viewer.id)
}

/// Papers ranked by total score, highest first. Equal totals keep paper-id
/// order.
pub async fn score_overview(store: &dyn Store, viewer: &User) -> StoreResult<Vec<PaperOverview>> {
    let mut papers = conference_papers(store, viewer).await?;
    papers.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    Ok(papers)
}

/// The reviewer's own assignments with the stars they gave so far.
pub async fn reviewer_papers(
    store: &dyn Store,
    reviewer: &User,
) -> StoreResult<Vec<AssignedPaper>> {
    let assigned = store.papers_for_reviewer(reviewer.id).await?;
    let ids: Vec<i32> = assigned
        .iter()
        .flat_map(|(p, _)| p.authors.iter().copied())
        .collect();
    let users = directory(store, ids).await?;

    assigned
        .into_iter()
        .map(|(paper, assignment)| {
            Ok(AssignedPaper {
                id: paper.id,
                authors: display_authors(&paper.authors, &users, Some(reviewer.id))?,
                title: paper.title,
                abstract_text: paper.abstract_text,
                status: paper.status.label(),
                score: assignment.score,
                stars: assignment.score.map(score_to_stars),
            })
        })
        .collect()
}

pub async fn reviewer_candidates(store: &dyn Store) -> StoreResult<Vec<ReviewerCandidate>> {
    Ok(store
        .list_users()
        .await?
        .into_iter()
        .map(|u| ReviewerCandidate {
            id: u.id,
            name: u.display_name(),
            is_admin: u.has_role(Role::Admin),
            is_reviewer: u.has_role(Role::Reviewer),
            email: u.email,
            active: u.active,
        })
        .collect())
}

/// Reviewers that can be put on or taken off a paper, in directory order.
pub async fn assignment_options(
    store: &dyn Store,
    paper_id: i32,
) -> StoreResult<Vec<AssignmentOption>> {
    let assigned: Vec<i32> = store
        .reviewers_for_paper(paper_id)
        .await?
        .into_iter()
        .map(|a| a.reviewer_id)
        .collect();

    Ok(store
        .list_users()
        .await?
        .into_iter()
        .filter(|u| u.has_role(Role::Reviewer))
        .map(|u| AssignmentOption {
            id: u.id,
            name: u.display_name(),
            assigned: assigned.contains(&u.id),
        })
        .collect())
}
