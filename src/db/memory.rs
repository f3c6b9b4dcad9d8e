//! In-process `Store` used by the handler and workflow tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::workflow::PaperStatus;

use super::{
    NewPaper, NewUser, Paper, PaperReviewer, Role, Store, StoreError, StoreResult, User,
};

#[derive(Default)]
struct Inner {
    users: BTreeMap<i32, User>,
    papers: BTreeMap<i32, Paper>,
    assignments: Vec<PaperReviewer>,
    next_user_id: i32,
    next_paper_id: i32,
    next_assignment_id: i32,
}

impl Inner {
    fn user_mut(&mut self, id: i32) -> StoreResult<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| StoreError::missing("user", id))
    }

    fn apply_role(&mut self, user_id: i32, role: Role, present: bool) -> StoreResult<()> {
        let user = self.user_mut(user_id)?;
        let mut roles: BTreeSet<Role> = user.roles.iter().copied().collect();
        if present {
            roles.insert(role);
        } else if roles.contains(&role) {
            if role == Role::Admin {
                return Err(StoreError::Conflict("the admin role cannot be revoked".into()));
            }
            roles.remove(&role);
        }
        user.roles = roles.into_iter().collect();

        if !present && role == Role::Reviewer {
            self.assignments.retain(|a| a.reviewer_id != user_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("mutex poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn users_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<User>> {
        let inner = self.lock();
        Ok(inner
            .users
            .values()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.lock().users.values().cloned().collect();
        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(users)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.lock().users.len() as i64)
    }

    async fn create_user(&self, user: NewUser, roles: &[Role]) -> StoreResult<User> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} is taken", user.email)));
        }
        inner.next_user_id += 1;
        let mut roles = roles.to_vec();
        roles.sort();
        roles.dedup();
        let created = User {
            id: inner.next_user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            active: user.active,
            roles,
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_user_active(&self, id: i32, active: bool) -> StoreResult<()> {
        self.lock().user_mut(id)?.active = active;
        Ok(())
    }

    async fn set_role(&self, user_id: i32, role: Role, present: bool) -> StoreResult<()> {
        self.lock().apply_role(user_id, role, present)
    }

    async fn toggle_role(&self, user_id: i32, role: Role) -> StoreResult<bool> {
        let mut inner = self.lock();
        let present = !inner.user_mut(user_id)?.has_role(role);
        inner.apply_role(user_id, role, present)?;
        Ok(present)
    }

    async fn create_paper(&self, paper: NewPaper) -> StoreResult<Paper> {
        let mut inner = self.lock();
        if let Some(missing) = paper.authors.iter().find(|id| !inner.users.contains_key(*id)) {
            return Err(StoreError::missing("user", *missing));
        }
        inner.next_paper_id += 1;
        let created = Paper {
            id: inner.next_paper_id,
            authors: paper.authors,
            title: paper.title,
            abstract_text: paper.abstract_text,
            media_ref: None,
            media_type: None,
            status: PaperStatus::Submitted,
            submitted_by: paper.submitted_by,
            created_at: Utc::now(),
        };
        inner.papers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_paper(&self, id: i32) -> StoreResult<Option<Paper>> {
        Ok(self.lock().papers.get(&id).cloned())
    }

    async fn list_papers(&self) -> StoreResult<Vec<Paper>> {
        Ok(self.lock().papers.values().cloned().collect())
    }

    async fn papers_for_member(&self, user_id: i32) -> StoreResult<Vec<Paper>> {
        Ok(self
            .lock()
            .papers
            .values()
            .filter(|p| p.involves(user_id))
            .cloned()
            .collect())
    }

    async fn papers_for_reviewer(
        &self,
        reviewer_id: i32,
    ) -> StoreResult<Vec<(Paper, PaperReviewer)>> {
        let inner = self.lock();
        inner
            .assignments
            .iter()
            .filter(|a| a.reviewer_id == reviewer_id)
            .map(|a| {
                inner
                    .papers
                    .get(&a.paper_id)
                    .map(|p| (p.clone(), a.clone()))
                    .ok_or_else(|| StoreError::missing("paper", a.paper_id))
            })
            .collect()
    }

    async fn set_paper_status(&self, id: i32, status: PaperStatus) -> StoreResult<()> {
        let mut inner = self.lock();
        let paper = inner
            .papers
            .get_mut(&id)
            .ok_or_else(|| StoreError::missing("paper", id))?;
        paper.status = status;
        Ok(())
    }

    async fn set_paper_media(
        &self,
        id: i32,
        media_ref: &str,
        media_type: &str,
    ) -> StoreResult<Option<String>> {
        let mut inner = self.lock();
        let paper = inner
            .papers
            .get_mut(&id)
            .ok_or_else(|| StoreError::missing("paper", id))?;
        paper.media_type = Some(media_type.to_string());
        Ok(paper.media_ref.replace(media_ref.to_string()))
    }

    async fn reviewers_for_paper(&self, paper_id: i32) -> StoreResult<Vec<PaperReviewer>> {
        Ok(self
            .lock()
            .assignments
            .iter()
            .filter(|a| a.paper_id == paper_id)
            .cloned()
            .collect())
    }

    async fn set_assignment(
        &self,
        paper_id: i32,
        reviewer_id: i32,
        assigned: bool,
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        if !inner.papers.contains_key(&paper_id) {
            return Err(StoreError::missing("paper", paper_id));
        }
        let exists = inner
            .assignments
            .iter()
            .any(|a| a.paper_id == paper_id && a.reviewer_id == reviewer_id);

        if !assigned {
            inner
                .assignments
                .retain(|a| !(a.paper_id == paper_id && a.reviewer_id == reviewer_id));
            return Ok(());
        }

        if !inner.user_mut(reviewer_id)?.has_role(Role::Reviewer) {
            return Err(StoreError::Conflict(format!(
                "user {} does not hold the reviewer role",
                reviewer_id
            )));
        }
        if !exists {
            inner.next_assignment_id += 1;
            let id = inner.next_assignment_id;
            inner.assignments.push(PaperReviewer {
                id,
                paper_id,
                reviewer_id,
                score: None,
            });
        }
        Ok(())
    }

    async fn record_score(&self, paper_id: i32, reviewer_id: i32, score: i32) -> StoreResult<()> {
        let mut inner = self.lock();
        let assignment = inner
            .assignments
            .iter_mut()
            .find(|a| a.paper_id == paper_id && a.reviewer_id == reviewer_id)
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "assignment of reviewer {} to paper {}",
                    reviewer_id, paper_id
                ))
            })?;
        assignment.score = Some(score);

        if let Some(paper) = inner.papers.get_mut(&paper_id) {
            if paper.status == PaperStatus::Submitted {
                paper.status = PaperStatus::UnderReview;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::contract;

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        contract::duplicate_email_conflicts(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn author_order_survives_storage() {
        contract::author_order_survives_storage(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn unknown_author_is_rejected() {
        contract::unknown_author_is_rejected(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn first_score_starts_review() {
        contract::first_score_starts_review(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn scoring_keeps_decided_status() {
        contract::scoring_keeps_decided_status(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn scoring_requires_assignment() {
        contract::scoring_requires_assignment(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn assignment_requires_reviewer_role() {
        contract::assignment_requires_reviewer_role(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn replacing_media_returns_previous_ref() {
        contract::replacing_media_returns_previous_ref(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn revoking_reviewer_drops_assignments() {
        contract::revoking_reviewer_drops_assignments(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn admin_role_is_never_revoked() {
        contract::admin_role_is_never_revoked(&MemoryStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_serialize() {
        contract::concurrent_toggles_serialize(Arc::new(MemoryStore::new())).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_assign_and_revoke_leave_no_stray_assignment() {
        contract::concurrent_assign_and_revoke_leave_no_stray_assignment(Arc::new(
            MemoryStore::new(),
        ))
        .await;
    }
}
