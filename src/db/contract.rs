//! Behaviour every `Store` must share. Each check builds its own users with
//! fresh emails so it can run against a database that already holds data.

use std::sync::Arc;

use uuid::Uuid;

use crate::workflow::PaperStatus;

use super::{NewPaper, NewUser, Paper, Role, Store, StoreError, User};

fn new_user(name: &str) -> NewUser {
    NewUser {
        email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4().simple()),
        first_name: name.to_string(),
        last_name: "Contract".to_string(),
        active: true,
    }
}

async fn member(store: &dyn Store, name: &str, roles: &[Role]) -> User {
    store.create_user(new_user(name), roles).await.unwrap()
}

async fn paper_by(store: &dyn Store, authors: Vec<i32>) -> Paper {
    let submitted_by = *authors.last().unwrap();
    store
        .create_paper(NewPaper {
            authors,
            title: "Contract paper".into(),
            abstract_text: String::new(),
            submitted_by,
        })
        .await
        .unwrap()
}

pub async fn duplicate_email_conflicts(store: &dyn Store) {
    let user = new_user("Twin");
    store.create_user(user.clone(), &[]).await.unwrap();

    let err = store.create_user(user, &[]).await.unwrap_err();

    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
}

pub async fn author_order_survives_storage(store: &dyn Store) {
    let first = member(store, "First", &[]).await;
    let second = member(store, "Second", &[]).await;
    let third = member(store, "Third", &[]).await;
    let authors = vec![third.id, first.id, second.id];

    let created = paper_by(store, authors.clone()).await;

    assert_eq!(created.authors, authors);
    let found = store.find_paper(created.id).await.unwrap().unwrap();
    assert_eq!(found.authors, authors);
    let listed = store.papers_for_member(first.id).await.unwrap();
    let listed = listed.iter().find(|p| p.id == created.id).unwrap();
    assert_eq!(listed.authors, authors);
}

pub async fn unknown_author_is_rejected(store: &dyn Store) {
    let author = member(store, "Author", &[]).await;

    let err = store
        .create_paper(NewPaper {
            authors: vec![author.id, i32::MAX],
            title: "Ghost".into(),
            abstract_text: String::new(),
            submitted_by: author.id,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

pub async fn first_score_starts_review(store: &dyn Store) {
    let author = member(store, "Author", &[]).await;
    let reviewer = member(store, "Reviewer", &[Role::Reviewer]).await;
    let paper = paper_by(store, vec![author.id]).await;
    store.set_assignment(paper.id, reviewer.id, true).await.unwrap();

    store.record_score(paper.id, reviewer.id, 2).await.unwrap();

    let found = store.find_paper(paper.id).await.unwrap().unwrap();
    assert_eq!(found.status, PaperStatus::UnderReview);
    let assigned = store.reviewers_for_paper(paper.id).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].score, Some(2));
}

pub async fn scoring_keeps_decided_status(store: &dyn Store) {
    let author = member(store, "Author", &[]).await;
    let reviewer = member(store, "Reviewer", &[Role::Reviewer]).await;
    let paper = paper_by(store, vec![author.id]).await;
    store.set_assignment(paper.id, reviewer.id, true).await.unwrap();
    store.set_paper_status(paper.id, PaperStatus::Accepted).await.unwrap();

    store.record_score(paper.id, reviewer.id, -2).await.unwrap();

    let found = store.find_paper(paper.id).await.unwrap().unwrap();
    assert_eq!(found.status, PaperStatus::Accepted);
}

pub async fn scoring_requires_assignment(store: &dyn Store) {
    let author = member(store, "Author", &[]).await;
    let reviewer = member(store, "Reviewer", &[Role::Reviewer]).await;
    let paper = paper_by(store, vec![author.id]).await;

    let err = store.record_score(paper.id, reviewer.id, 1).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
    let found = store.find_paper(paper.id).await.unwrap().unwrap();
    assert_eq!(found.status, PaperStatus::Submitted);
}

pub async fn assignment_requires_reviewer_role(store: &dyn Store) {
    let author = member(store, "Author", &[]).await;
    let outsider = member(store, "Outsider", &[]).await;
    let paper = paper_by(store, vec![author.id]).await;

    let err = store
        .set_assignment(paper.id, outsider.id, true)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
    assert!(store.reviewers_for_paper(paper.id).await.unwrap().is_empty());
}

pub async fn replacing_media_returns_previous_ref(store: &dyn Store) {
    let author = member(store, "Author", &[]).await;
    let paper = paper_by(store, vec![author.id]).await;

    let first = store
        .set_paper_media(paper.id, "first.pdf", "application/pdf")
        .await
        .unwrap();
    let second = store
        .set_paper_media(paper.id, "second.png", "image/png")
        .await
        .unwrap();

    assert_eq!(first, None);
    assert_eq!(second.as_deref(), Some("first.pdf"));
    let found = store.find_paper(paper.id).await.unwrap().unwrap();
    assert_eq!(found.media_ref.as_deref(), Some("second.png"));
    assert_eq!(found.media_type.as_deref(), Some("image/png"));

    let err = store
        .set_paper_media(i32::MAX, "x.pdf", "application/pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

pub async fn revoking_reviewer_drops_assignments(store: &dyn Store) {
    let author = member(store, "Author", &[]).await;
    let reviewer = member(store, "Reviewer", &[Role::Reviewer]).await;
    let paper = paper_by(store, vec![author.id]).await;
    store.set_assignment(paper.id, reviewer.id, true).await.unwrap();
    store.set_assignment(paper.id, reviewer.id, true).await.unwrap();
    assert_eq!(store.reviewers_for_paper(paper.id).await.unwrap().len(), 1);

    store.set_role(reviewer.id, Role::Reviewer, false).await.unwrap();

    assert!(store.reviewers_for_paper(paper.id).await.unwrap().is_empty());
    assert!(store.papers_for_reviewer(reviewer.id).await.unwrap().is_empty());
    let reviewer = store.find_user(reviewer.id).await.unwrap().unwrap();
    assert!(!reviewer.has_role(Role::Reviewer));
}

pub async fn admin_role_is_never_revoked(store: &dyn Store) {
    let admin = member(store, "Admin", &[Role::Admin]).await;

    let err = store.set_role(admin.id, Role::Admin, false).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
    let err = store.toggle_role(admin.id, Role::Admin).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");

    let admin = store.find_user(admin.id).await.unwrap().unwrap();
    assert!(admin.has_role(Role::Admin));
}

pub async fn concurrent_toggles_serialize(store: Arc<dyn Store>) {
    let user_id = member(store.as_ref(), "Toggled", &[]).await.id;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.toggle_role(user_id, Role::Reviewer).await })
        })
        .collect();
    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            granted += 1;
        }
    }

    assert_eq!(granted, 5);
    let user = store.find_user(user_id).await.unwrap().unwrap();
    assert!(!user.has_role(Role::Reviewer));
}

pub async fn concurrent_assign_and_revoke_leave_no_stray_assignment(store: Arc<dyn Store>) {
    let author = member(store.as_ref(), "Author", &[]).await;
    let reviewer_id = member(store.as_ref(), "Reviewer", &[Role::Reviewer]).await.id;
    let paper_id = paper_by(store.as_ref(), vec![author.id]).await.id;

    let assign = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.set_assignment(paper_id, reviewer_id, true).await })
    };
    let revoke = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.set_role(reviewer_id, Role::Reviewer, false).await })
    };
    let assigned = assign.await.unwrap();
    revoke.await.unwrap().unwrap();

    // Whichever runs first, no assignment outlives the role.
    if let Err(err) = assigned {
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
    }
    assert!(store.reviewers_for_paper(paper_id).await.unwrap().is_empty());
}
