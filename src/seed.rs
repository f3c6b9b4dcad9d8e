//! Demo data for a fresh database: an admin, three reviewers, three members
//! and a paper for each member.

use tracing::info;

use crate::db::{NewPaper, NewUser, Role, Store, StoreResult};

const USERS: &[(&str, &str, Option<Role>)] = &[
    ("Admin", "admin@example.com", Some(Role::Admin)),
    ("Reviewer1", "reviewer1@example.com", Some(Role::Reviewer)),
    ("Reviewer2", "reviewer2@example.com", Some(Role::Reviewer)),
    ("Reviewer3", "reviewer3@example.com", Some(Role::Reviewer)),
    ("Member1", "member1@example.com", None),
    ("Member2", "member2@example.com", None),
    ("Member3", "member3@example.com", None),
];

/// Papers by position in `USERS` (1-based, matching a fresh id sequence).
const PAPERS: &[(&[usize], &str, &str)] = &[
    (&[5], "Title 5", "Abstract 5"),
    (&[4, 6], "Title 6", "Abstract 6"),
    (&[7], "Title 7", "Abstract 7"),
];

/// Inserts the demo users and papers unless the store already has users.
/// Returns whether anything was written.
pub async fn seed_demo_data(store: &dyn Store) -> StoreResult<bool> {
    if store.count_users().await? > 0 {
        info!("Users present, skipping demo data");
        return Ok(false);
    }

    let mut ids = Vec::with_capacity(USERS.len());
    for (first_name, email, role) in USERS {
        let roles: Vec<Role> = role.iter().copied().collect();
        let user = store
            .create_user(
                NewUser {
                    email: email.to_string(),
                    first_name: first_name.to_string(),
                    last_name: "Example".to_string(),
                    active: true,
                },
                &roles,
            )
            .await?;
        ids.push(user.id);
    }

    for (authors, title, abstract_text) in PAPERS {
        let authors: Vec<i32> = authors.iter().map(|pos| ids[pos - 1]).collect();
        let submitted_by = authors[authors.len() - 1];
        store
            .create_paper(NewPaper {
                authors,
                title: title.to_string(),
                abstract_text: abstract_text.to_string(),
                submitted_by,
            })
            .await?;
    }

    info!("Seeded {} users and {} papers", USERS.len(), PAPERS.len());
    Ok(true)
}
