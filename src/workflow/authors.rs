use std::collections::HashMap;

use crate::db::{StoreError, StoreResult, User};

/// Shown in place of the viewer's own name.
pub const VIEWER_LABEL: &str = "You";

/// Joins author names in submission order, rendering the viewer as "You".
///
/// Every id must resolve in `users`; a dangling author is reported as a
/// missing user instead of being dropped.
pub fn display_authors(
    author_ids: &[i32],
    users: &HashMap<i32, User>,
    viewer: Option<i32>,
) -> StoreResult<String> {
    let names = author_ids
        .iter()
        .map(|id| {
            if Some(*id) == viewer {
                return Ok(VIEWER_LABEL.to_string());
            }
            users
                .get(id)
                .map(User::display_name)
                .ok_or_else(|| StoreError::missing("user", *id))
        })
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(names.join(", "))
}
