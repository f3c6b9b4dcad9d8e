use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::{Role, User};
use crate::error::AppError;
use crate::state::AppState;

/// The signed-in user, as forwarded by the identity provider in the
/// configured header and loaded with roles from the store.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn require(&self, role: Role) -> Result<&User, AppError> {
        if self.0.acts_as(role) {
            Ok(&self.0)
        } else {
            Err(AppError::Forbidden(format!("{} role required", role.name())))
        }
    }
}

fn user_id_from(parts: &Parts, header: &str) -> Option<i32> {
    parts
        .headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id =
            user_id_from(parts, &state.config.identity_header).ok_or(AppError::Unauthorized)?;
        let user = state
            .store
            .find_user(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !user.active {
            return Err(AppError::Forbidden("account is not active".into()));
        }
        Ok(CurrentUser(user))
    }
}

/// Like `CurrentUser`, but anonymous requests pass through as `None`.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if user_id_from(parts, &state.config.identity_header).is_none() {
            return Ok(MaybeUser(None));
        }
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        Ok(MaybeUser(Some(user)))
    }
}
