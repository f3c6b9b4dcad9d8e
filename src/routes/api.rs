use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{Paper, Role, User};
use crate::error::{AppError, AppResult};
use crate::routes::auth::CurrentUser;
use crate::state::AppState;
use crate::storage::{generate_media_name, media_path, media_type_for};
use crate::workflow::scoring::stars_to_score;
use crate::workflow::submission::PaperSubmission;
use crate::workflow::PaperStatus;

type Params<T> = Result<Query<T>, QueryRejection>;

#[derive(Deserialize)]
pub struct ActionParams {
    paper_id: i32,
    action: i64,
}

pub async fn paper_action(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    params: Params<ActionParams>,
) -> AppResult<Json<Value>> {
    current.require(Role::Admin)?;
    let Query(params) = params?;
    let status = PaperStatus::from_code(params.action)?;

    state.store.set_paper_status(params.paper_id, status).await?;
    info!("Paper {} set to {}", params.paper_id, status.label());

    Ok(Json(json!({
        "paper_id": params.paper_id,
        "actionStr": status.label(),
        "action": status.code(),
    })))
}

#[derive(Deserialize)]
pub struct StarParams {
    paper_id: i32,
    value: i32,
}

pub async fn review_star(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    params: Params<StarParams>,
) -> AppResult<Json<Value>> {
    let reviewer = current.require(Role::Reviewer)?;
    let Query(params) = params?;
    let score = stars_to_score(params.value)?;

    state
        .store
        .record_score(params.paper_id, reviewer.id, score)
        .await?;
    info!(
        "Reviewer {} scored paper {} with {} ({} stars)",
        reviewer.id, params.paper_id, score, params.value
    );

    Ok(Json(json!({
        "paper_id": params.paper_id,
        "value": params.value,
    })))
}

#[derive(Deserialize)]
pub struct SubmitParams {
    data: String,
}

pub async fn submit_paper(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    params: Params<SubmitParams>,
) -> AppResult<Json<Value>> {
    let Query(params) = params?;
    let submission: PaperSubmission = serde_json::from_str(&params.data)
        .map_err(|e| AppError::BadRequest(format!("invalid submission: {}", e)))?;

    let paper = state
        .store
        .create_paper(submission.clone().into_new_paper(user.id)?)
        .await?;
    info!(
        "User {} submitted paper {} with authors {:?}",
        user.id, paper.id, paper.authors
    );

    Ok(Json(json!({
        "data": submission,
        "paper_id": paper.id,
    })))
}

async fn load_paper(state: &AppState, paper_id: i32) -> AppResult<Paper> {
    state
        .store
        .find_paper(paper_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("paper {}", paper_id)))
}

pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    paper_id: Result<Path<i32>, PathRejection>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let Path(paper_id) = paper_id?;
    let paper = load_paper(&state, paper_id).await?;
    if paper.submitted_by != user.id && !user.has_role(Role::Admin) {
        return Err(AppError::Forbidden(
            "only the submitter can attach media".into(),
        ));
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("media") {
            continue;
        }
        let filename = field.file_name().unwrap_or("media").to_string();
        let data = field.bytes().await?;
        upload = Some((filename, data.to_vec()));
    }
    let (filename, data) = match upload {
        Some((name, data)) if !data.is_empty() => (name, data),
        _ => return Err(AppError::BadRequest("missing media file".into())),
    };

    let media_ref = generate_media_name(paper_id, &filename);
    let media_type = media_type_for(&filename);
    let target = media_path(&state.config.upload_folder, &media_ref)
        .ok_or_else(|| AppError::BadRequest("invalid media name".into()))?;
    tokio::fs::write(&target, &data).await?;

    let replaced = match state
        .store
        .set_paper_media(paper_id, &media_ref, &media_type)
        .await
    {
        Ok(replaced) => replaced,
        Err(e) => {
            remove_media(&target).await;
            return Err(e.into());
        }
    };
    if let Some(old) = replaced
        .as_deref()
        .and_then(|old| media_path(&state.config.upload_folder, old))
    {
        remove_media(&old).await;
    }
    info!(
        "Paper {} media stored as {} ({}, {} bytes)",
        paper_id,
        media_ref,
        media_type,
        data.len()
    );

    Ok(Json(json!({
        "paper_id": paper_id,
        "media_ref": media_ref,
        "media_type": media_type,
    })))
}

async fn remove_media(path: &std::path::Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove media file {}: {}", path.display(), e),
    }
}

async fn may_view_media(state: &AppState, user: &User, paper: &Paper) -> AppResult<bool> {
    if user.has_role(Role::Admin) || paper.involves(user.id) {
        return Ok(true);
    }
    let assigned = state.store.reviewers_for_paper(paper.id).await?;
    Ok(assigned.iter().any(|a| a.reviewer_id == user.id))
}

pub async fn download_media(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    paper_id: Result<Path<i32>, PathRejection>,
) -> AppResult<Response> {
    let Path(paper_id) = paper_id?;
    let paper = load_paper(&state, paper_id).await?;
    if !may_view_media(&state, &user, &paper).await? {
        return Err(AppError::Forbidden("not involved with this paper".into()));
    }

    let missing = || AppError::NotFound(format!("media of paper {}", paper_id));
    let media_ref = paper.media_ref.as_deref().ok_or_else(missing)?;
    let path = media_path(&state.config.upload_folder, media_ref).ok_or_else(missing)?;
    let content = match tokio::fs::read(&path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(missing()),
        Err(e) => return Err(e.into()),
    };

    let media_type = paper
        .media_type
        .clone()
        .unwrap_or_else(|| media_type_for(media_ref));
    Ok((
        [
            (header::CONTENT_TYPE, media_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", media_ref),
            ),
        ],
        content,
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct AssignUserParams {
    id: i32,
    assign: Option<bool>,
}

/// Grants or revokes the reviewer role. Without `assign` the role is toggled.
pub async fn assign_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    params: Params<AssignUserParams>,
) -> AppResult<Json<Value>> {
    current.require(Role::Admin)?;
    let Query(params) = params?;

    let assigned = match params.assign {
        Some(present) => {
            state
                .store
                .set_role(params.id, Role::Reviewer, present)
                .await?;
            present
        }
        None => state.store.toggle_role(params.id, Role::Reviewer).await?,
    };
    info!(
        "User {} reviewer role {}",
        params.id,
        if assigned { "granted" } else { "revoked" }
    );

    Ok(Json(json!({
        "id": params.id,
        "action": if assigned { 1 } else { 0 },
    })))
}

#[derive(Deserialize)]
pub struct AssignPaperParams {
    paper_id: i32,
    reviewer_id: i32,
    assigned: Option<bool>,
}

pub async fn assign_paper(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    params: Params<AssignPaperParams>,
) -> AppResult<Json<Value>> {
    current.require(Role::Admin)?;
    let Query(params) = params?;
    let assigned = params.assigned.unwrap_or(true);

    state
        .store
        .set_assignment(params.paper_id, params.reviewer_id, assigned)
        .await?;
    info!(
        "Reviewer {} {} paper {}",
        params.reviewer_id,
        if assigned { "assigned to" } else { "removed from" },
        params.paper_id
    );

    Ok(Json(json!({
        "paper_id": params.paper_id,
        "reviewer_id": params.reviewer_id,
        "assigned": assigned,
    })))
}

#[derive(Deserialize)]
pub struct ActivateParams {
    id: i32,
    active: String,
}

pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    params: Params<ActivateParams>,
) -> AppResult<Json<Value>> {
    current.require(Role::Admin)?;
    let Query(params) = params?;
    let activation = params.active == "true";

    state.store.set_user_active(params.id, activation).await?;
    info!("User {} active = {}", params.id, activation);

    Ok(Json(json!({
        "activation": activation,
        "active": params.active,
    })))
}
