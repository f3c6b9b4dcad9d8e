use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::Html,
};
use serde::Serialize;
use std::sync::Arc;
use tera::Context;

use crate::db::{Role, User};
use crate::error::AppResult;
use crate::routes::auth::{CurrentUser, MaybeUser};
use crate::state::AppState;
use crate::workflow::scoring::{MAX_STARS, MIN_STARS};
use crate::workflow::{views, PaperStatus};

#[derive(Serialize)]
struct StatusOption {
    code: i16,
    label: &'static str,
}

fn page_context(user: Option<&User>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("user", &user);
    ctx.insert("is_admin", &user.map_or(false, |u| u.has_role(Role::Admin)));
    ctx.insert("is_reviewer", &user.map_or(false, |u| u.acts_as(Role::Reviewer)));
    ctx
}

fn render_template(state: &AppState, name: &str, ctx: Context) -> AppResult<Html<String>> {
    Ok(Html(state.templates.render(name, &ctx)?))
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Html<String>> {
    render_template(&state, "index.html", page_context(user.as_ref()))
}

pub async fn list_papers(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Html<String>> {
    let papers = views::member_papers(state.store.as_ref(), &user).await?;

    let mut ctx = page_context(Some(&user));
    ctx.insert("papers", &papers);
    render_template(&state, "list_papers.html", ctx)
}

pub async fn conference_papers(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<Html<String>> {
    let admin = current.require(Role::Admin)?;
    let papers = views::conference_papers(state.store.as_ref(), admin).await?;
    let statuses: Vec<StatusOption> = PaperStatus::ALL
        .into_iter()
        .map(|s| StatusOption {
            code: s.code(),
            label: s.label(),
        })
        .collect();

    let mut ctx = page_context(Some(admin));
    ctx.insert("papers", &papers);
    ctx.insert("statuses", &statuses);
    render_template(&state, "conference_papers.html", ctx)
}

pub async fn paper_detail(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    paper_id: Result<Path<i32>, PathRejection>,
) -> AppResult<Html<String>> {
    let admin = current.require(Role::Admin)?;
    let Path(paper_id) = paper_id?;
    let paper = views::paper_detail(state.store.as_ref(), paper_id, admin).await?;
    let options = views::assignment_options(state.store.as_ref(), paper_id).await?;

    let mut ctx = page_context(Some(admin));
    ctx.insert("paper", &paper);
    ctx.insert("options", &options);
    render_template(&state, "paper_detail.html", ctx)
}

pub async fn overview_scores(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<Html<String>> {
    let admin = current.require(Role::Admin)?;
    let papers = views::score_overview(state.store.as_ref(), admin).await?;

    let mut ctx = page_context(Some(admin));
    ctx.insert("papers", &papers);
    render_template(&state, "overview.html", ctx)
}

pub async fn reviewer_assignment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<Html<String>> {
    let admin = current.require(Role::Admin)?;
    let candidates = views::reviewer_candidates(state.store.as_ref()).await?;

    let mut ctx = page_context(Some(admin));
    ctx.insert("candidates", &candidates);
    render_template(&state, "reviewers.html", ctx)
}

pub async fn review_papers(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> AppResult<Html<String>> {
    let reviewer = current.require(Role::Reviewer)?;
    let papers = views::reviewer_papers(state.store.as_ref(), reviewer).await?;

    let star_scale: Vec<i32> = (MIN_STARS..=MAX_STARS).collect();

    let mut ctx = page_context(Some(reviewer));
    ctx.insert("papers", &papers);
    ctx.insert("star_scale", &star_scale);
    render_template(&state, "review_papers.html", ctx)
}
