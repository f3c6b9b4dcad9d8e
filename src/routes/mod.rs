mod api;
pub mod auth;
mod pages;

pub use api::*;
pub use pages::*;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const MAX_MEDIA_BYTES: usize = 32 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/member/list-papers", get(list_papers))
        .route("/submit/paper", get(submit_paper))
        .route(
            "/submit/paper/:paper_id/media",
            post(upload_media).layer(DefaultBodyLimit::max(MAX_MEDIA_BYTES)),
        )
        .route("/media/:paper_id", get(download_media))
        .route("/conference/paper", get(conference_papers))
        .route("/conference/paper/detail/:paper_id", get(paper_detail))
        .route("/conference/overview", get(overview_scores))
        .route("/conference/reviewer", get(reviewer_assignment))
        .route("/conference/action/paper", get(paper_action))
        .route("/conference/assign/paper", get(assign_paper))
        .route("/review/paper", get(review_papers))
        .route("/review/paper/star", get(review_star))
        .route("/assign/user", get(assign_user))
        .route("/activate/user", get(activate_user))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
