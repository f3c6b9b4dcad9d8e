//! Paper, review and scoring rules shared by the route handlers.

pub mod authors;
pub mod scoring;
mod status;
pub mod submission;
pub mod views;

pub use status::{InvalidStatus, PaperStatus};
