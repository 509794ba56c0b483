use axum::Router;
use axum::routing::get;

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod repository;
pub mod service;
pub mod store;

pub fn router() -> Router<AppState> {
    Router::new().route("/jobs/{*job_id}", get(handler::get_job))
}
