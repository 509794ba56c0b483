use axum::Router;
use axum::routing::post;

use crate::state::AppState;

pub mod dto;
pub mod error;
pub mod events;
pub mod handler;
pub mod orchestrator;
pub mod paths;
pub mod scratch;

#[cfg(test)]
pub mod testing;

pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(handler::receive_event))
}
