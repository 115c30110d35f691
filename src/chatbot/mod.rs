use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

/// Advisor chat, with history kept per caller and session.
pub fn router() -> Router<AppState> {
    handlers::chat_routes()
}
