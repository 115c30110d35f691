use crate::state::AppState;
use axum::Router;

mod crud;
pub mod dto;
mod repo;
pub mod repo_types;

use repo_types::{Course, Fee, Institution, Program, Unit};

/// Institution, program, course, unit and fee records.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(crud::routes::<Institution>("/institutions"))
        .merge(crud::routes::<Program>("/programs"))
        .merge(crud::routes::<Course>("/courses"))
        .merge(crud::routes::<Unit>("/units"))
        .merge(crud::routes::<Fee>("/fees"))
}
