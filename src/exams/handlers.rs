use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{load_caller, repo_types::Student, AuthUser},
    error::{AppError, AppJson, AppPath, AppResult},
    exams::{
        dto::ExamRegistrationPayload,
        repo_types::{ExamRegistration, NewExamRegistration},
    },
    state::AppState,
    validation::Validate,
};

pub fn exam_routes() -> Router<AppState> {
    Router::new()
        .route("/exam-registrations", get(list).post(create))
        .route(
            "/exam-registrations/:id",
            get(retrieve).put(update).patch(partial_update).delete(destroy),
        )
        .route("/exam-registrations/:id/verify", post(verify))
}

fn checked(payload: ExamRegistrationPayload) -> AppResult<NewExamRegistration> {
    payload.validate().map_err(|errors| {
        warn!(fields = %errors, "exam registration rejected");
        AppError::from(errors)
    })
}

/// Loads registration `id` if the caller owns it or is staff.
async fn accessible(state: &AppState, caller: &Student, id: i64) -> AppResult<ExamRegistration> {
    let row = ExamRegistration::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("exam registration"))?;
    if row.student != caller.id && !caller.is_staff {
        warn!(student = caller.id, registration = id, "foreign exam registration");
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action.".into(),
        ));
    }
    Ok(row)
}

#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>, caller: AuthUser) -> AppResult<Json<Vec<ExamRegistration>>> {
    let caller = load_caller(&state.db, caller).await?;
    let rows = if caller.is_staff {
        ExamRegistration::list_all(&state.db).await?
    } else {
        ExamRegistration::list_for_student(&state.db, caller.id).await?
    };
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(payload): AppJson<ExamRegistrationPayload>,
) -> AppResult<(StatusCode, Json<ExamRegistration>)> {
    let new = checked(payload)?;
    let caller = load_caller(&state.db, caller).await?;
    let row = ExamRegistration::create(&state.db, caller.id, &new).await?;
    info!(student = caller.id, registration = row.id, course = %row.course_code, "exam registration created");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state))]
pub async fn retrieve(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<ExamRegistration>> {
    let caller = load_caller(&state.db, caller).await?;
    Ok(Json(accessible(&state, &caller, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<ExamRegistrationPayload>,
) -> AppResult<Json<ExamRegistration>> {
    let caller = load_caller(&state.db, caller).await?;
    accessible(&state, &caller, id).await?;
    let new = checked(payload)?;
    let row = ExamRegistration::update(&state.db, id, &new)
        .await?
        .ok_or_else(|| AppError::not_found("exam registration"))?;
    info!(registration = id, "exam registration updated");
    Ok(Json(row))
}

#[instrument(skip(state, patch))]
pub async fn partial_update(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(patch): AppJson<ExamRegistrationPayload>,
) -> AppResult<Json<ExamRegistration>> {
    let caller = load_caller(&state.db, caller).await?;
    let existing = accessible(&state, &caller, id).await?;
    let new = checked(patch.merged_over(existing))?;
    let row = ExamRegistration::update(&state.db, id, &new)
        .await?
        .ok_or_else(|| AppError::not_found("exam registration"))?;
    info!(registration = id, "exam registration patched");
    Ok(Json(row))
}

#[instrument(skip(state))]
pub async fn destroy(State(state): State<AppState>, caller: AuthUser, AppPath(id): AppPath<i64>) -> AppResult<StatusCode> {
    let caller = load_caller(&state.db, caller).await?;
    accessible(&state, &caller, id).await?;
    if !ExamRegistration::delete(&state.db, id).await? {
        return Err(AppError::not_found("exam registration"));
    }
    info!(registration = id, "exam registration deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Staff-only: marks a registration as verified.
#[instrument(skip(state))]
pub async fn verify(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<ExamRegistration>> {
    let caller = load_caller(&state.db, caller).await?;
    if !caller.is_staff {
        warn!(student = caller.id, registration = id, "verify attempted by non-staff");
        return Err(AppError::Forbidden("Only staff can verify exam registrations.".into()));
    }
    let row = ExamRegistration::mark_verified(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("exam registration"))?;
    info!(registration = id, verified_by = caller.id, "exam registration verified");
    Ok(Json(row))
}
