use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicStudent, RefreshRequest, RegisterRequest},
        password::{check_strength, hash_password, verify_password},
        repo_types::Student,
        services::{load_caller, AuthUser, JwtKeys},
    },
    error::{AppError, AppJson, AppResult},
    state::AppState,
    validation::{Validate, ValidationErrors},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).delete(delete_me))
}

fn issue_tokens(state: &AppState, student: Student) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(student.id)?;
    let refresh_token = keys.sign_refresh(student.id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        student: student.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let valid = payload.validate().map_err(|errors| {
        warn!(fields = %errors, "registration rejected");
        errors
    })?;

    let new = &valid.student;
    let problems = check_strength(
        &valid.password,
        &state.config.password_policy,
        &[
            new.username.as_str(),
            new.email.as_str(),
            new.first_name.as_str(),
            new.last_name.as_str(),
        ],
    );
    if !problems.is_empty() {
        let mut errors = ValidationErrors::new();
        for p in problems {
            errors.add("password", p);
        }
        warn!("password rejected by policy");
        return Err(errors.into());
    }

    // Pre-check uniqueness for a friendly message; the UNIQUE constraints still decide races.
    if Student::username_taken(&state.db, &new.username).await? {
        warn!(username = %new.username, "username already registered");
        return Err(AppError::conflict("username", "A user with that username already exists."));
    }
    if Student::student_id_taken(&state.db, &new.student_id).await? {
        warn!(student_id = %new.student_id, "student_id already registered");
        return Err(AppError::conflict("student_id", "A student with that student_id already exists."));
    }

    let hash = hash_password(&valid.password)?;
    let student = Student::create(&state.db, new, &hash).await?;

    info!(student = student.id, username = %student.username, "student registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, student)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let username = payload.username.trim();
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let student = match Student::find_by_username(&state.db, username).await? {
        Some(s) => s,
        None => {
            warn!(%username, "login unknown username");
            return Err(invalid());
        }
    };

    if !verify_password(&payload.password, &student.password_hash)? {
        warn!(student = student.id, "login invalid password");
        return Err(invalid());
    }
    if !student.is_active {
        warn!(student = student.id, "login on inactive account");
        return Err(invalid());
    }

    Student::touch_last_login(&state.db, student.id).await?;
    info!(student = student.id, "student logged in");
    Ok(Json(issue_tokens(&state, student)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let student = load_caller(&state.db, AuthUser(claims.sub)).await?;
    Ok(Json(issue_tokens(&state, student)?))
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, caller: AuthUser) -> AppResult<Json<PublicStudent>> {
    let student = load_caller(&state.db, caller).await?;
    Ok(Json(student.into()))
}

/// Deletes the caller's account together with every record it owns.
#[instrument(skip(state))]
pub async fn delete_me(State(state): State<AppState>, caller: AuthUser) -> AppResult<StatusCode> {
    let student = load_caller(&state.db, caller).await?;
    Student::delete(&state.db, student.id).await?;
    info!(student = student.id, "student account deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::state::testing::FakeChat;
    use axum::{body::Body, http::Request, response::Response};
    use sqlx::PgPool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn register_request(body: &str) -> Request<Body> {
        Request::post("/api/v1/auth/register")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn me_requires_bearer_token() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/v1/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_reports_validation_errors_before_touching_the_database() {
        let app = build_app(AppState::fake());
        let req = Request::post("/api/v1/auth/register")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"username":"teststudent","student_id":"S12345","password":"123"}"#,
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let messages = body["errors"]["password"].as_array().unwrap();
        assert!(messages.iter().any(|m| m.as_str().unwrap().contains("too short")));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = build_app(AppState::fake());
        let req = Request::post("/api/v1/auth/login")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn duplicate_username_or_student_id_is_a_conflict(db: PgPool) {
        let app = build_app(AppState::with_pool(db.clone(), Arc::new(FakeChat::failing())));

        let res = app
            .clone()
            .oneshot(register_request(
                r#"{"username":"wanjiku","student_id":"S1001","email":"wanjiku@uni.ac.ke","password":"violet-Harbour-42"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        assert_eq!(created["student"]["username"], "wanjiku");
        assert!(created["access_token"].is_string());

        let res = app
            .clone()
            .oneshot(register_request(
                r#"{"username":"wanjiku","student_id":"S2002","password":"violet-Harbour-42"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["field"], "username");

        let res = app
            .oneshot(register_request(
                r#"{"username":"otieno","student_id":"S1001","password":"violet-Harbour-42"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["field"], "student_id");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
