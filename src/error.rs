use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::validation::ValidationErrors;

/// Errors returned by handlers, mapped onto HTTP statuses in `into_response`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Conflict {
        field: Option<&'static str>,
        message: String,
    },
    #[error("upstream service failed: {0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let field = db.constraint().and_then(field_for_constraint);
                let message = match field {
                    Some(f) => format!("a record with this {f} already exists"),
                    None => "a record with these values already exists".into(),
                };
                return Self::Conflict { field, message };
            }
            if db.is_foreign_key_violation() {
                return Self::BadRequest("referenced object does not exist".into());
            }
            if db.is_check_violation() {
                return Self::BadRequest(format!(
                    "value violates constraint {}",
                    db.constraint().unwrap_or("check")
                ));
            }
        }
        if matches!(err, sqlx::Error::RowNotFound) {
            return Self::NotFound("Not found".into());
        }
        Self::Internal(anyhow::Error::new(err))
    }
}

/// Postgres names UNIQUE constraints `<table>_<column>_key`.
fn field_for_constraint(constraint: &str) -> Option<&'static str> {
    match constraint {
        "institutions_code_key" => Some("code"),
        "students_username_key" => Some("username"),
        "students_student_id_key" => Some("student_id"),
        _ => None,
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(errors) => json!({ "errors": errors }),
            Self::Conflict { field, message } => json!({ "error": message, "field": field }),
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                json!({ "error": "Internal server error" })
            }
            Self::Upstream(msg) => {
                error!(error = %msg, "upstream error");
                json!({ "error": "Upstream service unavailable" })
            }
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg) => json!({ "error": msg }),
        };
        (status, Json(body)).into_response()
    }
}

/// JSON body extractor whose rejections render as `AppError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameters; a malformed segment is a JSON 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Query string; a malformed value is a JSON 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_renders_field_map_with_400() {
        let err = AppError::from(ValidationErrors::single("year", "Ensure this value is greater than 0."));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["errors"]["year"][0], "Ensure this value is greater than 0.");
    }

    #[tokio::test]
    async fn internal_errors_are_redacted() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn conflict_names_the_field() {
        let res = AppError::conflict("code", "taken").into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body = body_json(res).await;
        assert_eq!(body["field"], "code");
    }

    #[test]
    fn row_not_found_maps_to_404() {
        assert_eq!(AppError::from(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unique_constraints_map_to_fields() {
        assert_eq!(field_for_constraint("institutions_code_key"), Some("code"));
        assert_eq!(field_for_constraint("students_student_id_key"), Some("student_id"));
        assert_eq!(field_for_constraint("something_else"), None);
    }
}
