use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Student account record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub email: String,
    pub student_id: String,
    pub institution: Option<String>, // free text, not a foreign key
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

/// Validated registration data ready to insert.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub username: String,
    pub email: String,
    pub student_id: String,
    pub institution: Option<String>,
    pub first_name: String,
    pub last_name: String,
}
