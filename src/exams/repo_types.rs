use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// A student's registration for a course exam.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ExamRegistration {
    pub id: i64,
    pub student: i64,
    pub course_code: String,
    pub course_title: String,
    pub semester: String,
    pub year: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_on: OffsetDateTime,
    pub is_verified: bool,
}

/// Client-writable fields; `student` always comes from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExamRegistration {
    pub course_code: String,
    pub course_title: String,
    pub semester: String,
    pub year: i32,
}
