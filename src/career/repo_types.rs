use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CareerAssessment {
    pub id: i64,
    pub student: i64,
    pub interests: String,
    pub skills: String,
    pub academic_strengths: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Advice produced for an assessment: model output or the fallback text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CareerRecommendation {
    pub id: i64,
    pub student: i64,
    pub recommendation_text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAssessment {
    pub interests: String,
    pub skills: String,
    pub academic_strengths: String,
}
