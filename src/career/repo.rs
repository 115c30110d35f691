use super::repo_types::{CareerAssessment, CareerRecommendation, NewAssessment};
use sqlx::{PgConnection, PgPool};

const ASSESSMENT_COLUMNS: &str = "id, student_id AS student, interests, skills, academic_strengths, created_at";
const RECOMMENDATION_COLUMNS: &str = "id, student_id AS student, recommendation_text, created_at";

impl CareerAssessment {
    /// Insert on an open connection so the caller can pair it with its recommendation.
    pub async fn insert(
        conn: &mut PgConnection,
        student: i64,
        new: &NewAssessment,
    ) -> Result<CareerAssessment, sqlx::Error> {
        sqlx::query_as::<_, CareerAssessment>(&format!(
            r#"
            INSERT INTO career_assessments (student_id, interests, skills, academic_strengths)
            VALUES ($1, $2, $3, $4)
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        ))
        .bind(student)
        .bind(&new.interests)
        .bind(&new.skills)
        .bind(&new.academic_strengths)
        .fetch_one(conn)
        .await
    }

    pub async fn list_for_student(db: &PgPool, student: i64) -> Result<Vec<CareerAssessment>, sqlx::Error> {
        sqlx::query_as::<_, CareerAssessment>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM career_assessments WHERE student_id = $1 ORDER BY id"
        ))
        .bind(student)
        .fetch_all(db)
        .await
    }
}

impl CareerRecommendation {
    pub async fn insert(
        conn: &mut PgConnection,
        student: i64,
        text: &str,
    ) -> Result<CareerRecommendation, sqlx::Error> {
        sqlx::query_as::<_, CareerRecommendation>(&format!(
            r#"
            INSERT INTO career_recommendations (student_id, recommendation_text)
            VALUES ($1, $2)
            RETURNING {RECOMMENDATION_COLUMNS}
            "#
        ))
        .bind(student)
        .bind(text)
        .fetch_one(conn)
        .await
    }

    pub async fn list_for_student(db: &PgPool, student: i64) -> Result<Vec<CareerRecommendation>, sqlx::Error> {
        sqlx::query_as::<_, CareerRecommendation>(&format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM career_recommendations WHERE student_id = $1 ORDER BY id"
        ))
        .bind(student)
        .fetch_all(db)
        .await
    }
}
