use super::repo_types::{ExamRegistration, NewExamRegistration};
use sqlx::PgPool;

const EXAM_COLUMNS: &str = "id, student_id AS student, course_code, course_title, semester, year, \
     registered_on, is_verified";

impl ExamRegistration {
    /// Every registration, for staff.
    pub async fn list_all(db: &PgPool) -> Result<Vec<ExamRegistration>, sqlx::Error> {
        sqlx::query_as::<_, ExamRegistration>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exam_registrations ORDER BY id"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn list_for_student(db: &PgPool, student: i64) -> Result<Vec<ExamRegistration>, sqlx::Error> {
        sqlx::query_as::<_, ExamRegistration>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exam_registrations WHERE student_id = $1 ORDER BY id"
        ))
        .bind(student)
        .fetch_all(db)
        .await
    }

    pub async fn find(db: &PgPool, id: i64) -> Result<Option<ExamRegistration>, sqlx::Error> {
        sqlx::query_as::<_, ExamRegistration>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exam_registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        student: i64,
        new: &NewExamRegistration,
    ) -> Result<ExamRegistration, sqlx::Error> {
        sqlx::query_as::<_, ExamRegistration>(&format!(
            r#"
            INSERT INTO exam_registrations (student_id, course_code, course_title, semester, year)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(student)
        .bind(&new.course_code)
        .bind(&new.course_title)
        .bind(&new.semester)
        .bind(new.year)
        .fetch_one(db)
        .await
    }

    /// Rewrites the client fields; owner, `registered_on` and `is_verified` stay.
    pub async fn update(
        db: &PgPool,
        id: i64,
        new: &NewExamRegistration,
    ) -> Result<Option<ExamRegistration>, sqlx::Error> {
        sqlx::query_as::<_, ExamRegistration>(&format!(
            r#"
            UPDATE exam_registrations
            SET course_code = $2, course_title = $3, semester = $4, year = $5
            WHERE id = $1
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&new.course_code)
        .bind(&new.course_title)
        .bind(&new.semester)
        .bind(new.year)
        .fetch_optional(db)
        .await
    }

    pub async fn mark_verified(db: &PgPool, id: i64) -> Result<Option<ExamRegistration>, sqlx::Error> {
        sqlx::query_as::<_, ExamRegistration>(&format!(
            "UPDATE exam_registrations SET is_verified = TRUE WHERE id = $1 RETURNING {EXAM_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM exam_registrations WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
