use crate::auth::repo_types::{NewStudent, Student};
use sqlx::PgPool;

const STUDENT_COLUMNS: &str = "id, username, password_hash, email, student_id, institution, \
     first_name, last_name, is_active, is_staff, is_superuser, date_joined, last_login";

impl Student {
    /// Find a student by primary key.
    pub async fn find_by_id(db: &PgPool, id: i64) -> Result<Option<Student>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Find a student by login name.
    pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<Student>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn username_taken(db: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM students WHERE username = $1)")
            .bind(username)
            .fetch_one(db)
            .await
    }

    pub async fn student_id_taken(db: &PgPool, student_id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM students WHERE student_id = $1)")
            .bind(student_id)
            .fetch_one(db)
            .await
    }

    /// Create a new student with an already hashed password.
    pub async fn create(db: &PgPool, new: &NewStudent, password_hash: &str) -> Result<Student, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students (username, password_hash, email, student_id, institution, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(&new.username)
        .bind(password_hash)
        .bind(&new.email)
        .bind(&new.student_id)
        .bind(&new.institution)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(db)
        .await
    }

    pub async fn touch_last_login(db: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE students SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Delete a student; dependent rows go with it through ON DELETE CASCADE.
    pub async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
