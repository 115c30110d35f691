use super::repo_types::StoredMessage;
use crate::llm::Role;
use sqlx::PgPool;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, session_id, role, content, created_at";

/// Turns of `session` belonging to `student`, oldest first.
pub async fn history(db: &PgPool, student: i64, session: Uuid) -> Result<Vec<StoredMessage>, sqlx::Error> {
    sqlx::query_as::<_, StoredMessage>(&format!(
        r#"
        SELECT {MESSAGE_COLUMNS} FROM chat_messages
        WHERE student_id = $1 AND session_id = $2
        ORDER BY id
        "#
    ))
    .bind(student)
    .bind(session)
    .fetch_all(db)
    .await
}

/// Stores a user message and the reply to it atomically.
pub async fn append_exchange(
    db: &PgPool,
    student: i64,
    session: Uuid,
    message: &str,
    reply: &str,
) -> Result<(), sqlx::Error> {
    let mut tx = db.begin().await?;
    for (role, content) in [(Role::User, message), (Role::Assistant, reply)] {
        sqlx::query(
            "INSERT INTO chat_messages (student_id, session_id, role, content) VALUES ($1, $2, $3, $4)",
        )
        .bind(student)
        .bind(session)
        .bind(role.as_str())
        .bind(content)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

/// Removes a session's turns, returning how many were deleted.
pub async fn clear(db: &PgPool, student: i64, session: Uuid) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM chat_messages WHERE student_id = $1 AND session_id = $2")
        .bind(student)
        .bind(session)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
