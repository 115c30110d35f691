use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{load_caller, AuthUser},
    chatbot::{
        dto::{ChatRequest, ChatResponse},
        repo,
        repo_types::StoredMessage,
        services::build_conversation,
    },
    error::{AppError, AppJson, AppPath, AppResult},
    llm::CompletionOptions,
    state::AppState,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/:session_id", get(get_history).delete(clear_history))
}

#[instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(payload): AppJson<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = payload
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("No message provided".into()))?;
    let caller = load_caller(&state.db, caller).await?;
    let session_id = payload.session_id.unwrap_or_else(Uuid::new_v4);

    let history = repo::history(&state.db, caller.id, session_id).await?;
    let conversation = build_conversation(&history, &message);
    let options = CompletionOptions {
        model: state.config.llm.chat_model.clone(),
        ..Default::default()
    };

    let response = state.llm.complete(&conversation, &options).await.map_err(|e| {
        error!(error = %e, student = caller.id, %session_id, "chat completion failed");
        AppError::Upstream(e.to_string())
    })?;

    repo::append_exchange(&state.db, caller.id, session_id, &message, &response).await?;
    info!(student = caller.id, %session_id, turns = history.len() + 2, "chat reply sent");
    Ok(Json(ChatResponse { session_id, response }))
}

#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(session_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<StoredMessage>>> {
    let caller = load_caller(&state.db, caller).await?;
    Ok(Json(repo::history(&state.db, caller.id, session_id).await?))
}

#[instrument(skip(state))]
pub async fn clear_history(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(session_id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    let caller = load_caller(&state.db, caller).await?;
    let removed = repo::clear(&state.db, caller.id, session_id).await?;
    info!(student = caller.id, %session_id, removed, "chat session cleared");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::build_app,
        llm::Role,
        state::testing::{seed_student, FakeChat},
    };
    use axum::{body::Body, http::Request, response::Response};
    use sqlx::PgPool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn request(method: &str, uri: &str, token: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", token)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        for body in [r#"{}"#, r#"{"message":""}"#, r#"{"message":"   "}"#] {
            let state = AppState::fake();
            let token = state.bearer(1);
            let res = build_app(state)
                .oneshot(request("POST", "/api/v1/chat", &token, body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(body_json(res).await["error"], "No message provided");
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn sessions_keep_their_own_history(db: PgPool) {
        let alice = seed_student(&db, "alice", false).await;
        let bob = seed_student(&db, "bob", false).await;
        let llm = Arc::new(FakeChat::replying("Consider computer science."));
        let state = AppState::with_pool(db.clone(), llm.clone());
        let app = build_app(state.clone());

        let res = app
            .clone()
            .oneshot(request("POST", "/api/v1/chat", &state.bearer(alice.id), r#"{"message":"Hi"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let first = body_json(res).await;
        assert_eq!(first["response"], "Consider computer science.");
        let session = first["session_id"].as_str().unwrap().to_string();

        let body = format!(r#"{{"message":"What about maths?","session_id":"{session}"}}"#);
        app.clone()
            .oneshot(request("POST", "/api/v1/chat", &state.bearer(alice.id), &body))
            .await
            .unwrap();
        {
            let calls = llm.calls.lock().unwrap();
            let (second_call, options) = &calls[1];
            assert_eq!(second_call.len(), 4);
            assert_eq!(second_call[1].content, "Hi");
            assert_eq!(second_call[2].role, Role::Assistant);
            assert_eq!(options.model, "gpt-4o");
        }

        // bob asking with alice's session id starts from nothing
        app.clone()
            .oneshot(request("POST", "/api/v1/chat", &state.bearer(bob.id), &body))
            .await
            .unwrap();
        assert_eq!(llm.calls.lock().unwrap()[2].0.len(), 2);

        let res = app
            .clone()
            .oneshot(request("GET", &format!("/api/v1/chat/{session}"), &state.bearer(alice.id), ""))
            .await
            .unwrap();
        assert_eq!(body_json(res).await.as_array().unwrap().len(), 4);

        let res = app
            .oneshot(request("DELETE", &format!("/api/v1/chat/{session}"), &state.bearer(alice.id), ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let session: Uuid = session.parse().unwrap();
        assert!(repo::history(&db, alice.id, session).await.unwrap().is_empty());
        assert_eq!(repo::history(&db, bob.id, session).await.unwrap().len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn upstream_failure_stores_nothing(db: PgPool) {
        let alice = seed_student(&db, "alice", false).await;
        let state = AppState::with_pool(db.clone(), Arc::new(FakeChat::failing()));
        let session = Uuid::new_v4();
        let body = format!(r#"{{"message":"Hi","session_id":"{session}"}}"#);

        let res = build_app(state.clone())
            .oneshot(request("POST", "/api/v1/chat", &state.bearer(alice.id), &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert!(repo::history(&db, alice.id, session).await.unwrap().is_empty());
    }
}
