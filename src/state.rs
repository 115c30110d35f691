use crate::config::AppConfig;
use crate::llm::{ChatClient, OpenAiChatClient};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub llm: Arc<dyn ChatClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let llm = Arc::new(OpenAiChatClient::new(&config.llm)?) as Arc<dyn ChatClient>;
        if config.llm.api_key.is_none() {
            tracing::warn!("no LLM API key configured; career advice will use the fallback text");
        }

        Ok(Self::from_parts(db, config, llm))
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>, llm: Arc<dyn ChatClient>) -> Self {
        Self { db, config, llm }
    }
}
