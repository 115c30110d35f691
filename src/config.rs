use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Which hosted chat-completion API the LLM client talks to.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Azure,
}

impl LlmProvider {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "azure" => Ok(Self::Azure),
            other => anyhow::bail!("unknown LLM_PROVIDER {other:?}, expected openai or azure"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// None means every completion call fails; career advice then falls back.
    pub api_key: Option<String>,
    pub base_url: String,
    pub api_version: String,
    /// Model used for career recommendations.
    pub recommendation_model: String,
    /// Model used for the advisor chat.
    pub chat_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub reject_numeric: bool,
    pub reject_common: bool,
    pub reject_similar: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            reject_numeric: true,
            reject_common: true,
            reject_similar: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub llm: LlmConfig,
    pub password_policy: PasswordPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "edu-hub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "edu-hub-students".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };

        let provider = match std::env::var("LLM_PROVIDER") {
            Ok(raw) => LlmProvider::parse(&raw)?,
            Err(_) => LlmProvider::OpenAi,
        };
        let api_key = first_env(match provider {
            LlmProvider::OpenAi => &["LLM_API_KEY", "OPENAI_API_KEY"],
            LlmProvider::Azure => &["LLM_API_KEY", "AZURE_OPENAI_KEY"],
        });
        let base_url = match provider {
            LlmProvider::OpenAi => first_env(&["LLM_BASE_URL"])
                .unwrap_or_else(|| "https://api.openai.com/v1".into()),
            LlmProvider::Azure => first_env(&["LLM_BASE_URL", "AZURE_OPENAI_ENDPOINT"])
                .ok_or_else(|| anyhow::anyhow!("AZURE_OPENAI_ENDPOINT is required for azure"))?,
        };
        let llm = LlmConfig {
            provider,
            api_key,
            base_url,
            api_version: std::env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| "2024-02-01".into()),
            recommendation_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4".into()),
            chat_model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
        };

        let defaults = PasswordPolicy::default();
        let password_policy = PasswordPolicy {
            min_length: env_parse("PASSWORD_MIN_LENGTH").unwrap_or(defaults.min_length),
            reject_numeric: env_parse("PASSWORD_REJECT_NUMERIC").unwrap_or(defaults.reject_numeric),
            reject_common: env_parse("PASSWORD_REJECT_COMMON").unwrap_or(defaults.reject_common),
            reject_similar: env_parse("PASSWORD_REJECT_SIMILAR").unwrap_or(defaults.reject_similar),
        };

        Ok(Self {
            database_url,
            jwt,
            llm,
            password_policy,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!(LlmProvider::parse("OpenAI").unwrap(), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::parse(" azure ").unwrap(), LlmProvider::Azure);
        assert!(LlmProvider::parse("bedrock").is_err());
    }

    #[test]
    fn default_password_policy_matches_documented_values() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.min_length, 8);
        assert!(policy.reject_numeric && policy.reject_common && policy.reject_similar);
    }
}
