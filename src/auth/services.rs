pub(crate) use crate::auth::dto::{Claims, JwtKeys, TokenKind};
use crate::auth::repo_types::Student;
use crate::config::JwtConfig;
use crate::error::AppError;
use crate::state::AppState;
use axum::{async_trait, extract::{FromRef, FromRequestParts}, http::request::Parts};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            refresh_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes.max(0) as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes.max(0) as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, student_id: i64, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: student_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(student = student_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, student_id: i64) -> anyhow::Result<String> {
        self.sign_with_kind(student_id, TokenKind::Access)
    }
    pub fn sign_refresh(&self, student_id: i64) -> anyhow::Result<String> {
        self.sign_with_kind(student_id, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(student = data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

/// Authenticated caller, carrying the student primary key from the access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err(AppError::Unauthorized("Invalid or expired token".into()));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        Ok(AuthUser(claims.sub))
    }
}

/// Loads the caller's account; a deleted or deactivated account is treated
/// as unauthenticated even while its token is still valid.
pub async fn load_caller(db: &sqlx::PgPool, AuthUser(id): AuthUser) -> Result<Student, AppError> {
    match Student::find_by_id(db, id).await? {
        Some(s) if s.is_active => Ok(s),
        _ => {
            warn!(student = id, "token for missing or inactive student");
            Err(AppError::Unauthorized("Student not found".into()))
        }
    }
}

#[cfg(test)]
mod jwt_tests {
    use super::*;
    use crate::app::build_app;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn campus_keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

    #[tokio::test]
    async fn tokens_carry_the_student_pk_and_configured_lifetimes() {
        let keys = campus_keys();

        let access = keys.verify(&keys.sign_access(1001).expect("sign access")).expect("verify access");
        assert_eq!(access.sub, 1001);
        assert_eq!((access.iss.as_str(), access.aud.as_str()), ("test-issuer", "test-aud"));
        assert_eq!(access.exp - access.iat, 5 * 60);

        let refresh = keys.verify_refresh(&keys.sign_refresh(1001).expect("sign refresh")).expect("verify refresh");
        assert_eq!(refresh.sub, 1001);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert_eq!(refresh.exp - refresh.iat, 60 * 60);
    }

    #[tokio::test]
    async fn access_token_cannot_be_exchanged_for_a_new_pair() {
        let keys = campus_keys();
        let access = keys.sign_access(1001).expect("sign access");
        let err = keys.verify_refresh(&access).unwrap_err();
        assert_eq!(err.to_string(), "not a refresh token");
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_as_a_bearer() {
        let state = AppState::fake();
        let refresh = JwtKeys::from_ref(&state).sign_refresh(1001).expect("sign refresh");
        let res = build_app(state)
            .oneshot(
                Request::get("/api/v1/me")
                    .header("authorization", format!("Bearer {refresh}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Access token required");
    }

    #[tokio::test]
    async fn expired_or_foreign_tokens_are_rejected() {
        let keys = campus_keys();

        let stale = Claims {
            sub: 1001,
            iat: 1_600_000_000,
            exp: 1_600_000_300,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
            kind: TokenKind::Access,
        };
        let stale = encode(&Header::default(), &stale, &keys.encoding).unwrap();
        assert!(keys.verify(&stale).is_err());

        // Same secret, but minted for another deployment's audience.
        let other_portal = JwtKeys {
            audience: "staff-portal".into(),
            ..campus_keys()
        };
        let foreign = other_portal.sign_access(1001).expect("sign access");
        assert!(keys.verify(&foreign).is_err());
    }

    #[test]
    fn username_and_email_patterns() {
        assert!(is_valid_username("jane.doe+exams@uni"));
        assert!(!is_valid_username("jane doe"));
        assert!(is_valid_email("jane@uni.ac.ke"));
        assert!(!is_valid_email("jane@uni"));
    }
}
