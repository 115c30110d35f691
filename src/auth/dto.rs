use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

use crate::auth::repo_types::{NewStudent, Student};
use crate::validation::{Validate, ValidationErrors};

/// Token type used to distinguish Access and Refresh JWTs.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// Standard JWT claims used in the app.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,        // student primary key
    pub exp: usize,      // expiration time
    pub iat: usize,      // issued at
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub kind: TokenKind, // access or refresh
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Request body for student registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub student_id: Option<String>,
    pub password: Option<String>,
    pub institution: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Registration fields after validation; the password is checked separately
/// against the configured policy.
#[derive(Debug)]
pub struct ValidRegistration {
    pub student: NewStudent,
    pub password: String,
}

impl Validate for RegisterRequest {
    type Valid = ValidRegistration;

    fn validate(self) -> Result<ValidRegistration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = errors.text("username", self.username.map(|u| u.trim().to_string()), 150);
        if !username.is_empty() && !super::services::is_valid_username(&username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        let email = self
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_default();
        errors.max_chars("email", &email, 254);
        if !email.is_empty() && !super::services::is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        let student_id = errors.text("student_id", self.student_id.map(|s| s.trim().to_string()), 20);
        let institution = errors.optional_text("institution", self.institution, Some(100));
        let first_name = errors
            .optional_text("first_name", self.first_name, Some(150))
            .unwrap_or_default();
        let last_name = errors
            .optional_text("last_name", self.last_name, Some(150))
            .unwrap_or_default();

        let password = match self.password {
            None => {
                errors.add("password", crate::validation::REQUIRED);
                String::new()
            }
            Some(p) if p.is_empty() => {
                errors.add("password", crate::validation::BLANK);
                String::new()
            }
            Some(p) => p,
        };

        errors.into_result()?;
        Ok(ValidRegistration {
            student: NewStudent {
                username,
                email,
                student_id,
                institution,
                first_name,
                last_name,
            },
            password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub student: PublicStudent,
}

/// Public part of the student returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicStudent {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub student_id: String,
    pub institution: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl From<Student> for PublicStudent {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            username: s.username,
            email: s.email,
            student_id: s.student_id,
            institution: s.institution,
            first_name: s.first_name,
            last_name: s.last_name,
            is_staff: s.is_staff,
            date_joined: s.date_joined,
        }
    }
}
