use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::store::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Form body for login, OAuth2 password-flow style.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Request body for redeeming a reset code.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Bearer token returned by register and login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Plain confirmation message, `{"msg": "..."}`.
#[derive(Debug, Serialize)]
pub struct MsgResponse {
    pub msg: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub language: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            language: user.language,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn token_response_is_bearer() {
        let response = TokenResponse::bearer("abc.def.ghi".to_string());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"access_token\":\"abc.def.ghi\""));
        assert!(json.contains("\"token_type\":\"bearer\""));
    }

    #[test]
    fn public_user_carries_no_password_hash() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: "argon2-secret".to_string(),
            full_name: "Test User".to_string(),
            language: "en".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2-secret"));
    }
}
