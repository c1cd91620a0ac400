use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use tracing::{error, warn};

use crate::{auth::error::AuthError, auth::store::User, state::AppState};

/// Resolves the bearer token on the request to its account.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        match state.auth.current_user(token).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(AuthError::UserNotFound) => {
                Err((StatusCode::NOT_FOUND, "User not found".to_string()))
            }
            Err(AuthError::InactiveUser) => {
                Err((StatusCode::BAD_REQUEST, "Inactive user".to_string()))
            }
            Err(AuthError::Internal(e)) => {
                error!(error = %e, "current user lookup failed");
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ))
            }
            Err(_) => {
                warn!("invalid or expired token");
                Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod extractor_tests {
    use axum::{extract::FromRequestParts, http::Request};

    use super::*;

    async fn extract(state: &AppState, request: Request<()>) -> Result<User, (StatusCode, String)> {
        let (mut parts, _) = request.into_parts();
        CurrentUser::from_request_parts(&mut parts, state)
            .await
            .map(|CurrentUser(user)| user)
    }

    #[tokio::test]
    async fn resolves_bearer_token_to_its_account() {
        let state = AppState::fake();
        let (user, token) = state
            .auth
            .register("bearer@example.com", "Str0ng!Pass", "Bearer")
            .await
            .expect("register");

        let request = Request::builder()
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .unwrap();
        let current = extract(&state, request).await.expect("extract");
        assert_eq!(current.id, user.id);
    }

    #[tokio::test]
    async fn rejects_missing_and_malformed_headers() {
        let state = AppState::fake();

        let request = Request::builder().body(()).unwrap();
        let (status, detail) = extract(&state, request).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(detail, "Missing Authorization header");

        let request = Request::builder()
            .header("Authorization", "Basic dXNlcjpwdw==")
            .body(())
            .unwrap();
        let (status, detail) = extract(&state, request).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(detail, "Invalid Authorization header");
    }

    #[tokio::test]
    async fn rejects_garbage_token() {
        let state = AppState::fake();
        let request = Request::builder()
            .header("Authorization", "Bearer not.a.jwt")
            .body(())
            .unwrap();
        let (status, detail) = extract(&state, request).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(detail, "Invalid or expired token");
    }
}
