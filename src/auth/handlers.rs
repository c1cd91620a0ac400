use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, MethodRouter},
    Form, Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            LoginForm, MsgResponse, PublicUser, RegisterRequest, ResetPasswordRequest,
            TokenResponse,
        },
        error::{api_error, ApiError, AuthError},
        extractors::CurrentUser,
    },
    i18n::{message, Lang},
    middleware::rate_limit::{self, RateLimit},
    state::AppState,
};

fn limited(path: &str, handler: MethodRouter<AppState>, limit: RateLimit) -> Router<AppState> {
    Router::new()
        .route(path, handler)
        .route_layer(middleware::from_fn_with_state(limit, rate_limit::enforce))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .merge(limited(
            "/auth/register",
            post(register),
            RateLimit::per_minute(5),
        ))
        .merge(limited("/auth/login", post(login), RateLimit::per_minute(5)))
        .merge(limited(
            "/auth/password-recovery/:email",
            post(recover_password),
            RateLimit::per_minute(3),
        ))
        .merge(limited(
            "/auth/reset-password",
            post(reset_password),
            RateLimit::per_minute(3),
        ))
}

pub fn user_routes() -> Router<AppState> {
    limited("/users/me", get(get_me), RateLimit::per_minute(5))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Lang(language): Lang,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    match state
        .auth
        .register(&payload.email, &payload.password, &payload.full_name)
        .await
    {
        Ok((user, token)) => {
            info!(user_id = %user.id, email = %user.email, "registration complete");
            Ok((StatusCode::CREATED, Json(TokenResponse::bearer(token))))
        }
        // the combined policy text from the catalog, not the single
        // violated rule
        Err(AuthError::WeakPassword(_)) => Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            message(&language, "weak_password"),
        )),
        Err(e) => Err(e.into_api(&language)),
    }
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Lang(language): Lang,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    match state.auth.login(&form.username, &form.password).await {
        Ok((user, token)) => {
            info!(user_id = %user.id, "login complete");
            Ok(Json(TokenResponse::bearer(token)))
        }
        Err(e) => Err(e.into_api(&language)),
    }
}

#[instrument(skip(state))]
pub async fn recover_password(
    State(state): State<AppState>,
    Lang(language): Lang,
    Path(email): Path<String>,
) -> Result<Json<MsgResponse>, ApiError> {
    state
        .auth
        .request_password_reset(&email)
        .await
        .map_err(|e| e.into_api(&language))?;

    Ok(Json(MsgResponse {
        msg: message(&language, "password_recovery_sent").to_string(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Lang(language): Lang,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MsgResponse>, ApiError> {
    state
        .auth
        .consume_reset_token(&payload.token, &payload.new_password)
        .await
        .map_err(|e| e.into_api(&language))?;

    Ok(Json(MsgResponse {
        msg: message(&language, "password_updated").to_string(),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}
