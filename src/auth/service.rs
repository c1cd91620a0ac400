use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        error::AuthError,
        password::{hash_password, validate_password_strength, verify_password},
        store::{AuthStore, User},
        tokens::{generate_reset_code, JwtKeys},
    },
    clock::Clock,
    config::{AuthConfig, PasswordPolicy},
    i18n::DEFAULT_LANGUAGE,
    mailer::{EmailMessage, Mailer},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Credential and token operations. Persistence, email delivery and the
/// clock are injected, so every rule here can run against fakes.
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    keys: JwtKeys,
    policy: PasswordPolicy,
    reset_ttl_hours: i64,
    project_name: String,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        project_name: &str,
        store: Arc<dyn AuthStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            keys: JwtKeys::new(&config.secret_key, config.access_token_ttl_minutes),
            policy: config.password.clone(),
            reset_ttl_hours: config.reset_token_ttl_hours,
            project_name: project_name.to_string(),
            store,
            mailer,
            clock,
        }
    }

    /// Creates an account and signs an access token for it.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<(User, String), AuthError> {
        let email = email.trim();

        if !is_valid_email(email) {
            warn!(email = %email, "invalid email on registration");
            return Err(AuthError::InvalidEmail);
        }
        validate_password_strength(&self.policy, password).map_err(AuthError::WeakPassword)?;

        if self.store.find_user_by_email(email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::EmailTaken);
        }

        let hash = hash_password(password)?;
        let now = self.clock.now();
        let user = self
            .store
            .create_user(email, &hash, full_name, DEFAULT_LANGUAGE, now)
            .await?;
        let token = self.keys.sign_access(user.id, now)?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok((user, token))
    }

    /// Checks credentials and signs an access token. Credentials are
    /// checked before account status.
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = username.trim();

        let user = match self.store.find_user_by_email(email).await? {
            Some(u) => u,
            None => {
                warn!(email = %email, "login with unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = %user.id, "login with invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login on inactive account");
            return Err(AuthError::InactiveUser);
        }

        let token = self.keys.sign_access(user.id, self.clock.now())?;
        info!(user_id = %user.id, "user logged in");
        Ok((user, token))
    }

    /// Starts password recovery for the account registered under `email`.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim();
        let user = match self.store.find_user_by_email(email).await? {
            Some(u) => u,
            None => {
                warn!(email = %email, "password recovery for unknown email");
                return Err(AuthError::UserNotFound);
            }
        };
        self.issue_reset_token(&user).await?;
        Ok(())
    }

    /// Generates a reset code, persists it, and emails it to the user.
    /// When delivery fails the stored row is removed again.
    pub async fn issue_reset_token(
        &self,
        user: &User,
    ) -> Result<(String, OffsetDateTime), AuthError> {
        let code = generate_reset_code();
        let now = self.clock.now();
        let expires_at = now + TimeDuration::hours(self.reset_ttl_hours);
        let token = self
            .store
            .create_reset_token(user.id, &code, now, expires_at)
            .await?;

        let message = EmailMessage::password_reset(
            &user.email,
            &self.project_name,
            &code,
            self.reset_ttl_hours,
        );
        if let Err(e) = self.mailer.send(&message).await {
            error!(error = %e, user_id = %user.id, "reset email delivery failed");
            if let Err(cleanup) = self.store.delete_reset_token(token.id).await {
                error!(error = %cleanup, token_id = %token.id, "orphaned reset token cleanup failed");
            }
            return Err(AuthError::Delivery(e));
        }

        info!(user_id = %user.id, "password reset email sent");
        Ok((code, expires_at))
    }

    /// Redeems a reset code for a new password. The code has to be
    /// present, unconsumed and unexpired when the update commits. The
    /// password change and the consumed flag land in one transaction.
    pub async fn consume_reset_token(
        &self,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();
        let token = match self.store.find_active_reset_token(code, now).await? {
            Some(t) => t,
            None => {
                warn!("reset code unknown, consumed, or expired");
                return Err(AuthError::InvalidToken);
            }
        };

        let user = self
            .store
            .get_user(token.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        validate_password_strength(&self.policy, new_password).map_err(AuthError::WeakPassword)?;

        let hash = hash_password(new_password)?;
        let committed = self
            .store
            .consume_token_and_save_password(token.id, user.id, &hash, self.clock.now())
            .await?;
        if !committed {
            warn!(token_id = %token.id, "reset token consumed concurrently");
            return Err(AuthError::InvalidToken);
        }

        info!(user_id = %user.id, "password updated via reset token");
        Ok(())
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.keys.sign_access(user_id, self.clock.now())
    }

    pub fn verify_access_token(&self, token: &str) -> anyhow::Result<Uuid> {
        let claims = self.keys.verify_access(token, self.clock.now())?;
        Ok(claims.sub)
    }

    /// Resolves a bearer token to its account, rejecting tokens whose
    /// account is gone or deactivated.
    pub async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        let user_id = match self.verify_access_token(token) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "access token rejected");
                return Err(AuthError::InvalidToken);
            }
        };
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }
        Ok(user)
    }
}
