use anyhow::Context;
use axum::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub language: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One password reset code. `consumed` flips exactly once.
#[derive(Debug, Clone, FromRow)]
pub struct ResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub consumed: bool,
    pub created_at: OffsetDateTime,
}

/// Persistence operations the auth service needs.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        language: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<User>;

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        code: &str,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<ResetToken>;

    /// Token matching `code` that is neither consumed nor expired at `now`.
    async fn find_active_reset_token(
        &self,
        code: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<ResetToken>>;

    /// Flips the token to consumed and saves the new password hash in one
    /// transaction. Returns false without touching anything when the token
    /// was already consumed or expired by the time the update ran.
    async fn consume_token_and_save_password(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool>;

    async fn delete_reset_token(&self, token_id: Uuid) -> anyhow::Result<()>;
}

/// Postgres-backed [`AuthStore`].
#[derive(Clone)]
pub struct PgAuthStore {
    db: PgPool,
}

impl PgAuthStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, language, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, language, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get user by id")?;
        Ok(user)
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        language: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, language, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $6)
            RETURNING id, email, password_hash, full_name, language, is_active, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(language)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .context("create user")?;
        Ok(user)
    }

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        code: &str,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<ResetToken> {
        let token = sqlx::query_as::<_, ResetToken>(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, code, expires_at, consumed, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, user_id, code, expires_at, consumed, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .context("create reset token")?;
        Ok(token)
    }

    async fn find_active_reset_token(
        &self,
        code: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<ResetToken>> {
        let token = sqlx::query_as::<_, ResetToken>(
            r#"
            SELECT id, user_id, code, expires_at, consumed, created_at
            FROM password_reset_tokens
            WHERE code = $1 AND NOT consumed AND expires_at > $2
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("find active reset token")?;
        Ok(token)
    }

    async fn consume_token_and_save_password(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // the predicate re-runs inside the transaction, so two racing
        // consumers cannot both flip the same token
        let consumed = tx
            .execute(
                sqlx::query(
                    r#"
                    UPDATE password_reset_tokens
                    SET consumed = TRUE
                    WHERE id = $1 AND NOT consumed AND expires_at > $2
                    "#,
                )
                .bind(token_id)
                .bind(now),
            )
            .await
            .context("consume reset token")?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await.context("rollback tx")?;
            return Ok(false);
        }

        tx.execute(
            sqlx::query(
                r#"
                UPDATE users
                SET password_hash = $1, updated_at = $2
                WHERE id = $3
                "#,
            )
            .bind(password_hash)
            .bind(now)
            .bind(user_id),
        )
        .await
        .context("save new password")?;

        tx.commit().await.context("commit tx")?;
        Ok(true)
    }

    async fn delete_reset_token(&self, token_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM password_reset_tokens
            WHERE id = $1
            "#,
        )
        .bind(token_id)
        .execute(&self.db)
        .await
        .context("delete reset token")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serialization_hides_password_hash() {
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

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2-secret"));
        assert!(!json.contains("password_hash"));
    }
}
