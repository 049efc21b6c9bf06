use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::Executor;
use sqlx::PgPool;
use sqlx::Postgres;
use uuid::Uuid;

use super::database_error;
use crate::account::errors::AuthError;
use crate::account::models::UserId;
use crate::account::ports::TokenRepository;
use crate::account::tokens::EmailVerificationToken;
use crate::account::tokens::PasswordResetToken;
use crate::account::tokens::RefreshToken;
use crate::account::tokens::TokenId;

#[derive(Debug, sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl RefreshTokenRow {
    fn into_token(self) -> RefreshToken {
        RefreshToken {
            id: TokenId(self.id),
            token: self.token,
            user_id: UserId(self.user_id),
            expires_at: self.expires_at,
            revoked: self.revoked,
            created_at: self.created_at,
        }
    }
}

/// Row shape shared by the verification and reset token tables.
#[derive(Debug, sqlx::FromRow)]
struct SingleUseTokenRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    used: bool,
    created_at: DateTime<Utc>,
}

impl SingleUseTokenRow {
    fn into_email_verification(self) -> EmailVerificationToken {
        EmailVerificationToken {
            id: TokenId(self.id),
            token: self.token,
            user_id: UserId(self.user_id),
            expires_at: self.expires_at,
            used: self.used,
            created_at: self.created_at,
        }
    }

    fn into_password_reset(self) -> PasswordResetToken {
        PasswordResetToken {
            id: TokenId(self.id),
            token: self.token,
            user_id: UserId(self.user_id),
            expires_at: self.expires_at,
            used: self.used,
            created_at: self.created_at,
        }
    }
}

pub(super) async fn insert_refresh_token<'c, E>(
    executor: E,
    token: &RefreshToken,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, token, user_id, expires_at, revoked, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(token.id.0)
    .bind(&token.token)
    .bind(token.user_id.0)
    .bind(token.expires_at)
    .bind(token.revoked)
    .bind(token.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(super) async fn insert_email_verification_token<'c, E>(
    executor: E,
    token: &EmailVerificationToken,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO email_verification_tokens (id, token, user_id, expires_at, used, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(token.id.0)
    .bind(&token.token)
    .bind(token.user_id.0)
    .bind(token.expires_at)
    .bind(token.used)
    .bind(token.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// PostgreSQL implementation of TokenRepository.
///
/// Flag transitions are conditional updates (`WHERE revoked = FALSE` /
/// `WHERE used = FALSE`); the row lock taken by the first writer makes a
/// concurrent second update re-check the condition and affect zero rows.
pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), AuthError> {
        insert_refresh_token(&self.pool, token)
            .await
            .map_err(database_error)
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, token, user_id, expires_at, revoked, created_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(RefreshTokenRow::into_token))
    }

    async fn revoke_refresh_token(&self, id: &TokenId) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn rotate_refresh_token(
        &self,
        current: &TokenId,
        replacement: &RefreshToken,
    ) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(current.0)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await.map_err(database_error)?;
            return Ok(false);
        }

        insert_refresh_token(&mut *tx, replacement)
            .await
            .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;
        Ok(true)
    }

    async fn find_email_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<EmailVerificationToken>, AuthError> {
        let row = sqlx::query_as::<_, SingleUseTokenRow>(
            r#"
            SELECT id, token, user_id, expires_at, used, created_at
            FROM email_verification_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(SingleUseTokenRow::into_email_verification))
    }

    async fn consume_email_verification_token(
        &self,
        token: &EmailVerificationToken,
    ) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let consumed = sqlx::query(
            r#"
            UPDATE email_verification_tokens
            SET used = TRUE
            WHERE id = $1 AND used = FALSE
            "#,
        )
        .bind(token.id.0)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await.map_err(database_error)?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
            .bind(token.user_id.0)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;
        Ok(true)
    }

    async fn create_password_reset_token(
        &self,
        token: &PasswordResetToken,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (id, token, user_id, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id.0)
        .bind(&token.token)
        .bind(token.user_id.0)
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn find_password_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, AuthError> {
        let row = sqlx::query_as::<_, SingleUseTokenRow>(
            r#"
            SELECT id, token, user_id, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(SingleUseTokenRow::into_password_reset))
    }

    async fn consume_password_reset_token(
        &self,
        token: &PasswordResetToken,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let consumed = sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET used = TRUE
            WHERE id = $1 AND used = FALSE
            "#,
        )
        .bind(token.id.0)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await.map_err(database_error)?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(token.user_id.0)
            .bind(password_hash)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE user_id = $1 AND revoked = FALSE
            "#,
        )
        .bind(token.user_id.0)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        tracing::debug!(
            user_id = %token.user_id,
            revoked_sessions = revoked.rows_affected(),
            "Password reset applied"
        );
        Ok(true)
    }
}
