use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use super::token::insert_email_verification_token;
use super::token::insert_refresh_token;
use crate::account::errors::AuthError;
use crate::account::models::DisplayName;
use crate::account::models::EmailAddress;
use crate::account::models::NewAccount;
use crate::account::models::User;
use crate::account::models::UserId;
use crate::account::ports::UserRepository;

const SELECT_USER: &str = r#"
    SELECT id, email, password_hash, name, email_verified, created_at
    FROM users
"#;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: Option<String>,
    email_verified: bool,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, AuthError> {
        let name = self
            .name
            .as_deref()
            .map(DisplayName::parse)
            .transpose()?
            .flatten();

        Ok(User {
            id: UserId(self.id),
            email: EmailAddress::new(self.email)?,
            password_hash: self.password_hash,
            name,
            email_verified: self.email_verified,
            created_at: self.created_at,
        })
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, account: NewAccount) -> Result<User, AuthError> {
        let NewAccount {
            user,
            verification_token,
            refresh_token,
        } = account;

        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, email_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.name.as_ref().map(|n| n.as_str()))
        .bind(user.email_verified)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return AuthError::DuplicateEmail(user.email.as_str().to_string());
                }
            }
            database_error(e)
        })?;

        insert_email_verification_token(&mut *tx, &verification_token)
            .await
            .map_err(database_error)?;
        insert_refresh_token(&mut *tx, &refresh_token)
            .await
            .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        tracing::debug!(user_id = %user.id, "User row and initial tokens inserted");
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        let query = format!("{SELECT_USER} WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let query = format!("{SELECT_USER} WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        row.map(UserRow::into_user).transpose()
    }
}
