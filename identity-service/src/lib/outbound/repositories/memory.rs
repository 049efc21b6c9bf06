use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::account::errors::AuthError;
use crate::account::models::NewAccount;
use crate::account::models::User;
use crate::account::models::UserId;
use crate::account::ports::TokenRepository;
use crate::account::ports::UserRepository;
use crate::account::tokens::EmailVerificationToken;
use crate::account::tokens::PasswordResetToken;
use crate::account::tokens::RefreshToken;
use crate::account::tokens::TokenId;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    // Token tables are keyed by the opaque token string
    refresh_tokens: HashMap<String, RefreshToken>,
    email_verification_tokens: HashMap<String, EmailVerificationToken>,
    password_reset_tokens: HashMap<String, PasswordResetToken>,
}

/// In-process store implementing both the user and the token repository.
///
/// All tables sit behind one async mutex, so every repository call is a
/// single atomic step. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh tokens currently stored for `user_id`, revoked ones included.
    pub async fn refresh_tokens_of(&self, user_id: &UserId) -> Vec<RefreshToken> {
        let tables = self.tables.lock().await;
        tables
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == *user_id)
            .cloned()
            .collect()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, account: NewAccount) -> Result<User, AuthError> {
        let mut tables = self.tables.lock().await;

        if tables
            .users
            .values()
            .any(|u| u.email.as_str() == account.user.email.as_str())
        {
            return Err(AuthError::DuplicateEmail(account.user.email.to_string()));
        }

        let NewAccount {
            user,
            verification_token,
            refresh_token,
        } = account;

        tables
            .email_verification_tokens
            .insert(verification_token.token.clone(), verification_token);
        tables
            .refresh_tokens
            .insert(refresh_token.token.clone(), refresh_token);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        Ok(self.tables.lock().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.as_str() == email)
            .cloned())
    }
}

#[async_trait]
impl TokenRepository for InMemoryStore {
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), AuthError> {
        let mut tables = self.tables.lock().await;
        tables
            .refresh_tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthError> {
        Ok(self.tables.lock().await.refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, id: &TokenId) -> Result<bool, AuthError> {
        let mut tables = self.tables.lock().await;
        Ok(revoke_by_id(&mut tables, id))
    }

    async fn rotate_refresh_token(
        &self,
        current: &TokenId,
        replacement: &RefreshToken,
    ) -> Result<bool, AuthError> {
        let mut tables = self.tables.lock().await;

        if !revoke_by_id(&mut tables, current) {
            return Ok(false);
        }

        tables
            .refresh_tokens
            .insert(replacement.token.clone(), replacement.clone());
        Ok(true)
    }

    async fn find_email_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<EmailVerificationToken>, AuthError> {
        Ok(self
            .tables
            .lock()
            .await
            .email_verification_tokens
            .get(token)
            .cloned())
    }

    async fn consume_email_verification_token(
        &self,
        token: &EmailVerificationToken,
    ) -> Result<bool, AuthError> {
        let mut tables = self.tables.lock().await;

        match tables.email_verification_tokens.get_mut(&token.token) {
            Some(stored) if !stored.used => stored.used = true,
            _ => return Ok(false),
        }

        if let Some(user) = tables.users.get_mut(&token.user_id) {
            user.email_verified = true;
        }

        Ok(true)
    }

    async fn create_password_reset_token(
        &self,
        token: &PasswordResetToken,
    ) -> Result<(), AuthError> {
        let mut tables = self.tables.lock().await;
        tables
            .password_reset_tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_password_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, AuthError> {
        Ok(self
            .tables
            .lock()
            .await
            .password_reset_tokens
            .get(token)
            .cloned())
    }

    async fn consume_password_reset_token(
        &self,
        token: &PasswordResetToken,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let mut tables = self.tables.lock().await;

        match tables.password_reset_tokens.get_mut(&token.token) {
            Some(stored) if !stored.used => stored.used = true,
            _ => return Ok(false),
        }

        if let Some(user) = tables.users.get_mut(&token.user_id) {
            user.password_hash = password_hash.to_string();
        }

        tables
            .refresh_tokens
            .values_mut()
            .filter(|t| t.user_id == token.user_id)
            .for_each(|t| t.revoked = true);

        Ok(true)
    }
}

fn revoke_by_id(tables: &mut Tables, id: &TokenId) -> bool {
    match tables.refresh_tokens.values_mut().find(|t| t.id == *id) {
        Some(token) if !token.revoked => {
            token.revoked = true;
            true
        }
        _ => false,
    }
}
