use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AuthError;
use crate::account::models::EmailAddress;
use crate::account::models::NewAccount;
use crate::account::models::RegisterCommand;
use crate::account::models::Registration;
use crate::account::models::ResetPasswordCommand;
use crate::account::models::TokenPair;
use crate::account::models::User;
use crate::account::models::UserId;
use crate::account::ports::AuthServicePort;
use crate::account::ports::Notifier;
use crate::account::ports::TokenRepository;
use crate::account::ports::UserRepository;
use crate::account::tokens::EmailVerificationToken;
use crate::account::tokens::PasswordResetToken;
use crate::account::tokens::RefreshToken;
use crate::account::tokens::TokenLifetimes;

/// Domain service implementation for authentication operations.
///
/// Owns no state of its own: every decision is taken against the stores, and
/// every multi-row effect is delegated to a single atomic store call.
pub struct AuthService<UR, TR, N>
where
    UR: UserRepository,
    TR: TokenRepository,
    N: Notifier,
{
    users: Arc<UR>,
    tokens: Arc<TR>,
    notifier: Arc<N>,
    authenticator: Arc<Authenticator>,
    lifetimes: TokenLifetimes,
}

impl<UR, TR, N> AuthService<UR, TR, N>
where
    UR: UserRepository,
    TR: TokenRepository,
    N: Notifier,
{
    /// Create a new auth service with its collaborators.
    ///
    /// # Arguments
    /// * `users` - Credential store
    /// * `tokens` - Token store
    /// * `notifier` - Outbound email notifications
    /// * `authenticator` - Password hashing and access-token signing
    /// * `lifetimes` - Validity periods of refresh, verification and reset tokens
    pub fn new(
        users: Arc<UR>,
        tokens: Arc<TR>,
        notifier: Arc<N>,
        authenticator: Arc<Authenticator>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            users,
            tokens,
            notifier,
            authenticator,
            lifetimes,
        }
    }

    /// Mint an access token and a new refresh token row for `user`.
    ///
    /// The row is returned unsaved so each caller can persist it inside its own
    /// atomic store call.
    fn issue_token_pair(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<(TokenPair, RefreshToken), AuthError> {
        let access = self
            .authenticator
            .issue_access_token(&user.id.to_string(), user.email.as_str())?;
        let refresh = RefreshToken::issue(user.id, now, self.lifetimes.refresh_token);

        let pair = TokenPair {
            access_token: access.token,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.token.clone(),
            refresh_token_expires_at: refresh.expires_at,
        };

        Ok((pair, refresh))
    }

    fn notify_email_verification(&self, email: String, token: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.send_email_verification(&email, &token).await {
                tracing::error!(email = %email, error = %e, "Failed to send email verification");
            }
        });
    }

    fn notify_password_reset(&self, email: String, token: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.send_password_reset(&email, &token).await {
                tracing::error!(email = %email, error = %e, "Failed to send password reset email");
            }
        });
    }
}

#[async_trait]
impl<UR, TR, N> AuthServicePort for AuthService<UR, TR, N>
where
    UR: UserRepository,
    TR: TokenRepository,
    N: Notifier,
{
    async fn register(&self, command: RegisterCommand) -> Result<Registration, AuthError> {
        if self
            .users
            .find_by_email(command.email.as_str())
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateEmail(command.email.to_string()));
        }

        let password_hash = self.authenticator.hash_password(command.password.expose())?;
        let now = Utc::now();

        let user = User {
            id: UserId::new(),
            email: command.email,
            password_hash,
            name: command.name,
            email_verified: false,
            created_at: now,
        };

        let verification_token =
            EmailVerificationToken::issue(user.id, now, self.lifetimes.email_verification);
        let verification = verification_token.token.clone();
        let (tokens, refresh_token) = self.issue_token_pair(&user, now)?;

        let user = self
            .users
            .create(NewAccount {
                user,
                verification_token,
                refresh_token,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.notify_email_verification(user.email.to_string(), verification);

        Ok(Registration { user, tokens })
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self.users.find_by_email(email).await?;

        let stored_hash = user.as_ref().map(|u| u.password_hash.as_str());
        let password_matches = self.authenticator.verify_password(password, stored_hash)?;

        let user = match user {
            Some(user) if password_matches => user,
            _ => return Err(AuthError::InvalidCredentials),
        };

        let (pair, refresh_token) = self.issue_token_pair(&user, Utc::now())?;
        self.tokens.create_refresh_token(&refresh_token).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let now = Utc::now();

        let current = match self.tokens.find_refresh_token(refresh_token).await? {
            Some(token) if token.is_usable(now) => token,
            _ => return Err(AuthError::InvalidOrExpiredToken),
        };

        let user = self
            .users
            .find_by_id(&current.user_id)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let (pair, replacement) = self.issue_token_pair(&user, now)?;

        if !self
            .tokens
            .rotate_refresh_token(&current.id, &replacement)
            .await?
        {
            tracing::warn!(
                user_id = %user.id,
                token_id = %current.id,
                "Refresh token already rotated, rejecting replay"
            );
            return Err(AuthError::InvalidOrExpiredToken);
        }

        tracing::debug!(user_id = %user.id, "Refresh token rotated");
        Ok(pair)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        if let Some(token) = self.tokens.find_refresh_token(refresh_token).await? {
            if self.tokens.revoke_refresh_token(&token.id).await? {
                tracing::info!(user_id = %token.user_id, "Refresh token revoked");
            }
        }

        Ok(())
    }

    async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let record = match self.tokens.find_email_verification_token(token).await? {
            Some(record) if !record.used => record,
            _ => return Err(AuthError::InvalidToken),
        };

        if record.is_expired(Utc::now()) {
            return Err(AuthError::ExpiredToken);
        }

        if !self.tokens.consume_email_verification_token(&record).await? {
            return Err(AuthError::InvalidToken);
        }

        tracing::info!(user_id = %record.user_id, "Email verified");
        Ok(())
    }

    async fn forgot_password(&self, email: &EmailAddress) -> Result<(), AuthError> {
        let Some(user) = self.users.find_by_email(email.as_str()).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let reset_token =
            PasswordResetToken::issue(user.id, Utc::now(), self.lifetimes.password_reset);
        self.tokens.create_password_reset_token(&reset_token).await?;

        tracing::info!(user_id = %user.id, "Password reset requested");
        self.notify_password_reset(user.email.to_string(), reset_token.token);

        Ok(())
    }

    async fn reset_password(&self, command: ResetPasswordCommand) -> Result<(), AuthError> {
        let record = match self.tokens.find_password_reset_token(&command.token).await? {
            Some(record) if !record.used => record,
            _ => return Err(AuthError::InvalidToken),
        };

        if record.is_expired(Utc::now()) {
            return Err(AuthError::ExpiredToken);
        }

        let password_hash = self
            .authenticator
            .hash_password(command.new_password.expose())?;

        if !self
            .tokens
            .consume_password_reset_token(&record, &password_hash)
            .await?
        {
            return Err(AuthError::InvalidToken);
        }

        tracing::info!(user_id = %record.user_id, "Password reset, all sessions revoked");
        Ok(())
    }

    async fn profile(&self, user_id: &UserId) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id.to_string()))
    }
}
