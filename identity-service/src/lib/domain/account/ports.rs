use async_trait::async_trait;

use crate::account::errors::AuthError;
use crate::account::errors::NotifierError;
use crate::account::models::EmailAddress;
use crate::account::models::NewAccount;
use crate::account::models::RegisterCommand;
use crate::account::models::Registration;
use crate::account::models::ResetPasswordCommand;
use crate::account::models::TokenPair;
use crate::account::models::User;
use crate::account::models::UserId;
use crate::account::tokens::EmailVerificationToken;
use crate::account::tokens::PasswordResetToken;
use crate::account::tokens::RefreshToken;
use crate::account::tokens::TokenId;

/// Port for authentication operations consumed by the request layer.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new account and sign it in.
    ///
    /// # Returns
    /// The created user with a fresh token pair
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email is already registered
    /// * `DatabaseError` - Store operation failed
    async fn register(&self, command: RegisterCommand) -> Result<Registration, AuthError>;

    /// Exchange email and password for a token pair.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password (indistinguishable)
    /// * `DatabaseError` - Store operation failed
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Rotate a refresh token: revoke the presented one and issue a new pair.
    ///
    /// # Errors
    /// * `InvalidOrExpiredToken` - Token unknown, revoked, expired or already rotated
    /// * `DatabaseError` - Store operation failed
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Revoke a refresh token. Succeeds for unknown tokens too.
    ///
    /// # Errors
    /// * `DatabaseError` - Store operation failed
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;

    /// Consume an email-verification token and mark its owner verified.
    ///
    /// # Errors
    /// * `InvalidToken` - Token unknown or already used
    /// * `ExpiredToken` - Token past its expiry
    /// * `DatabaseError` - Store operation failed
    async fn verify_email(&self, token: &str) -> Result<(), AuthError>;

    /// Start a password reset. Succeeds whether or not the email is registered.
    ///
    /// # Errors
    /// * `DatabaseError` - Store operation failed
    async fn forgot_password(&self, email: &EmailAddress) -> Result<(), AuthError>;

    /// Consume a reset token, set the new password and revoke every refresh token
    /// of the owner.
    ///
    /// # Errors
    /// * `InvalidToken` - Token unknown or already used
    /// * `ExpiredToken` - Token past its expiry
    /// * `DatabaseError` - Store operation failed
    async fn reset_password(&self, command: ResetPasswordCommand) -> Result<(), AuthError>;

    /// Load the account of an authenticated principal.
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this id
    /// * `DatabaseError` - Store operation failed
    async fn profile(&self, user_id: &UserId) -> Result<User, AuthError>;
}

/// Persistence operations for the user aggregate.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user together with its verification token and first refresh
    /// token, atomically.
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email is already registered
    /// * `DatabaseError` - Store operation failed
    async fn create(&self, account: NewAccount) -> Result<User, AuthError>;

    /// Retrieve user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

    /// Retrieve user by email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
}

/// Persistence operations for refresh, verification and reset tokens.
///
/// Every method returning `bool` is a compare-and-set: `true` means this call
/// performed the flag transition, `false` means the token was already
/// revoked/used (for instance by a concurrent request) and nothing was written.
#[async_trait]
pub trait TokenRepository: Send + Sync + 'static {
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), AuthError>;

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthError>;

    /// Revoke one refresh token if it is not revoked yet.
    async fn revoke_refresh_token(&self, id: &TokenId) -> Result<bool, AuthError>;

    /// Revoke `current` and persist `replacement` as one unit.
    ///
    /// Writes nothing and returns `false` if `current` was already revoked.
    async fn rotate_refresh_token(
        &self,
        current: &TokenId,
        replacement: &RefreshToken,
    ) -> Result<bool, AuthError>;

    async fn find_email_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<EmailVerificationToken>, AuthError>;

    /// Mark the token used and its owner's email verified, as one unit.
    async fn consume_email_verification_token(
        &self,
        token: &EmailVerificationToken,
    ) -> Result<bool, AuthError>;

    async fn create_password_reset_token(&self, token: &PasswordResetToken)
        -> Result<(), AuthError>;

    async fn find_password_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, AuthError>;

    /// Mark the token used, store `password_hash` for its owner and revoke all of
    /// the owner's refresh tokens, as one unit.
    async fn consume_password_reset_token(
        &self,
        token: &PasswordResetToken,
        password_hash: &str,
    ) -> Result<bool, AuthError>;
}

/// Outbound email notifications.
///
/// Delivery is best-effort: callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_email_verification(&self, email: &str, token: &str) -> Result<(), NotifierError>;

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), NotifierError>;
}
