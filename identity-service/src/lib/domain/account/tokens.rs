use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::account::models::UserId;

/// Generate an opaque token string: a random (v4) UUID, unguessable and carrying
/// no payload.
pub fn generate_opaque_token() -> String {
    Uuid::new_v4().to_string()
}

/// Row identifier shared by all stored token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(pub Uuid);

impl TokenId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validity periods for every issued credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access_token: Duration,
    pub refresh_token: Duration,
    pub email_verification: Duration,
    pub password_reset: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access_token: Duration::minutes(15),
            refresh_token: Duration::days(7),
            email_verification: Duration::hours(24),
            password_reset: Duration::hours(1),
        }
    }
}

/// Long-lived session credential, rotated on every refresh.
///
/// `revoked` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: TokenId,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Mint a fresh, unrevoked token for `user_id`.
    pub fn issue(user_id: UserId, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            id: TokenId::new(),
            token: generate_opaque_token(),
            user_id,
            expires_at: now + lifetime,
            revoked: false,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Not revoked and not expired at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired(now)
    }
}

/// Single-use token proving control of an email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerificationToken {
    pub id: TokenId,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl EmailVerificationToken {
    pub fn issue(user_id: UserId, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            id: TokenId::new(),
            token: generate_opaque_token(),
            user_id,
            expires_at: now + lifetime,
            used: false,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Single-use token authorising one password change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetToken {
    pub id: TokenId,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn issue(user_id: UserId, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            id: TokenId::new(),
            token: generate_opaque_token(),
            user_id,
            expires_at: now + lifetime,
            used: false,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_tokens_are_unique() {
        let first = generate_opaque_token();
        let second = generate_opaque_token();

        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_default_lifetimes() {
        let lifetimes = TokenLifetimes::default();

        assert_eq!(lifetimes.access_token, Duration::minutes(15));
        assert_eq!(lifetimes.refresh_token, Duration::days(7));
        assert_eq!(lifetimes.email_verification, Duration::hours(24));
        assert_eq!(lifetimes.password_reset, Duration::hours(1));
    }

    #[test]
    fn test_refresh_token_usability() {
        let now = Utc::now();
        let mut token = RefreshToken::issue(UserId::new(), now, Duration::days(7));

        assert!(token.is_usable(now));
        assert!(token.is_usable(token.expires_at)); // Exactly at expiry
        assert!(!token.is_usable(token.expires_at + Duration::seconds(1)));

        token.revoked = true;
        assert!(!token.is_usable(now));
    }

    #[test]
    fn test_single_use_token_expiry() {
        let now = Utc::now();
        let verification = EmailVerificationToken::issue(UserId::new(), now, Duration::hours(24));
        let reset = PasswordResetToken::issue(UserId::new(), now, Duration::hours(1));

        assert!(!verification.is_expired(now + Duration::hours(23)));
        assert!(verification.is_expired(now + Duration::hours(25)));
        assert!(!reset.is_expired(now + Duration::minutes(59)));
        assert!(reset.is_expired(now + Duration::minutes(61)));
        assert!(!verification.used && !reset.used);
    }
}
