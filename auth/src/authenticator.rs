use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::AccessClaims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Password verification plus access-token issuance with a fixed lifetime.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    access_token_lifetime: Duration,
    decoy_hash: String,
}

/// A freshly signed access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for access-token signing
    /// * `access_token_lifetime` - Validity of issued access tokens
    ///
    /// # Errors
    /// * `HashingFailed` - The decoy hash used for unknown accounts could not be built
    pub fn new(jwt_secret: &[u8], access_token_lifetime: Duration) -> Result<Self, PasswordError> {
        let password_hasher = PasswordHasher::new();
        let decoy_hash = password_hasher.hash("decoy-password-for-unknown-accounts")?;

        Ok(Self {
            password_hasher,
            jwt_handler: JwtHandler::new(jwt_secret),
            access_token_lifetime,
            decoy_hash,
        })
    }

    /// Hash a password for storage.
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Verify a password against the stored hash of an account, if there is one.
    ///
    /// When `stored_hash` is `None` the password is checked against a decoy hash
    /// and `false` is returned, so a missing account costs the same as a wrong
    /// password.
    pub fn verify_password(
        &self,
        password: &str,
        stored_hash: Option<&str>,
    ) -> Result<bool, PasswordError> {
        match stored_hash {
            Some(hash) => self.password_hasher.verify(password, hash),
            None => {
                self.password_hasher.verify(password, &self.decoy_hash)?;
                Ok(false)
            }
        }
    }

    /// Sign an access token for `subject`.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token generation failed
    pub fn issue_access_token(&self, subject: &str, email: &str) -> Result<AccessToken, JwtError> {
        let claims =
            AccessClaims::for_user(subject, email, Utc::now(), self.access_token_lifetime);
        let token = self.jwt_handler.encode(&claims)?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| JwtError::EncodingFailed("expiration out of range".to_string()))?;

        Ok(AccessToken { token, expires_at })
    }

    /// Validate an access token and return its claims.
    ///
    /// # Errors
    /// * `TokenExpired` - Token lifetime has elapsed
    /// * `DecodingFailed` - Token is malformed or the signature does not match
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.jwt_handler.decode(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(b"test_secret_key_at_least_32_bytes!", Duration::minutes(15))
            .expect("Failed to build authenticator")
    }

    #[test]
    fn test_verify_password() {
        let authenticator = authenticator();
        let hash = authenticator
            .hash_password("my_password")
            .expect("Failed to hash password");

        assert!(authenticator
            .verify_password("my_password", Some(&hash))
            .unwrap());
        assert!(!authenticator
            .verify_password("wrong_password", Some(&hash))
            .unwrap());
    }

    #[test]
    fn test_verify_password_without_account() {
        let authenticator = authenticator();

        // Even the decoy's own password never matches a missing account
        let result = authenticator
            .verify_password("decoy-password-for-unknown-accounts", None)
            .unwrap();
        assert!(!result);
    }

    #[test]
    fn test_issue_and_validate_access_token() {
        let authenticator = authenticator();

        let issued = authenticator
            .issue_access_token("user123", "alice@example.com")
            .expect("Failed to issue token");

        let claims = authenticator
            .validate_access_token(&issued.token)
            .expect("Token validation failed");

        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.expires_at(), Some(issued.expires_at));
    }

    #[test]
    fn test_validate_invalid_token() {
        let authenticator = authenticator();

        let result = authenticator.validate_access_token("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = authenticator();
        let other =
            Authenticator::new(b"another_secret_key_at_least_32_bytes", Duration::minutes(15))
                .unwrap();

        let issued = issuer.issue_access_token("user123", "a@example.com").unwrap();
        assert!(other.validate_access_token(&issued.token).is_err());
    }
}
