//! JWT session tokens.
//!
//! A session is a signed, self-contained JWT carrying the identity fields
//! handlers need for permission checks. Tokens are issued at login, set as a
//! cookie, and verified on every authenticated request.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    api::models::users::{CurrentUser, Role},
    config::Config,
    errors::Error,
    types::UserId,
};

/// Claims embedded in the session JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: UserId,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub is_admin: bool,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
}

impl SessionClaims {
    fn for_user(user: &CurrentUser, config: &Config) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            is_admin: user.is_admin,
            exp: (now + config.auth.security.jwt_expiry).timestamp(),
            iat: now.timestamp(),
        }
    }
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            username: claims.username,
            role: claims.role,
            is_admin: claims.is_admin,
            // The display name is not carried in the token
            display_name: None,
        }
    }
}

fn signing_secret(config: &Config) -> Result<&str, Error> {
    config.secret_key.as_deref().ok_or_else(|| Error::Internal {
        operation: "JWT sessions: secret_key is required".to_string(),
    })
}

/// Issue a session token for a logged-in user.
pub fn create_session_token(user: &CurrentUser, config: &Config) -> Result<String, Error> {
    let claims = SessionClaims::for_user(user, config);
    let key = EncodingKey::from_secret(signing_secret(config)?.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

/// Verify a session token and recover the user identity it carries.
///
/// Anything wrong with the token itself (bad signature, expired, malformed)
/// maps to `Unauthenticated`; only key or serialization problems on our side
/// surface as internal errors.
pub fn verify_session_token(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    let key = DecodingKey::from_secret(signing_secret(config)?.as_bytes());

    let token_data = decode::<SessionClaims>(token, &key, &Validation::default()).map_err(|e| {
        let client_fault = matches!(
            e.kind(),
            ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_)
        );
        if client_fault {
            Error::Unauthenticated { message: None }
        } else {
            Error::Internal {
                operation: format!("JWT verification: {e}"),
            }
        }
    })?;

    Ok(CurrentUser::from(token_data.claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn session_config() -> Config {
        let mut config = Config::default();
        config.secret_key = Some("session-test-signing-key".to_string());
        config.auth.security.jwt_expiry = Duration::from_secs(3600);
        config
    }

    fn reseller() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "ravi@example.com".to_string(),
            username: "ravi".to_string(),
            role: Role::Reseller,
            is_admin: false,
            display_name: Some("Ravi".to_string()),
        }
    }

    #[test]
    fn test_token_round_trips_identity() {
        let config = session_config();
        let user = reseller();

        let token = create_session_token(&user, &config).unwrap();
        let verified = verify_session_token(&token, &config).unwrap();

        assert_eq!(verified.id, user.id);
        assert_eq!(verified.email, user.email);
        assert_eq!(verified.role, Role::Reseller);
        assert!(!verified.is_admin);
    }

    #[test]
    fn test_wrong_secret_is_unauthenticated() {
        let mut config = session_config();
        let token = create_session_token(&reseller(), &config).unwrap();

        config.secret_key = Some("a-different-key".to_string());
        let err = verify_session_token(&token, &config).unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let config = session_config();
        let user = reseller();

        let mut claims = SessionClaims::for_user(&user, &config);
        claims.exp = (Utc::now() - chrono::Duration::hours(1)).timestamp();
        let key = EncodingKey::from_secret(config.secret_key.as_deref().unwrap().as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let err = verify_session_token(&token, &config).unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_garbage_tokens_are_unauthenticated() {
        let config = session_config();
        for token in ["", "not-a-jwt", "a.b", "a.b.c.d.e"] {
            let err = verify_session_token(token, &config).unwrap_err();
            assert!(matches!(err, Error::Unauthenticated { .. }), "token: {token:?}");
        }
    }
}
