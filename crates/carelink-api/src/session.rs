use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use carelink_types::api::Claims;
use carelink_types::models::Role;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no bearer token was provided")]
    MissingToken,
    #[error("token is malformed")]
    MalformedToken,
    #[error("token signature is invalid")]
    InvalidToken,
    #[error("token has expired")]
    ExpiredToken,
}

/// Issues and verifies the signed session credential. The signing secret and
/// lifetime are injected at construction; nothing here reads ambient state.
pub struct SessionAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionAuthority {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    pub fn issue(&self, account_id: Uuid, name: &str, role: Role) -> anyhow::Result<String> {
        let claims = Claims {
            sub: account_id,
            name: name.to_string(),
            role,
            exp: (Utc::now() + self.ttl).timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Stateless check: signature, shape, expiry. The three failure modes are
    /// kept distinct so callers can tell a stale session from a forged one.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                    ErrorKind::InvalidToken
                    | ErrorKind::Base64(_)
                    | ErrorKind::Json(_)
                    | ErrorKind::Utf8(_)
                    | ErrorKind::MissingRequiredClaim(_) => AuthError::MalformedToken,
                    _ => AuthError::InvalidToken,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> SessionAuthority {
        SessionAuthority::new("test-secret", 7)
    }

    #[test]
    fn issue_verify_roundtrip() {
        let auth = authority();
        let id = Uuid::new_v4();

        let token = auth.issue(id, "Maria", Role::Caregiver).unwrap();
        let claims = auth.verify(&token).unwrap();

        assert_eq!(claims.sub, id);
        assert_eq!(claims.name, "Maria");
        assert_eq!(claims.role, Role::Caregiver);
    }

    #[test]
    fn expired_token_is_distinguished() {
        // negative TTL puts exp well past the default leeway
        let auth = SessionAuthority::new("test-secret", -1);
        let token = auth.issue(Uuid::new_v4(), "Maria", Role::Observer).unwrap();

        assert_eq!(auth.verify(&token), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = authority().issue(Uuid::new_v4(), "Maria", Role::Observer).unwrap();
        let other = SessionAuthority::new("different-secret", 7);

        assert_eq!(other.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(authority().verify("not-a-token"), Err(AuthError::MalformedToken));
    }
}
