//! Authentication token

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Claims;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("Token expired at {expired_at}")]
    Expired { expired_at: i64, claims: Claims },
}

/// Newtype for the token string issued by the API
///
/// The token is a JWT, but the client never verifies its signature. It is only decoded to read
/// the claims, the signature is verified by the server whenever the token is presented as a
/// bearer credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(..)")
    }
}

impl From<String> for AuthToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AuthToken {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the token payload without verifying it
    pub fn decode(&self) -> Result<Claims, Error> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<Claims>(&self.0, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(Error::Malformed)
    }

    /// Decodes the token, failing if it is expired at the given time
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<Claims, Error> {
        let claims = self.decode()?;
        if claims.is_expired_at(now) {
            return Err(Error::Expired {
                expired_at: claims.exp,
                claims,
            });
        }

        Ok(claims)
    }

    /// Decodes the token, failing if it is already expired
    pub fn validate(&self) -> Result<Claims, Error> {
        self.validate_at(Utc::now())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    /// Signs claims the way the API does
    pub(crate) fn issue(claims: &Claims) -> AuthToken {
        let key = EncodingKey::from_secret(b"api-signing-secret");
        AuthToken(jsonwebtoken::encode(&Header::default(), claims, &key).unwrap())
    }

    #[test]
    fn decode_issued_token() {
        let claims = Claims::new(Utc::now().timestamp() + 3600)
            .with("sub", "u1")
            .with("username", "user1")
            .with("roles", json!(["player"]));

        let token = issue(&claims);
        assert_eq!(token.decode().unwrap(), claims);
        assert_eq!(token.validate().unwrap(), claims);
    }

    #[test]
    fn signature_is_not_verified() {
        let claims = Claims::new(Utc::now().timestamp() + 3600).with("sub", "u1");
        let key = EncodingKey::from_secret(b"some-other-secret");
        let token = jsonwebtoken::encode(&Header::default(), &claims, &key).unwrap();

        assert_eq!(AuthToken::new(token).decode().unwrap(), claims);
    }

    #[test]
    fn audience_is_passed_through() {
        let claims = Claims::new(Utc::now().timestamp() + 3600).with("aud", "deckbuilder");
        let token = issue(&claims);
        assert_eq!(token.decode().unwrap(), claims);
    }

    #[test]
    fn malformed_tokens() {
        for token in ["", "garbage", "a.b.c", "tok123"] {
            let err = AuthToken::from(token).decode().unwrap_err();
            assert!(matches!(err, Error::Malformed(_)), "{token}: {err:?}");
        }
    }

    #[test]
    fn token_without_expiry_is_malformed() {
        let key = EncodingKey::from_secret(b"api-signing-secret");
        let token = jsonwebtoken::encode(&Header::default(), &json!({ "sub": "u1" }), &key).unwrap();

        let err = AuthToken::new(token).decode().unwrap_err();
        assert!(matches!(err, Error::Malformed(_)), "{err:?}");
    }

    #[test]
    fn expired_token() {
        let now = Utc::now();
        let claims = Claims::new(now.timestamp() - 1).with("sub", "u1");
        let token = issue(&claims);

        // Still decodable
        assert_eq!(token.decode().unwrap(), claims);

        match token.validate_at(now).unwrap_err() {
            Error::Expired {
                expired_at,
                claims: expired,
            } => {
                assert_eq!(expired_at, claims.exp);
                assert_eq!(expired, claims);
            }
            err => panic!("Unexpected error: {err:?}"),
        }

        let claims = Claims::new(now.timestamp() + 60);
        issue(&claims)
            .validate_at(now + Duration::minutes(2))
            .unwrap_err();
    }

    #[test]
    fn debug_hides_token() {
        let token = AuthToken::from("tok123");
        assert_eq!(format!("{token:?}"), "AuthToken(..)");
    }
}
